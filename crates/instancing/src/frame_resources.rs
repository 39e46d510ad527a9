//! GPU-visible resources, one generation per frame slot.
//!
//! Each slot owns a global uniform buffer, created up front, and one
//! instance buffer plus one material descriptor set per mesh group. A
//! slot's resources are only ever written for the frame being recorded into
//! that slot, so the GPU can keep reading the other slots meanwhile.
//!
//! Instance buffers are sized for the group's cardinality and reused for as
//! long as the group does not outgrow them.

use std::collections::HashMap;

use renderer_rhi::buffer::BufferUsage;
use renderer_scene::{MeshId, SceneSnapshot};
use tracing::{debug, info, trace};

use crate::backend::{GpuBackend, HostBuffer, MaterialBinding};
use crate::error::{RenderError, RenderResult};
use crate::grouper::InstanceGroup;
use crate::ubo::{GlobalUniformBlock, InstanceRecord};

struct GroupResources<B: GpuBackend> {
    instance_buffer: B::Buffer,
    /// Records the instance buffer holds.
    capacity: usize,
    descriptor_set: B::DescriptorSet,
    /// Textures last written into `descriptor_set`.
    bound: Option<MaterialBinding>,
}

struct SlotResources<B: GpuBackend> {
    uniform_buffer: B::Buffer,
    groups: HashMap<MeshId, GroupResources<B>>,
}

/// What one [`FrameResourceManager::ensure_capacity`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CapacityReport {
    pub buffers_allocated: usize,
    pub descriptor_sets_allocated: usize,
    pub groups_released: usize,
}

impl CapacityReport {
    /// True when nothing was allocated or released.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Owner of every per-slot buffer and descriptor set.
pub struct FrameResourceManager<B: GpuBackend> {
    slots: Vec<SlotResources<B>>,
}

impl<B: GpuBackend> FrameResourceManager<B> {
    /// Allocates one global uniform buffer per slot.
    pub fn new(backend: &B, frames_in_flight: usize) -> RenderResult<Self> {
        let size = GlobalUniformBlock::SIZE as u64;
        let slots = (0..frames_in_flight)
            .map(|slot| {
                let uniform_buffer = backend
                    .create_buffer(BufferUsage::Uniform, size)
                    .map_err(|source| RenderError::Allocation {
                        slot,
                        size,
                        usage: BufferUsage::Uniform.name(),
                        source,
                    })?;
                Ok(SlotResources {
                    uniform_buffer,
                    groups: HashMap::new(),
                })
            })
            .collect::<RenderResult<Vec<_>>>()?;

        info!(
            "Frame resources created for {} frame slot(s)",
            frames_in_flight
        );

        Ok(Self { slots })
    }

    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Makes every slot hold resources for exactly `groups`.
    ///
    /// Missing groups get an instance buffer and a descriptor set. Groups
    /// that outgrew their instance buffer get a new one, smaller groups keep
    /// theirs. Groups not in `groups` release both. Calling this twice with
    /// the same groups allocates nothing the second time.
    ///
    /// Touches every slot, so no slot may be in flight.
    pub fn ensure_capacity(
        &mut self,
        backend: &B,
        groups: &[InstanceGroup],
        snapshot: &SceneSnapshot,
    ) -> RenderResult<CapacityReport> {
        let mut report = CapacityReport::default();

        for slot in 0..self.slots.len() {
            let resources = &mut self.slots[slot];

            let vanished: Vec<MeshId> = resources
                .groups
                .keys()
                .filter(|mesh| !groups.iter().any(|g| g.mesh_id() == **mesh))
                .copied()
                .collect();
            for mesh in vanished {
                if let Some(released) = resources.groups.remove(&mesh) {
                    backend.free_descriptor_set(released.descriptor_set)?;
                    report.groups_released += 1;
                    debug!(slot, ?mesh, "Released group resources");
                }
            }

            for group in groups {
                let mesh = group.mesh_id();
                let count = group.len().max(1);

                match resources.groups.get_mut(&mesh) {
                    Some(existing) if existing.capacity >= count => {}
                    Some(existing) => {
                        existing.instance_buffer = create_instance_buffer(backend, slot, count)?;
                        existing.capacity = count;
                        report.buffers_allocated += 1;
                        debug!(slot, ?mesh, capacity = count, "Grew instance buffer");
                    }
                    None => {
                        let instance_buffer = create_instance_buffer(backend, slot, count)?;
                        report.buffers_allocated += 1;

                        let descriptor_set = backend.allocate_descriptor_set().map_err(
                            |source| RenderError::DescriptorAllocation { slot, mesh, source },
                        )?;
                        report.descriptor_sets_allocated += 1;

                        resources.groups.insert(
                            mesh,
                            GroupResources {
                                instance_buffer,
                                capacity: count,
                                descriptor_set,
                                bound: None,
                            },
                        );
                        debug!(slot, ?mesh, capacity = count, "Allocated group resources");
                    }
                }
            }

            self.sync_descriptors(backend, slot, groups, snapshot)?;
        }

        if !report.is_noop() {
            info!(
                buffers = report.buffers_allocated,
                descriptor_sets = report.descriptor_sets_allocated,
                released = report.groups_released,
                "Frame resources resized for {} group(s)",
                groups.len()
            );
        }

        Ok(report)
    }

    /// Rewrites the descriptor set of every group in `slot` whose textures
    /// changed. Returns how many sets were written.
    ///
    /// A group whose first instance lacks a texture, or references one the
    /// backend does not know, keeps whatever its set was bound to before.
    pub fn sync_descriptors(
        &mut self,
        backend: &B,
        slot: usize,
        groups: &[InstanceGroup],
        snapshot: &SceneSnapshot,
    ) -> RenderResult<usize> {
        let SlotResources {
            uniform_buffer,
            groups: allocated,
        } = slot_entry_mut(&mut self.slots, slot);

        let mut written = 0;
        for group in groups {
            let mesh = group.mesh_id();
            let resources = group_entry_mut(allocated, slot, mesh);

            let Some(material) = group.material(snapshot) else {
                trace!(slot, ?mesh, "Group has unresolved textures, keeping binding");
                continue;
            };
            if resources.bound == Some(material) {
                continue;
            }
            if !backend.has_texture(material.base_color) || !backend.has_texture(material.normal)
            {
                trace!(slot, ?mesh, ?material, "Texture not registered, keeping binding");
                continue;
            }

            backend.write_descriptor_set(resources.descriptor_set, uniform_buffer, material)?;
            resources.bound = Some(material);
            written += 1;
            debug!(slot, ?mesh, ?material, "Descriptor set rewritten");
        }

        Ok(written)
    }

    /// The uniform buffer of `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn uniform_buffer(&self, slot: usize) -> &B::Buffer {
        &slot_entry(&self.slots, slot).uniform_buffer
    }

    pub fn uniform_buffer_mut(&mut self, slot: usize) -> &mut B::Buffer {
        &mut slot_entry_mut(&mut self.slots, slot).uniform_buffer
    }

    /// The global uniform block currently stored in `slot`.
    pub fn uniform_block(&self, slot: usize) -> RenderResult<GlobalUniformBlock> {
        let block = self.uniform_buffer(slot).typed_slice::<GlobalUniformBlock>(1)?;
        Ok(block[0])
    }

    /// The first `count` instance records of `mesh` in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if the group has no resources in `slot`.
    pub fn instance_records(
        &self,
        slot: usize,
        mesh: MeshId,
        count: usize,
    ) -> RenderResult<&[InstanceRecord]> {
        let resources = group_entry(&slot_entry(&self.slots, slot).groups, slot, mesh);
        Ok(resources.instance_buffer.typed_slice(count)?)
    }

    /// Mutable view of the first `count` instance records of `mesh` in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if the group has no resources in `slot`.
    pub fn instance_records_mut(
        &mut self,
        slot: usize,
        mesh: MeshId,
        count: usize,
    ) -> RenderResult<&mut [InstanceRecord]> {
        let resources = group_entry_mut(&mut slot_entry_mut(&mut self.slots, slot).groups, slot, mesh);
        Ok(resources.instance_buffer.typed_slice_mut(count)?)
    }

    pub fn instance_buffer(&self, slot: usize, mesh: MeshId) -> Option<&B::Buffer> {
        self.group(slot, mesh).map(|g| &g.instance_buffer)
    }

    /// Records the instance buffer of `mesh` in `slot` can hold.
    pub fn capacity(&self, slot: usize, mesh: MeshId) -> Option<usize> {
        self.group(slot, mesh).map(|g| g.capacity)
    }

    pub fn descriptor_set(&self, slot: usize, mesh: MeshId) -> Option<B::DescriptorSet> {
        self.group(slot, mesh).map(|g| g.descriptor_set)
    }

    /// Textures the set of `mesh` in `slot` is bound to, if it was ever written.
    pub fn bound_material(&self, slot: usize, mesh: MeshId) -> Option<MaterialBinding> {
        self.group(slot, mesh).and_then(|g| g.bound)
    }

    /// Number of groups with resources in `slot`.
    pub fn group_count(&self, slot: usize) -> usize {
        slot_entry(&self.slots, slot).groups.len()
    }

    /// Frees every group's descriptor set and instance buffer in every slot.
    ///
    /// The device must be idle.
    pub fn release_all(&mut self, backend: &B) -> RenderResult<()> {
        let mut released = 0;
        for resources in &mut self.slots {
            for (_, group) in resources.groups.drain() {
                backend.free_descriptor_set(group.descriptor_set)?;
                released += 1;
            }
        }
        info!("Released resources of {} group(s)", released);
        Ok(())
    }

    fn group(&self, slot: usize, mesh: MeshId) -> Option<&GroupResources<B>> {
        self.slots.get(slot)?.groups.get(&mesh)
    }
}

fn create_instance_buffer<B: GpuBackend>(
    backend: &B,
    slot: usize,
    count: usize,
) -> RenderResult<B::Buffer> {
    let size = (count * InstanceRecord::SIZE) as u64;
    backend
        .create_buffer(BufferUsage::Instance, size)
        .map_err(|source| RenderError::Allocation {
            slot,
            size,
            usage: BufferUsage::Instance.name(),
            source,
        })
}

fn slot_entry<B: GpuBackend>(slots: &[SlotResources<B>], slot: usize) -> &SlotResources<B> {
    let frames = slots.len();
    slots
        .get(slot)
        .unwrap_or_else(|| panic!("frame slot {slot} out of range ({frames} frames in flight)"))
}

fn slot_entry_mut<B: GpuBackend>(
    slots: &mut [SlotResources<B>],
    slot: usize,
) -> &mut SlotResources<B> {
    let frames = slots.len();
    slots
        .get_mut(slot)
        .unwrap_or_else(|| panic!("frame slot {slot} out of range ({frames} frames in flight)"))
}

fn group_entry<B: GpuBackend>(
    groups: &HashMap<MeshId, GroupResources<B>>,
    slot: usize,
    mesh: MeshId,
) -> &GroupResources<B> {
    groups
        .get(&mesh)
        .unwrap_or_else(|| panic!("no resources allocated for mesh {mesh:?} in frame slot {slot}"))
}

fn group_entry_mut<B: GpuBackend>(
    groups: &mut HashMap<MeshId, GroupResources<B>>,
    slot: usize,
    mesh: MeshId,
) -> &mut GroupResources<B> {
    groups
        .get_mut(&mesh)
        .unwrap_or_else(|| panic!("no resources allocated for mesh {mesh:?} in frame slot {slot}"))
}
