//! Per-frame driver: snapshot in, one instanced draw per mesh group out.
//!
//! # Frame flow
//!
//! ```text
//! slot S = ctx.current_frame_slot()
//! S submitted?        -> ctx.wait_for_slot(S), S retires
//! topology changed?   -> (any slot in flight? ctx.wait_device_idle())
//!                        regroup, ensure_capacity
//! ctx.begin_commands(S)
//! sync descriptors, write uniforms + instance records of S
//! record draws
//! ctx.submit_commands(S)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use renderer_core::RendererConfig;
//! use renderer_instancing::{GpuBackend, GraphicsDeviceContext, RenderResult, SceneRenderer};
//! use renderer_scene::{Camera, Light, Scene};
//!
//! fn run<B: GpuBackend, C: GraphicsDeviceContext<B>>(
//!     backend: B,
//!     ctx: &mut C,
//!     scene: &Scene,
//! ) -> RenderResult<()> {
//!     let mut renderer = SceneRenderer::new(backend, &RendererConfig::default())?;
//!     let camera = Camera::default();
//!     let light = Light::default();
//!
//!     let stats = renderer.render_frame(ctx, &scene.snapshot(), &camera, &light)?;
//!     println!("{} draw call(s)", stats.draw_calls);
//!
//!     renderer.shutdown(ctx)
//! }
//! ```

use std::time::Duration;

use bytemuck::bytes_of;
use glam::Mat4;
use rayon::prelude::*;
use renderer_core::{RendererConfig, Timer};
use renderer_rhi::vertex::Vertex;
use renderer_scene::{Camera, Light, MeshId, SceneSnapshot};
use tracing::{debug, info, trace};

use crate::backend::{CommandRecorder, GpuBackend, GraphicsDeviceContext, HostBuffer, OutputExtent};
use crate::error::{RenderError, RenderResult};
use crate::frame_resources::FrameResourceManager;
use crate::frame_slots::{FrameSlotTracker, SlotState};
use crate::grouper::{InstanceGroup, InstanceGrouper};
use crate::mesh_library::MeshLibrary;
use crate::pipelines::PipelineSet;
use crate::ubo::{GlobalUniformBlock, InstanceRecord};

/// Counters of one recorded frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub slot: usize,
    pub groups: usize,
    pub draw_calls: usize,
    pub instances: usize,
    /// Groups without geometry or a bound descriptor set.
    pub skipped_groups: usize,
    pub cpu_time: Duration,
}

/// What [`SceneRenderer::record_draws`] recorded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawSummary {
    pub draw_calls: usize,
    pub instances: usize,
    pub skipped_groups: usize,
}

/// Turns scene snapshots into instanced draws for the active frame slot.
pub struct SceneRenderer<B: GpuBackend> {
    backend: B,
    grouper: InstanceGrouper,
    resources: FrameResourceManager<B>,
    meshes: MeshLibrary<B>,
    pipelines: PipelineSet<B::Pipeline>,
    slots: FrameSlotTracker,
    /// Topology version and instance count the current groups were built from.
    grouped: Option<(u64, usize)>,
    parallel_threshold: usize,
    default_variant: usize,
}

impl<B: GpuBackend> SceneRenderer<B> {
    /// Creates a renderer with one resource generation per frame in flight.
    pub fn new(backend: B, config: &RendererConfig) -> RenderResult<Self> {
        let config = config.clone().validate();
        let resources = FrameResourceManager::new(&backend, config.frames_in_flight)?;

        info!(
            "Scene renderer created: {} frame(s) in flight, parallel threshold {}",
            config.frames_in_flight, config.parallel_instance_threshold
        );

        Ok(Self {
            backend,
            grouper: InstanceGrouper::new(),
            resources,
            meshes: MeshLibrary::new(),
            pipelines: PipelineSet::new(),
            slots: FrameSlotTracker::new(config.frames_in_flight),
            grouped: None,
            parallel_threshold: config.parallel_instance_threshold,
            default_variant: config.default_pipeline_variant,
        })
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable backend access, e.g. to register textures.
    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn groups(&self) -> &[InstanceGroup] {
        self.grouper.groups()
    }

    #[inline]
    pub fn resources(&self) -> &FrameResourceManager<B> {
        &self.resources
    }

    #[inline]
    pub fn pipelines(&self) -> &PipelineSet<B::Pipeline> {
        &self.pipelines
    }

    #[inline]
    pub fn meshes(&self) -> &MeshLibrary<B> {
        &self.meshes
    }

    pub fn slot_state(&self, slot: usize) -> SlotState {
        self.slots.state(slot)
    }

    /// Uploads geometry for `id`. See [`MeshLibrary::upload`].
    pub fn upload_mesh(&mut self, id: MeshId, vertices: &[Vertex], indices: &[u32]) -> RenderResult<()> {
        self.meshes.upload(&self.backend, id, vertices, indices)
    }

    /// Registers a pipeline variant and returns its index.
    ///
    /// The variant named by `default_pipeline_variant` becomes active once it
    /// is registered.
    pub fn add_pipeline_variant(&mut self, name: impl Into<String>, pipeline: B::Pipeline) -> usize {
        let index = self.pipelines.push(name, pipeline);
        if index == self.default_variant {
            self.pipelines.set_active(index);
        }
        index
    }

    /// Selects the variant the next frame binds. Out-of-range indices are ignored.
    pub fn set_pipeline_variant(&mut self, index: usize) {
        self.pipelines.set_active(index);
    }

    /// Records and submits one frame into the context's current slot.
    pub fn render_frame<C: GraphicsDeviceContext<B>>(
        &mut self,
        ctx: &mut C,
        snapshot: &SceneSnapshot,
        camera: &Camera,
        light: &Light,
    ) -> RenderResult<FrameStats> {
        let timer = Timer::new();

        assert_eq!(
            ctx.frames_in_flight(),
            self.frames_in_flight(),
            "device context and renderer disagree on frames in flight"
        );
        let slot = ctx.current_frame_slot();

        if self.slots.state(slot) == SlotState::Submitted {
            ctx.wait_for_slot(slot)?;
            self.slots.mark_retired(slot)?;
        }
        self.slots.begin_acquire(slot)?;

        if self.topology_changed(snapshot) {
            self.rebuild_groups(ctx, snapshot)?;
        }

        let extent = ctx.output_extent();
        let mut recorder = ctx.begin_commands(slot)?;
        self.slots.begin_recording(slot)?;

        self.resources
            .sync_descriptors(&self.backend, slot, self.grouper.groups(), snapshot)?;
        self.write_global_uniforms(slot, camera, light, extent)?;

        let view = camera.view_matrix();
        for group_index in 0..self.grouper.groups().len() {
            self.write_instance_records(slot, group_index, snapshot, view)?;
        }

        let summary = self.record_draws(slot, &mut recorder, extent)?;

        ctx.submit_commands(slot, recorder)?;
        self.slots.mark_submitted(slot)?;

        let stats = FrameStats {
            slot,
            groups: self.grouper.groups().len(),
            draw_calls: summary.draw_calls,
            instances: summary.instances,
            skipped_groups: summary.skipped_groups,
            cpu_time: timer.elapsed(),
        };
        trace!(?stats, cpu_ms = timer.elapsed_ms(), "Frame submitted");

        Ok(stats)
    }

    /// Writes view, projection, camera position and the view-space light
    /// into the uniform buffer of `slot`.
    pub fn write_global_uniforms(
        &mut self,
        slot: usize,
        camera: &Camera,
        light: &Light,
        extent: OutputExtent,
    ) -> RenderResult<()> {
        self.slots.ensure_writable(slot)?;

        let block = GlobalUniformBlock::new(
            camera.view_matrix(),
            camera.projection_matrix_for_aspect(extent.aspect()),
            camera.position,
            light,
        );
        self.resources
            .uniform_buffer_mut(slot)
            .write_bytes(0, bytes_of(&block))?;

        Ok(())
    }

    /// Recomputes the instance records of group `group_index` in `slot`.
    ///
    /// Record `i` of the group's buffer belongs to the group's `i`-th
    /// instance. Large groups are computed in parallel.
    ///
    /// # Panics
    ///
    /// Panics if `group_index` is out of range or the group has no resources
    /// in `slot`.
    pub fn write_instance_records(
        &mut self,
        slot: usize,
        group_index: usize,
        snapshot: &SceneSnapshot,
        view: Mat4,
    ) -> RenderResult<()> {
        self.slots.ensure_writable(slot)?;

        let group_count = self.grouper.groups().len();
        let group = self.grouper.groups().get(group_index).unwrap_or_else(|| {
            panic!("group {group_index} out of range ({group_count} groups) in frame slot {slot}")
        });
        let instances = snapshot.instances();
        let indices = group.indices();

        let records = self
            .resources
            .instance_records_mut(slot, group.mesh_id(), indices.len())?;

        if indices.len() >= self.parallel_threshold {
            records
                .par_iter_mut()
                .zip(indices.par_iter())
                .for_each(|(record, &index)| {
                    *record = InstanceRecord::new(instances[index].world_transform, view);
                });
        } else {
            for (record, &index) in records.iter_mut().zip(indices) {
                *record = InstanceRecord::new(instances[index].world_transform, view);
            }
        }

        Ok(())
    }

    /// Records one instanced draw per drawable group of `slot`.
    ///
    /// Records nothing at all when no group is drawable. A group is drawable
    /// when it has instances, uploaded geometry and a bound descriptor set.
    pub fn record_draws<R: CommandRecorder<B>>(
        &self,
        slot: usize,
        recorder: &mut R,
        extent: OutputExtent,
    ) -> RenderResult<DrawSummary> {
        self.slots.ensure_writable(slot)?;

        let mut summary = DrawSummary::default();
        let mut draws = Vec::with_capacity(self.grouper.groups().len());

        for group in self.grouper.groups() {
            let mesh_id = group.mesh_id();
            if group.is_empty() {
                continue;
            }
            let Some(mesh) = self.meshes.get(mesh_id) else {
                trace!(slot, mesh = ?mesh_id, "Mesh not uploaded, skipping group");
                summary.skipped_groups += 1;
                continue;
            };
            if self.resources.bound_material(slot, mesh_id).is_none() {
                trace!(slot, mesh = ?mesh_id, "Descriptor set never bound, skipping group");
                summary.skipped_groups += 1;
                continue;
            }
            let (Some(set), Some(instances)) = (
                self.resources.descriptor_set(slot, mesh_id),
                self.resources.instance_buffer(slot, mesh_id),
            ) else {
                summary.skipped_groups += 1;
                continue;
            };
            draws.push((mesh, set, instances, group.len()));
        }

        if draws.is_empty() {
            return Ok(summary);
        }

        let pipeline = self.pipelines.active().ok_or(RenderError::NoPipelineVariant)?;
        recorder.bind_pipeline(pipeline);
        recorder.set_viewport_and_scissor(extent);

        for (mesh, set, instances, count) in draws {
            recorder.bind_descriptor_set(pipeline, set);
            recorder.bind_vertex_streams(mesh.vertex_buffer(), instances);
            recorder.bind_index_buffer(mesh.index_buffer());
            recorder.draw_indexed(mesh.index_count(), count as u32);

            summary.draw_calls += 1;
            summary.instances += count;
        }

        Ok(summary)
    }

    /// Waits for the device to go idle, then frees every group resource and
    /// mesh. The renderer can keep rendering afterwards.
    pub fn shutdown<C: GraphicsDeviceContext<B>>(&mut self, ctx: &mut C) -> RenderResult<()> {
        ctx.wait_device_idle()?;
        self.slots.retire_all();

        self.resources.release_all(&self.backend)?;
        self.meshes.clear();
        self.grouped = None;

        info!("Scene renderer shut down");
        Ok(())
    }

    fn topology_changed(&self, snapshot: &SceneSnapshot) -> bool {
        self.grouped != Some((snapshot.topology_version(), snapshot.len()))
    }

    fn rebuild_groups<C: GraphicsDeviceContext<B>>(
        &mut self,
        ctx: &mut C,
        snapshot: &SceneSnapshot,
    ) -> RenderResult<()> {
        if self.slots.any_in_flight() {
            debug!("Topology changed with frames in flight, waiting for device idle");
            ctx.wait_device_idle()?;
            self.slots.retire_all();
        }

        let groups = self.grouper.regroup(snapshot);
        self.resources.ensure_capacity(&self.backend, groups, snapshot)?;
        self.grouped = Some((snapshot.topology_version(), snapshot.len()));

        Ok(())
    }
}
