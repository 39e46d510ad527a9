//! [`GpuBackend`] over `renderer_rhi`.

use std::collections::HashMap;
use std::sync::Arc;

use ash::vk;
use renderer_core::RendererConfig;
use renderer_rhi::buffer::{Buffer, BufferUsage};
use renderer_rhi::descriptor::{self, DescriptorPool, DescriptorSetLayout, MaterialWrite};
use renderer_rhi::device::Device;
use renderer_rhi::sampler::Sampler;
use renderer_rhi::{RhiError, RhiResult};
use renderer_scene::TextureId;
use tracing::{debug, info};

use crate::backend::{GpuBackend, MaterialBinding};
use crate::ubo::GlobalUniformBlock;

/// A host-built graphics pipeline and the layout its material set binds to.
///
/// The host owns both handles and must keep them alive while they are
/// registered with a renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VulkanPipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

/// Buffers, material sets and sampled textures on a Vulkan device.
///
/// Pipelines used with this backend must be created with
/// [`material_layout`](Self::material_layout) as set 0.
pub struct VulkanBackend {
    // Drop order: sets go with the pool before the layout.
    pool: DescriptorPool,
    layout: DescriptorSetLayout,
    sampler: Sampler,
    textures: HashMap<TextureId, vk::ImageView>,
    device: Arc<Device>,
}

impl VulkanBackend {
    /// Sizes the descriptor pool for `max_mesh_groups` groups in each of
    /// `frames_in_flight` slots.
    pub fn new(device: Arc<Device>, config: &RendererConfig) -> RhiResult<Self> {
        let config = config.clone().validate();
        let max_sets = config.max_mesh_groups * config.frames_in_flight as u32;

        let layout = DescriptorSetLayout::material(Arc::clone(&device))?;
        let pool = DescriptorPool::for_material_sets(Arc::clone(&device), max_sets)?;
        let sampler = Sampler::new(Arc::clone(&device), config.max_anisotropy)?;

        info!(
            "Vulkan backend created: {} material set(s) across {} frame slot(s)",
            max_sets, config.frames_in_flight
        );

        Ok(Self {
            pool,
            layout,
            sampler,
            textures: HashMap::new(),
            device,
        })
    }

    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Layout of descriptor set 0 for pipeline creation.
    #[inline]
    pub fn material_layout(&self) -> vk::DescriptorSetLayout {
        self.layout.handle()
    }

    /// Makes `view` sampleable as `id`. The view must be in
    /// `SHADER_READ_ONLY_OPTIMAL` whenever a frame using it executes.
    pub fn register_texture(&mut self, id: TextureId, view: vk::ImageView) {
        if self.textures.insert(id, view).is_some() {
            debug!(?id, "Texture view replaced");
        }
    }

    /// Forgets `id`. Sets already bound to it keep the old view, so the view
    /// must outlive every frame that still samples it.
    pub fn unregister_texture(&mut self, id: TextureId) -> Option<vk::ImageView> {
        self.textures.remove(&id)
    }

    fn texture_view(&self, id: TextureId) -> RhiResult<vk::ImageView> {
        self.textures
            .get(&id)
            .copied()
            .ok_or_else(|| RhiError::InvalidHandle(format!("texture {id:?} is not registered")))
    }
}

impl GpuBackend for VulkanBackend {
    type Buffer = Buffer;
    type DescriptorSet = vk::DescriptorSet;
    type Pipeline = VulkanPipeline;

    fn create_buffer(&self, usage: BufferUsage, size: u64) -> RhiResult<Buffer> {
        Buffer::new(Arc::clone(&self.device), usage, size)
    }

    fn allocate_descriptor_set(&self) -> RhiResult<vk::DescriptorSet> {
        self.pool.allocate_one(self.layout.handle())
    }

    fn free_descriptor_set(&self, set: vk::DescriptorSet) -> RhiResult<()> {
        self.pool.free(&[set])
    }

    fn has_texture(&self, texture: TextureId) -> bool {
        self.textures.contains_key(&texture)
    }

    fn write_descriptor_set(
        &self,
        set: vk::DescriptorSet,
        uniform: &Buffer,
        material: MaterialBinding,
    ) -> RhiResult<()> {
        let write = MaterialWrite {
            uniform_buffer: uniform.handle(),
            uniform_range: GlobalUniformBlock::SIZE as vk::DeviceSize,
            sampler: self.sampler.handle(),
            base_color_view: self.texture_view(material.base_color)?,
            normal_view: self.texture_view(material.normal)?,
        };
        descriptor::write_material_set(&self.device, set, &write);
        Ok(())
    }
}
