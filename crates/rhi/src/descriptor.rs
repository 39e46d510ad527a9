//! Descriptor layout, pool and writes for the per-group material set.
//!
//! Every instance group draws with one descriptor set per frame slot:
//!
//! | Binding | Type                     | Stages          | Resource                    |
//! |---------|--------------------------|-----------------|-----------------------------|
//! | 0       | `UNIFORM_BUFFER`         | vertex+fragment | slot's global uniform block |
//! | 1       | `COMBINED_IMAGE_SAMPLER` | fragment        | base color texture          |
//! | 2       | `COMBINED_IMAGE_SAMPLER` | fragment        | normal map                  |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use renderer_rhi::device::Device;
//! use renderer_rhi::descriptor::{DescriptorPool, DescriptorSetLayout};
//!
//! # fn example(device: Arc<Device>) -> Result<(), renderer_rhi::RhiError> {
//! let layout = DescriptorSetLayout::material(device.clone())?;
//! let pool = DescriptorPool::for_material_sets(device, 2 * 64)?;
//! let set = pool.allocate_one(layout.handle())?;
//! pool.free(&[set])?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Binding slot of the global uniform block.
pub const UNIFORM_BINDING: u32 = 0;
/// Binding slot of the base color texture.
pub const BASE_COLOR_BINDING: u32 = 1;
/// Binding slot of the normal map.
pub const NORMAL_MAP_BINDING: u32 = 2;

/// The three bindings of the material set.
pub fn material_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; 3] {
    [
        vk::DescriptorSetLayoutBinding::default()
            .binding(UNIFORM_BINDING)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT),
        vk::DescriptorSetLayoutBinding::default()
            .binding(BASE_COLOR_BINDING)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT),
        vk::DescriptorSetLayoutBinding::default()
            .binding(NORMAL_MAP_BINDING)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT),
    ]
}

/// Pool sizes that fit `max_sets` material sets.
pub fn material_pool_sizes(max_sets: u32) -> [vk::DescriptorPoolSize; 2] {
    [
        vk::DescriptorPoolSize::default()
            .ty(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(max_sets),
        vk::DescriptorPoolSize::default()
            .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(max_sets * 2),
    ]
}

/// Vulkan descriptor set layout wrapper.
pub struct DescriptorSetLayout {
    device: Arc<Device>,
    layout: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    pub fn new(
        device: Arc<Device>,
        bindings: &[vk::DescriptorSetLayoutBinding],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);

        let layout = unsafe {
            device
                .handle()
                .create_descriptor_set_layout(&create_info, None)?
        };

        debug!(
            "Created descriptor set layout with {} binding(s)",
            bindings.len()
        );

        Ok(Self { device, layout })
    }

    /// Layout of the per-group material set.
    pub fn material(device: Arc<Device>) -> RhiResult<Self> {
        Self::new(device, &material_bindings())
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_set_layout(self.layout, None);
        }
        debug!("Destroyed descriptor set layout");
    }
}

/// Descriptor pool that allows freeing individual sets.
pub struct DescriptorPool {
    device: Arc<Device>,
    pool: vk::DescriptorPool,
    max_sets: u32,
}

impl DescriptorPool {
    pub fn new(
        device: Arc<Device>,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes)
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET);

        let pool = unsafe { device.handle().create_descriptor_pool(&create_info, None)? };

        debug!(
            "Created descriptor pool: max_sets={}, pool_sizes={}",
            max_sets,
            pool_sizes.len()
        );

        Ok(Self {
            device,
            pool,
            max_sets,
        })
    }

    /// Pool sized for `max_sets` material sets.
    pub fn for_material_sets(device: Arc<Device>, max_sets: u32) -> RhiResult<Self> {
        Self::new(device, max_sets, &material_pool_sizes(max_sets))
    }

    /// Allocates a single set. Pool exhaustion surfaces as
    /// `ERROR_OUT_OF_POOL_MEMORY`.
    pub fn allocate_one(&self, layout: vk::DescriptorSetLayout) -> RhiResult<vk::DescriptorSet> {
        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        let sets = unsafe { self.device.handle().allocate_descriptor_sets(&alloc_info)? };

        sets.into_iter()
            .next()
            .ok_or_else(|| RhiError::InvalidHandle("descriptor pool returned no set".to_string()))
    }

    pub fn free(&self, sets: &[vk::DescriptorSet]) -> RhiResult<()> {
        unsafe {
            self.device.handle().free_descriptor_sets(self.pool, sets)?;
        }

        debug!("Freed {} descriptor set(s)", sets.len());

        Ok(())
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

    #[inline]
    pub fn max_sets(&self) -> u32 {
        self.max_sets
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_pool(self.pool, None);
        }
        debug!("Destroyed descriptor pool");
    }
}

/// Resources written into one material set.
#[derive(Clone, Copy, Debug)]
pub struct MaterialWrite {
    pub uniform_buffer: vk::Buffer,
    pub uniform_range: vk::DeviceSize,
    pub sampler: vk::Sampler,
    pub base_color_view: vk::ImageView,
    pub normal_view: vk::ImageView,
}

/// Points all three bindings of `set` at the given resources.
pub fn write_material_set(device: &Device, set: vk::DescriptorSet, write: &MaterialWrite) {
    let uniform_info = [vk::DescriptorBufferInfo::default()
        .buffer(write.uniform_buffer)
        .offset(0)
        .range(write.uniform_range)];
    let base_color_info = [vk::DescriptorImageInfo::default()
        .sampler(write.sampler)
        .image_view(write.base_color_view)
        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)];
    let normal_info = [vk::DescriptorImageInfo::default()
        .sampler(write.sampler)
        .image_view(write.normal_view)
        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)];

    let writes = [
        vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(UNIFORM_BINDING)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&uniform_info),
        vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(BASE_COLOR_BINDING)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&base_color_info),
        vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(NORMAL_MAP_BINDING)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&normal_info),
    ];

    unsafe {
        device.handle().update_descriptor_sets(&writes, &[]);
    }
}
