//! Seams between the instancing pipeline and the GPU.
//!
//! The pipeline never talks to Vulkan directly. It allocates memory and
//! descriptor sets through a [`GpuBackend`], records through a
//! [`CommandRecorder`], and follows the frame-slot cycle of a
//! [`GraphicsDeviceContext`] owned by the host. The Vulkan implementations
//! live in [`crate::vulkan`].

use std::fmt;

use ash::vk;
use bytemuck::Pod;
use renderer_rhi::RhiResult;
use renderer_rhi::buffer::{self, BufferUsage, cast_mapped, cast_mapped_mut};
use renderer_scene::TextureId;

/// Size of the image the current frame renders into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutputExtent {
    pub width: u32,
    pub height: u32,
}

impl OutputExtent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height; 1.0 for a degenerate extent.
    pub fn aspect(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<vk::Extent2D> for OutputExtent {
    fn from(extent: vk::Extent2D) -> Self {
        Self::new(extent.width, extent.height)
    }
}

impl From<OutputExtent> for vk::Extent2D {
    fn from(extent: OutputExtent) -> Self {
        vk::Extent2D {
            width: extent.width,
            height: extent.height,
        }
    }
}

/// Textures a group's descriptor set samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialBinding {
    pub base_color: TextureId,
    pub normal: TextureId,
}

/// Persistently mapped buffer memory.
pub trait HostBuffer {
    fn size(&self) -> u64;

    /// Mapped bytes, exactly `size()` long.
    fn mapped_bytes(&self) -> RhiResult<&[u8]>;

    fn mapped_bytes_mut(&mut self) -> RhiResult<&mut [u8]>;

    /// Copies `data` to `offset`, failing if it would run past the end.
    fn write_bytes(&mut self, offset: u64, data: &[u8]) -> RhiResult<()> {
        let range = buffer::checked_range(offset, data.len() as u64, self.size())?;
        self.mapped_bytes_mut()?[range].copy_from_slice(data);
        Ok(())
    }

    /// The first `count` elements as `T`.
    fn typed_slice<T: Pod>(&self, count: usize) -> RhiResult<&[T]> {
        cast_mapped(self.mapped_bytes()?, count)
    }

    /// The first `count` elements as mutable `T`.
    fn typed_slice_mut<T: Pod>(&mut self, count: usize) -> RhiResult<&mut [T]> {
        cast_mapped_mut(self.mapped_bytes_mut()?, count)
    }
}

impl HostBuffer for buffer::Buffer {
    fn size(&self) -> u64 {
        buffer::Buffer::size(self)
    }

    fn mapped_bytes(&self) -> RhiResult<&[u8]> {
        self.mapped_slice()
    }

    fn mapped_bytes_mut(&mut self) -> RhiResult<&mut [u8]> {
        self.mapped_slice_mut()
    }
}

/// Device memory and descriptor allocation.
///
/// Every buffer a backend creates must be host visible and host coherent;
/// the pipeline writes through [`HostBuffer`] and never flushes.
pub trait GpuBackend {
    type Buffer: HostBuffer;
    type DescriptorSet: Copy + fmt::Debug + PartialEq;
    type Pipeline;

    fn create_buffer(&self, usage: BufferUsage, size: u64) -> RhiResult<Self::Buffer>;

    /// Allocates a material set (uniform block + two textures).
    fn allocate_descriptor_set(&self) -> RhiResult<Self::DescriptorSet>;

    fn free_descriptor_set(&self, set: Self::DescriptorSet) -> RhiResult<()>;

    /// Whether `texture` resolves to an image the backend can bind.
    fn has_texture(&self, texture: TextureId) -> bool;

    /// Points `set` at `uniform` and the two textures of `material`.
    ///
    /// Callers only pass textures for which [`has_texture`](Self::has_texture)
    /// returned true.
    fn write_descriptor_set(
        &self,
        set: Self::DescriptorSet,
        uniform: &Self::Buffer,
        material: MaterialBinding,
    ) -> RhiResult<()>;
}

/// Command recording for one frame slot.
pub trait CommandRecorder<B: GpuBackend> {
    fn bind_pipeline(&mut self, pipeline: &B::Pipeline);

    fn set_viewport_and_scissor(&mut self, extent: OutputExtent);

    fn bind_descriptor_set(&mut self, pipeline: &B::Pipeline, set: B::DescriptorSet);

    /// Binds `vertices` as stream 0 and `instances` as stream 1.
    fn bind_vertex_streams(&mut self, vertices: &B::Buffer, instances: &B::Buffer);

    /// Binds 32-bit indices.
    fn bind_index_buffer(&mut self, indices: &B::Buffer);

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32);
}

/// Host-owned device, queue, swapchain and per-slot synchronization.
///
/// The context owns the slot index. It starts at 0 and advances by one
/// (modulo [`frames_in_flight`](Self::frames_in_flight)) on every
/// [`submit_commands`](Self::submit_commands).
pub trait GraphicsDeviceContext<B: GpuBackend> {
    type Recorder: CommandRecorder<B>;

    fn frames_in_flight(&self) -> usize;

    fn current_frame_slot(&self) -> usize;

    /// Extent of the image the next frame renders into. Read every frame.
    fn output_extent(&self) -> OutputExtent;

    /// Blocks until the last submission of `slot` has retired.
    fn wait_for_slot(&mut self, slot: usize) -> RhiResult<()>;

    fn begin_commands(&mut self, slot: usize) -> RhiResult<Self::Recorder>;

    /// Submits the recorded commands of `slot` and advances the slot index.
    fn submit_commands(&mut self, slot: usize, recorder: Self::Recorder) -> RhiResult<()>;

    fn wait_device_idle(&mut self) -> RhiResult<()>;
}
