//! [`CommandRecorder`] over a slot's command buffer.

use ash::vk;
use renderer_rhi::buffer::Buffer;
use renderer_rhi::command::CommandBuffer;
use renderer_rhi::vertex::VERTEX_STREAM_BINDING;

use super::backend::{VulkanBackend, VulkanPipeline};
use crate::backend::{CommandRecorder, OutputExtent};

/// Records into an open command buffer inside a dynamic rendering scope.
pub struct VulkanCommandRecorder {
    cmd: CommandBuffer,
}

impl VulkanCommandRecorder {
    pub(super) fn new(cmd: CommandBuffer) -> Self {
        Self { cmd }
    }

    #[inline]
    pub fn command_buffer(&self) -> &CommandBuffer {
        &self.cmd
    }
}

impl CommandRecorder<VulkanBackend> for VulkanCommandRecorder {
    fn bind_pipeline(&mut self, pipeline: &VulkanPipeline) {
        self.cmd
            .bind_pipeline(vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);
    }

    fn set_viewport_and_scissor(&mut self, extent: OutputExtent) {
        self.cmd.set_viewport_and_scissor(extent.into());
    }

    fn bind_descriptor_set(&mut self, pipeline: &VulkanPipeline, set: vk::DescriptorSet) {
        self.cmd
            .bind_descriptor_sets(vk::PipelineBindPoint::GRAPHICS, pipeline.layout, 0, &[set]);
    }

    fn bind_vertex_streams(&mut self, vertices: &Buffer, instances: &Buffer) {
        // Stream 1 directly follows stream 0.
        self.cmd.bind_vertex_buffers(
            VERTEX_STREAM_BINDING,
            &[vertices.handle(), instances.handle()],
            &[0, 0],
        );
    }

    fn bind_index_buffer(&mut self, indices: &Buffer) {
        self.cmd
            .bind_index_buffer(indices.handle(), 0, vk::IndexType::UINT32);
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        self.cmd.draw_indexed(index_count, instance_count, 0, 0, 0);
    }
}
