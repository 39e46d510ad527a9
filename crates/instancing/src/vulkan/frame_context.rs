//! [`GraphicsDeviceContext`] for a host-driven Vulkan swapchain.
//!
//! The host still acquires and presents swapchain images itself. Before each
//! frame it hands the context a [`FrameTarget`] describing the image to
//! render into and the semaphores to chain through; the context owns one
//! command buffer and one in-flight fence per frame slot.
//!
//! # Synchronization Flow
//!
//! ```text
//! 1. Host acquires an image (signals target.wait_semaphore) and calls set_target
//! 2. wait_for_slot waits on the slot's fence if the renderer asks
//! 3. begin_commands resets + begins the slot's command buffer, opens rendering
//! 4. submit_commands closes rendering, transitions to target.final_layout,
//!    resets the fence and submits:
//!    - waits on target.wait_semaphore
//!    - signals target.signal_semaphore
//!    - signals the slot's fence
//! 5. Host presents (waits on target.signal_semaphore)
//! ```

use std::sync::Arc;

use ash::vk;
use renderer_core::RendererConfig;
use renderer_rhi::command::{CommandBuffer, CommandPool};
use renderer_rhi::device::Device;
use renderer_rhi::sync::Fence;
use renderer_rhi::{RhiError, RhiResult};
use tracing::{error, info, trace};

use super::backend::VulkanBackend;
use super::recorder::VulkanCommandRecorder;
use crate::backend::{GraphicsDeviceContext, OutputExtent};

/// Depth attachment of a [`FrameTarget`].
#[derive(Clone, Copy, Debug)]
pub struct DepthTarget {
    pub image: vk::Image,
    pub view: vk::ImageView,
}

/// Image the next frame renders into.
#[derive(Clone, Copy, Debug)]
pub struct FrameTarget {
    pub color_image: vk::Image,
    pub color_view: vk::ImageView,
    pub depth: Option<DepthTarget>,
    pub extent: vk::Extent2D,
    /// Waited on before color output, usually the acquire semaphore.
    /// `vk::Semaphore::null()` to skip.
    pub wait_semaphore: vk::Semaphore,
    /// Signaled when rendering finished. `vk::Semaphore::null()` to skip.
    pub signal_semaphore: vk::Semaphore,
    /// Color layout after the frame, e.g. `PRESENT_SRC_KHR`.
    pub final_layout: vk::ImageLayout,
}

struct SlotSync {
    command_buffer: CommandBuffer,
    in_flight: Fence,
}

/// Per-slot command buffers and fences.
pub struct VulkanFrameContext {
    slots: Vec<SlotSync>,
    // Freed after the command buffers above.
    command_pool: CommandPool,
    device: Arc<Device>,
    current: usize,
    target: Option<FrameTarget>,
    clear_color: [f32; 4],
}

impl VulkanFrameContext {
    /// Creates one command buffer and one signaled fence per frame in flight.
    ///
    /// `config` is clamped the same way [`SceneRenderer::new`] clamps it, so
    /// both agree on the slot count.
    ///
    /// [`SceneRenderer::new`]: crate::SceneRenderer::new
    pub fn new(device: Arc<Device>, config: &RendererConfig) -> RhiResult<Self> {
        let frames = config.clone().validate().frames_in_flight;

        let command_pool = CommandPool::new(Arc::clone(&device), device.graphics_queue_family())?;
        let command_buffers = command_pool.allocate(frames as u32)?;

        let slots = command_buffers
            .into_iter()
            .map(|command_buffer| {
                Ok(SlotSync {
                    command_buffer,
                    in_flight: Fence::new(Arc::clone(&device), true)?,
                })
            })
            .collect::<RhiResult<Vec<_>>>()?;

        info!("Frame context created with {} frames in flight", frames);

        Ok(Self {
            slots,
            command_pool,
            device,
            current: 0,
            target: None,
            clear_color: [0.1, 0.1, 0.15, 1.0],
        })
    }

    /// Sets the image the next frame renders into.
    pub fn set_target(&mut self, target: FrameTarget) {
        self.target = Some(target);
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    #[inline]
    pub fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }

    fn slot(&self, slot: usize) -> RhiResult<&SlotSync> {
        self.slots.get(slot).ok_or_else(|| {
            RhiError::InvalidHandle(format!(
                "frame slot {slot} out of range ({} frames in flight)",
                self.slots.len()
            ))
        })
    }

    fn target(&self) -> RhiResult<FrameTarget> {
        self.target
            .ok_or_else(|| RhiError::InvalidHandle("no frame target set".to_string()))
    }
}

impl GraphicsDeviceContext<VulkanBackend> for VulkanFrameContext {
    type Recorder = VulkanCommandRecorder;

    fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    fn current_frame_slot(&self) -> usize {
        self.current
    }

    fn output_extent(&self) -> OutputExtent {
        self.target
            .map(|target| target.extent.into())
            .unwrap_or_default()
    }

    fn wait_for_slot(&mut self, slot: usize) -> RhiResult<()> {
        self.slot(slot)?.in_flight.wait(u64::MAX)?;
        trace!(slot, "Frame slot retired");
        Ok(())
    }

    fn begin_commands(&mut self, slot: usize) -> RhiResult<VulkanCommandRecorder> {
        let target = self.target()?;
        let cmd = self.slot(slot)?.command_buffer.clone();

        cmd.reset()?;
        cmd.begin()?;

        cmd.transition_image_layout(
            target.color_image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::ImageAspectFlags::COLOR,
        );
        if let Some(depth) = target.depth {
            cmd.transition_image_layout(
                depth.image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
                vk::ImageAspectFlags::DEPTH,
            );
        }

        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(target.color_view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            });

        let depth_attachment = target.depth.map(|depth| {
            vk::RenderingAttachmentInfo::default()
                .image_view(depth.view)
                .image_layout(vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .clear_value(vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: 1.0,
                        stencil: 0,
                    },
                })
        });

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D::default().extent(target.extent))
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment));
        if let Some(depth_attachment) = depth_attachment.as_ref() {
            rendering_info = rendering_info.depth_attachment(depth_attachment);
        }

        cmd.begin_rendering(&rendering_info);
        trace!(slot, "Recording started");

        Ok(VulkanCommandRecorder::new(cmd))
    }

    fn submit_commands(&mut self, slot: usize, recorder: VulkanCommandRecorder) -> RhiResult<()> {
        let target = self.target()?;
        let sync = self.slot(slot)?;
        let cmd = recorder.command_buffer();

        cmd.end_rendering();
        cmd.transition_image_layout(
            target.color_image,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            target.final_layout,
            vk::ImageAspectFlags::COLOR,
        );
        cmd.end()?;

        let wait_semaphores: Vec<vk::Semaphore> = [target.wait_semaphore]
            .into_iter()
            .filter(|s| *s != vk::Semaphore::null())
            .collect();
        let wait_stages =
            vec![vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT; wait_semaphores.len()];
        let signal_semaphores: Vec<vk::Semaphore> = [target.signal_semaphore]
            .into_iter()
            .filter(|s| *s != vk::Semaphore::null())
            .collect();
        let command_buffers = [cmd.handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        // Reset only once we are sure to submit, or the next wait never returns.
        sync.in_flight.reset()?;
        unsafe {
            self.device
                .submit_graphics(&[submit_info], sync.in_flight.handle())?;
        }

        self.current = (self.current + 1) % self.slots.len();
        trace!(slot, next = self.current, "Frame submitted");

        Ok(())
    }

    fn wait_device_idle(&mut self) -> RhiResult<()> {
        self.device.wait_idle()
    }
}

impl Drop for VulkanFrameContext {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!(
                "Failed to wait for device idle during frame context drop: {:?}",
                e
            );
        }
        info!("Frame context destroyed");
    }
}
