//! Vulkan implementations of the pipeline's device seams.
//!
//! - [`VulkanBackend`]: buffers, material descriptor sets and the texture registry
//! - [`VulkanCommandRecorder`]: draw recording into a slot's command buffer
//! - [`VulkanFrameContext`]: per-slot command buffers, fences and submission
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use renderer_core::RendererConfig;
//! use renderer_instancing::SceneRenderer;
//! use renderer_instancing::vulkan::{VulkanBackend, VulkanFrameContext};
//! use renderer_rhi::device::Device;
//!
//! # fn example(device: Arc<Device>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = RendererConfig::default();
//! let backend = VulkanBackend::new(Arc::clone(&device), &config)?;
//! let mut frames = VulkanFrameContext::new(device, &config)?;
//! let mut renderer = SceneRenderer::new(backend, &config)?;
//!
//! // Host: create pipelines against `renderer.backend().material_layout()`,
//! // register them, then per frame `frames.set_target(..)` and
//! // `renderer.render_frame(&mut frames, ..)`.
//! renderer.shutdown(&mut frames)?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod frame_context;
mod recorder;

pub use backend::{VulkanBackend, VulkanPipeline};
pub use frame_context::{DepthTarget, FrameTarget, VulkanFrameContext};
pub use recorder::VulkanCommandRecorder;
