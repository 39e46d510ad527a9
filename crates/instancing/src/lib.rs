//! Frame-synchronized scene to instanced draw call pipeline.
//!
//! This crate turns a [`SceneSnapshot`](renderer_scene::SceneSnapshot) into
//! one instanced draw per mesh for the frame slot being recorded:
//! - Grouping instances by mesh
//! - Per-slot uniform buffers, instance buffers and descriptor sets
//! - Slot lifecycle tracking against in-flight GPU work
//! - Draw recording through backend-agnostic traits, with a Vulkan backend

mod error;

pub mod backend;
pub mod frame_resources;
pub mod frame_slots;
pub mod grouper;
pub mod mesh_library;
pub mod pipelines;
pub mod scene_renderer;
pub mod ubo;
pub mod vulkan;

pub use backend::{
    CommandRecorder, GpuBackend, GraphicsDeviceContext, HostBuffer, MaterialBinding, OutputExtent,
};
pub use error::{RenderError, RenderResult};
pub use frame_resources::{CapacityReport, FrameResourceManager};
pub use frame_slots::{FrameSlotTracker, SlotState};
pub use grouper::{InstanceGroup, InstanceGrouper};
pub use scene_renderer::{DrawSummary, FrameStats, SceneRenderer};
pub use ubo::{GlobalUniformBlock, InstanceRecord, LightBlock};
