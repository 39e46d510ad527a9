//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! This crate provides a safe abstraction over Vulkan using the `ash` crate,
//! scoped to what the instanced renderer records each frame:
//! - Wrapping a host-created logical device and its memory allocator
//! - Host-visible buffers with bounds-checked mapped access
//! - Material descriptor layout, pool and writes
//! - Texture sampler
//! - Command buffer recording and per-slot fences
//! - Vertex and instance stream layouts

mod error;

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod sampler;
pub mod sync;
pub mod vertex;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;
