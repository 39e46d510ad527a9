//! Error types for the instancing pipeline.

use renderer_rhi::RhiError;
use renderer_scene::MeshId;
use thiserror::Error;

use crate::frame_slots::SlotState;

/// Errors raised while preparing or recording a frame.
///
/// Allocation failures, descriptor pool exhaustion and device loss are fatal
/// and propagate to the caller. Missing meshes, missing textures and empty
/// groups are never errors; they are logged and skipped.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to allocate {size}-byte {usage} buffer for frame slot {slot}: {source}")]
    Allocation {
        slot: usize,
        size: u64,
        usage: &'static str,
        #[source]
        source: RhiError,
    },

    #[error("Failed to allocate descriptor set for mesh {mesh:?} in frame slot {slot}: {source}")]
    DescriptorAllocation {
        slot: usize,
        mesh: MeshId,
        #[source]
        source: RhiError,
    },

    #[error("Failed to upload mesh {mesh:?}: {source}")]
    MeshUpload {
        mesh: MeshId,
        #[source]
        source: RhiError,
    },

    #[error("Device error: {0}")]
    Device(#[from] RhiError),

    #[error("Invalid transition of frame slot {slot}: {from:?} -> {to:?}")]
    InvalidSlotTransition {
        slot: usize,
        from: SlotState,
        to: SlotState,
    },

    #[error("Frame slot {slot} is not writable in state {state:?}")]
    SlotNotWritable { slot: usize, state: SlotState },

    #[error("No pipeline variant registered")]
    NoPipelineVariant,
}

impl RenderError {
    /// Returns true if the failure came from a lost device.
    pub fn is_device_lost(&self) -> bool {
        match self {
            RenderError::Allocation { source, .. }
            | RenderError::DescriptorAllocation { source, .. }
            | RenderError::MeshUpload { source, .. }
            | RenderError::Device(source) => source.is_device_lost(),
            _ => false,
        }
    }
}

/// Result type alias for instancing operations.
pub type RenderResult<T> = Result<T, RenderError>;
