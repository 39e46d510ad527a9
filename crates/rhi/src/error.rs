//! RHI-specific error types.

use ash::vk;
use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] vk::Result),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    /// Allocator mutex was poisoned by a panicking thread
    #[error("GPU allocator lock poisoned")]
    AllocatorPoisoned,

    /// Invalid handle error
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Access past the end of a mapped range
    #[error("Access out of bounds: offset {offset} + {len} bytes > {size} bytes")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    /// Mapped memory is not suitably aligned for the requested element type
    #[error("Mapped memory is not aligned for {type_name} (requires {align} bytes)")]
    Misaligned {
        type_name: &'static str,
        align: usize,
    },

    /// Buffer memory is not host visible
    #[error("Buffer memory is not mapped")]
    UnmappedMemory,
}

impl RhiError {
    /// True when the device is gone and every resource on it is unusable.
    pub fn is_device_lost(&self) -> bool {
        matches!(self, RhiError::VulkanError(vk::Result::ERROR_DEVICE_LOST))
    }
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;
