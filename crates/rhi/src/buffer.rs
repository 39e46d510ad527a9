//! Host-visible GPU buffers.
//!
//! Every buffer the renderer creates lives in `CpuToGpu` memory that stays
//! persistently mapped, so the CPU writes straight into it without staging.
//! Access goes through byte slices sized to the buffer, and typed access
//! through [`cast_mapped`] / [`cast_mapped_mut`], which check length and
//! alignment instead of doing pointer arithmetic.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use renderer_rhi::device::Device;
//! use renderer_rhi::buffer::{Buffer, BufferUsage};
//!
//! # fn example(device: Arc<Device>) -> Result<(), renderer_rhi::RhiError> {
//! let indices: [u32; 3] = [0, 1, 2];
//! let index_buffer = Buffer::new_with_data(
//!     device,
//!     BufferUsage::Index,
//!     bytemuck::cast_slice(&indices),
//! )?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use bytemuck::Pod;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::{debug, error};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Buffer usage type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Static per-vertex mesh data, vertex stream 0
    Vertex,
    /// 32-bit mesh indices
    Index,
    /// Per-frame global uniform block
    Uniform,
    /// Per-frame instance records, vertex stream 1
    Instance,
}

impl BufferUsage {
    /// Converts to Vulkan buffer usage flags.
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex | BufferUsage::Instance => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        }
    }

    /// All renderer buffers are written by the CPU and read by the GPU.
    pub fn memory_location(self) -> MemoryLocation {
        MemoryLocation::CpuToGpu
    }

    /// Returns a human-readable name for the buffer type.
    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
            BufferUsage::Uniform => "uniform",
            BufferUsage::Instance => "instance",
        }
    }
}

/// GPU buffer wrapper with managed, persistently mapped memory.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    usage: BufferUsage,
}

impl Buffer {
    /// Creates a new buffer with the specified size.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer or memory allocation fails, or if the
    /// allocation did not come back host mapped.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::InvalidHandle(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };
        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = device
            .allocator()
            .lock()
            .map_err(|_| RhiError::AllocatorPoisoned)
            .and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: usage.name(),
                        requirements,
                        location: usage.memory_location(),
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(RhiError::from)
            });

        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let bound = unsafe {
            device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        };

        // Ownership moves into `Self` before the checks so Drop cleans up on failure.
        let buffer = Self {
            device,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
        };
        bound?;

        if buffer
            .allocation
            .as_ref()
            .and_then(Allocation::mapped_ptr)
            .is_none()
        {
            return Err(RhiError::UnmappedMemory);
        }

        debug!("Created {} buffer: {} bytes", usage.name(), size);
        Ok(buffer)
    }

    /// Creates a buffer sized to `data` and copies it in.
    pub fn new_with_data(device: Arc<Device>, usage: BufferUsage, data: &[u8]) -> RhiResult<Self> {
        let mut buffer = Self::new(device, usage, data.len() as vk::DeviceSize)?;
        buffer.write_data(0, data)?;
        Ok(buffer)
    }

    /// Copies `data` into the mapped memory at `offset`.
    pub fn write_data(&mut self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let range = checked_range(offset, data.len() as u64, self.size)?;
        self.mapped_slice_mut()?[range].copy_from_slice(data);
        Ok(())
    }

    /// The mapped bytes of this buffer, exactly `size()` long.
    pub fn mapped_slice(&self) -> RhiResult<&[u8]> {
        let size = self.size as usize;
        self.allocation
            .as_ref()
            .and_then(Allocation::mapped_slice)
            .and_then(|bytes| bytes.get(..size))
            .ok_or(RhiError::UnmappedMemory)
    }

    /// Mutable mapped bytes of this buffer, exactly `size()` long.
    pub fn mapped_slice_mut(&mut self) -> RhiResult<&mut [u8]> {
        let size = self.size as usize;
        self.allocation
            .as_mut()
            .and_then(Allocation::mapped_slice_mut)
            .and_then(|bytes| bytes.get_mut(..size))
            .ok_or(RhiError::UnmappedMemory)
    }

    /// Returns the Vulkan buffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Returns the buffer size in bytes.
    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Returns the buffer usage type.
    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        // Free allocation first, then destroy buffer
        if let Some(allocation) = self.allocation.take() {
            match self.device.allocator().lock() {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.free(allocation) {
                        error!("Failed to free buffer allocation: {:?}", e);
                    }
                }
                Err(_) => error!("Allocator lock poisoned; leaking {} buffer", self.usage.name()),
            }
        }

        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }

        debug!("Destroyed {} buffer ({} bytes)", self.usage.name(), self.size);
    }
}

/// Byte range `offset..offset + len`, or `OutOfBounds` if it ends past `size`.
pub fn checked_range(offset: u64, len: u64, size: u64) -> RhiResult<std::ops::Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(offset as usize..end as usize),
        _ => Err(RhiError::OutOfBounds { offset, len, size }),
    }
}

/// Views the first `count` elements of mapped memory as `T`.
pub fn cast_mapped<T: Pod>(bytes: &[u8], count: usize) -> RhiResult<&[T]> {
    let len = (count * std::mem::size_of::<T>()) as u64;
    let range = checked_range(0, len, bytes.len() as u64)?;
    bytemuck::try_cast_slice(&bytes[range]).map_err(|_| misaligned::<T>())
}

/// Mutable view of the first `count` elements of mapped memory as `T`.
///
/// Writing element `i` touches only bytes `i * size_of::<T>()..(i + 1) * size_of::<T>()`,
/// so disjoint elements can be handed to different threads.
pub fn cast_mapped_mut<T: Pod>(bytes: &mut [u8], count: usize) -> RhiResult<&mut [T]> {
    let len = (count * std::mem::size_of::<T>()) as u64;
    let range = checked_range(0, len, bytes.len() as u64)?;
    bytemuck::try_cast_slice_mut(&mut bytes[range]).map_err(|_| misaligned::<T>())
}

fn misaligned<T>() -> RhiError {
    RhiError::Misaligned {
        type_name: std::any::type_name::<T>(),
        align: std::mem::align_of::<T>(),
    }
}
