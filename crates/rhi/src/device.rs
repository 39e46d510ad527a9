//! Logical device handle shared by every renderer resource.
//!
//! Instance creation, GPU selection and logical device creation belong to the
//! host application. The host hands its `ash::Device` over through
//! [`ExternalDevice`], and [`Device::from_raw`] adds what the renderer needs on
//! top: the graphics queue, the gpu-allocator instance, and the limits used
//! when creating samplers.
//!
//! # Lifetime
//!
//! [`Device`] never destroys the `ash::Device`. The host must drop every
//! renderer object (and with it the last `Arc<Device>`) before it calls
//! `destroy_device`.
//!
//! # Example
//!
//! ```no_run
//! use renderer_rhi::device::{Device, ExternalDevice};
//! use ash::vk;
//!
//! # fn example(instance: &ash::Instance, device: ash::Device, gpu: vk::PhysicalDevice)
//! #     -> Result<(), renderer_rhi::RhiError> {
//! let device = Device::from_raw(ExternalDevice {
//!     instance,
//!     device,
//!     physical_device: gpu,
//!     graphics_queue_family: 0,
//!     sampler_anisotropy_enabled: true,
//! })?;
//! device.wait_idle()?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use tracing::{debug, info};

use crate::error::RhiError;

/// Handles of a logical device created by the host application.
pub struct ExternalDevice<'a> {
    pub instance: &'a ash::Instance,
    pub device: ash::Device,
    pub physical_device: vk::PhysicalDevice,
    /// Queue family the renderer submits to, queue index 0.
    pub graphics_queue_family: u32,
    /// Whether `samplerAnisotropy` was enabled at device creation.
    pub sampler_anisotropy_enabled: bool,
}

/// Vulkan logical device wrapper.
///
/// Shared across threads using `Arc`. The allocator is protected by a `Mutex`.
pub struct Device {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    allocator: Mutex<Allocator>,
    graphics_queue: vk::Queue,
    graphics_queue_family: u32,
    /// `None` when the anisotropy feature is not enabled.
    max_sampler_anisotropy: Option<f32>,
}

impl Device {
    /// Wraps a host-created device and initializes the memory allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if allocator initialization fails.
    pub fn from_raw(external: ExternalDevice<'_>) -> Result<Arc<Self>, RhiError> {
        let ExternalDevice {
            instance,
            device,
            physical_device,
            graphics_queue_family,
            sampler_anisotropy_enabled,
        } = external;

        let graphics_queue = unsafe { device.get_device_queue(graphics_queue_family, 0) };
        debug!(
            "Graphics queue retrieved from family {}",
            graphics_queue_family
        );

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let max_sampler_anisotropy =
            sampler_anisotropy_enabled.then_some(properties.limits.max_sampler_anisotropy);

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })?;

        info!(
            "GPU memory allocator initialized (max anisotropy: {:?})",
            max_sampler_anisotropy
        );

        Ok(Arc::new(Self {
            device,
            physical_device,
            allocator: Mutex::new(allocator),
            graphics_queue,
            graphics_queue_family,
            max_sampler_anisotropy,
        }))
    }

    /// Returns the Vulkan logical device handle.
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    #[inline]
    pub fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    /// Device limit for sampler anisotropy, if the feature is enabled.
    #[inline]
    pub fn max_sampler_anisotropy(&self) -> Option<f32> {
        self.max_sampler_anisotropy
    }

    /// Returns a reference to the GPU memory allocator.
    #[inline]
    pub fn allocator(&self) -> &Mutex<Allocator> {
        &self.allocator
    }

    /// Blocks until all outstanding work on every queue has completed.
    pub fn wait_idle(&self) -> Result<(), RhiError> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Submits command buffers to the graphics queue.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    /// - All command buffers are valid and recorded
    /// - Synchronization is properly handled
    /// - The fence (if provided) is unsignaled and not in use
    pub unsafe fn submit_graphics(
        &self,
        submit_infos: &[vk::SubmitInfo],
        fence: vk::Fence,
    ) -> Result<(), RhiError> {
        unsafe {
            self.device
                .queue_submit(self.graphics_queue, submit_infos, fence)?;
        }
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // The host owns the VkDevice; only the allocator is released here.
        debug!("Renderer device wrapper released");
    }
}

// Safety: Device is Send+Sync because:
// - ash::Device is Send+Sync
// - vk::PhysicalDevice and vk::Queue are Copy types (handles)
// - Allocator is protected by Mutex
unsafe impl Send for Device {}
unsafe impl Sync for Device {}
