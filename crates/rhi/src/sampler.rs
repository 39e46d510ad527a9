//! Texture sampler shared by every material set.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Linear filtering, repeat addressing, optional anisotropy.
pub struct Sampler {
    device: Arc<Device>,
    sampler: vk::Sampler,
}

/// Anisotropy actually applied for a request against the device limit.
///
/// `None` when the feature is off or the request is 1x or less.
pub fn effective_anisotropy(requested: f32, device_limit: Option<f32>) -> Option<f32> {
    let limit = device_limit?;
    let clamped = requested.min(limit);
    (clamped > 1.0).then_some(clamped)
}

impl Sampler {
    pub fn new(device: Arc<Device>, requested_anisotropy: f32) -> RhiResult<Self> {
        let anisotropy = effective_anisotropy(requested_anisotropy, device.max_sampler_anisotropy());

        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(anisotropy.is_some())
            .max_anisotropy(anisotropy.unwrap_or(1.0))
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .compare_op(vk::CompareOp::ALWAYS)
            .max_lod(vk::LOD_CLAMP_NONE);

        let sampler = unsafe { device.handle().create_sampler(&create_info, None)? };
        debug!("Created texture sampler (anisotropy: {:?})", anisotropy);

        Ok(Self { device, sampler })
    }

    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_sampler(self.sampler, None);
        }
        debug!("Destroyed texture sampler");
    }
}
