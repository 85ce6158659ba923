//! Compute device discovery.

use crate::api::{ComputeApi, DeviceClass, DeviceInfo};
use crate::error::GpuError;

/// The one device a run executes on.
pub struct SelectedDevice<D> {
    pub device: D,
    pub info: DeviceInfo,
}

/// Picks the first platform and, on it, a GPU-class device, falling back to a
/// CPU-class device. There is no retry: a failed query means the environment
/// cannot run the pipeline.
pub struct DeviceSelector<'a, A: ComputeApi> {
    api: &'a A,
}

impl<'a, A: ComputeApi> DeviceSelector<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    pub fn select(&self) -> Result<SelectedDevice<A::Device>, GpuError> {
        let platform = self
            .api
            .platforms()?
            .into_iter()
            .next()
            .ok_or(GpuError::NoPlatform)?;
        let platform_name = self.api.platform_name(&platform);
        log::debug!("Using compute platform {platform_name}");

        let device = match self.first_of_class(&platform, DeviceClass::Gpu)? {
            Some(device) => device,
            None => {
                log::info!("No GPU device on {platform_name}, falling back to CPU");
                self.first_of_class(&platform, DeviceClass::Cpu)?
                    .ok_or(GpuError::NoDevice {
                        platform: platform_name,
                    })?
            }
        };

        let info = self.api.device_info(&device);
        log::info!("Compute device: {info}");
        Ok(SelectedDevice { device, info })
    }

    fn first_of_class(
        &self,
        platform: &A::Platform,
        class: DeviceClass,
    ) -> Result<Option<A::Device>, GpuError> {
        Ok(self.api.devices(platform, class)?.into_iter().next())
    }
}
