mod queue_families;
mod scoring;

use std::ffi::c_char;

use ash::{prelude::VkResult, vk};
use thiserror::Error;
use tracing::trace;

use crate::{driver::Driver, instance::Instance};

pub use self::{
    queue_families::{describe_queue_family, find_graphics_family, QueueFamily},
    scoring::{
        score, select_highest_scored, select_physical_device, SelectionError, SelectionScore,
    },
};

#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("{what} changed during enumeration: {first} reported, then {second}")]
    TopologyChanged {
        what: &'static str,
        first: usize,
        second: usize,
    },
    #[error("{what} grew during enumeration: more than the {first} first reported")]
    TopologyGrew { what: &'static str, first: usize },
    #[error("Driver failed to enumerate {what}: {result}")]
    Driver {
        what: &'static str,
        result: vk::Result,
    },
}

/// An adapter as reported by the driver. The handle is borrowed from the
/// instance and becomes invalid once the instance is destroyed.
#[derive(Debug, Clone)]
pub struct PhysicalDevice {
    handle: vk::PhysicalDevice,
    name: String,
    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
}

impl PhysicalDevice {
    pub fn new(
        handle: vk::PhysicalDevice,
        properties: vk::PhysicalDeviceProperties,
        features: vk::PhysicalDeviceFeatures,
    ) -> Self {
        Self {
            handle,
            name: fixed_str(&properties.device_name),
            properties,
            features,
        }
    }

    pub fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_type(&self) -> vk::PhysicalDeviceType {
        self.properties.device_type
    }

    pub fn max_image_dimension_2d(&self) -> u32 {
        self.properties.limits.max_image_dimension2_d
    }

    pub fn supports_geometry_shader(&self) -> bool {
        self.features.geometry_shader == vk::TRUE
    }
}

/// An instance extension, for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub name: String,
    pub spec_version: u32,
}

/// Wraps the Vulkan APIs to interact with physical devices
pub struct DeviceEnumerator<'instance, D: Driver> {
    instance: &'instance Instance<D>,
}

impl<'instance, D: Driver> DeviceEnumerator<'instance, D> {
    pub fn new(instance: &'instance Instance<D>) -> Self {
        Self { instance }
    }

    /// Queries the physical devices available on this machine, in driver order.
    pub fn list_physical_devices(&self) -> Result<Vec<PhysicalDevice>, EnumerationError> {
        let driver = self.instance.driver();
        let handle = self.instance.handle();
        let driver_error = |result| EnumerationError::Driver {
            what: "physical device properties",
            result,
        };
        let physical_devices = enumerate_twice("physical devices", |out| {
            driver.enumerate_physical_devices(handle, out)
        })?
        .into_iter()
        .map(|physical_device| {
            Ok(PhysicalDevice::new(
                physical_device,
                driver
                    .physical_device_properties(handle, physical_device)
                    .map_err(driver_error)?,
                driver
                    .physical_device_features(handle, physical_device)
                    .map_err(driver_error)?,
            ))
        })
        .collect::<Result<Vec<_>, EnumerationError>>()?;
        trace!("{} physical devices found", physical_devices.len());
        Ok(physical_devices)
    }

    /// Queries the queue families of `physical_device`. Each family records
    /// its position in the driver's list.
    pub fn list_queue_families(
        &self,
        physical_device: &PhysicalDevice,
    ) -> Result<Vec<QueueFamily>, EnumerationError> {
        let driver = self.instance.driver();
        let handle = self.instance.handle();
        let properties = enumerate_twice("queue families", |out| {
            driver.queue_family_properties(handle, physical_device.handle(), out)
        })?;
        Ok(properties
            .into_iter()
            .enumerate()
            .map(|(index, properties)| QueueFamily {
                index: index as u32,
                properties,
            })
            .collect())
    }

    pub fn list_instance_extensions(&self) -> Result<Vec<Extension>, EnumerationError> {
        let driver = self.instance.driver();
        let extensions = enumerate_twice("instance extensions", |out| {
            driver.enumerate_instance_extensions(out)
        })?;
        Ok(extensions
            .iter()
            .map(|extension| Extension {
                name: fixed_str(&extension.extension_name),
                spec_version: extension.spec_version,
            })
            .collect())
    }
}

/// Runs the count query, then fills a buffer of exactly that size. Any change
/// in the count between the two calls is fatal.
fn enumerate_twice<T: Default + Clone>(
    what: &'static str,
    mut query: impl FnMut(Option<&mut [T]>) -> VkResult<u32>,
) -> Result<Vec<T>, EnumerationError> {
    let driver_error = |result| EnumerationError::Driver { what, result };

    let first = query(None).map_err(driver_error)? as usize;
    let mut items = vec![T::default(); first];
    let second = match query(Some(&mut items)) {
        Ok(count) => count as usize,
        Err(vk::Result::INCOMPLETE) => return Err(EnumerationError::TopologyGrew { what, first }),
        Err(result) => return Err(driver_error(result)),
    };
    if second != first {
        return Err(EnumerationError::TopologyChanged {
            what,
            first,
            second,
        });
    }
    Ok(items)
}

/// Reads a NUL-terminated string out of a fixed-size driver array.
fn fixed_str(raw: &[c_char]) -> String {
    let bytes = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect::<Vec<_>>();
    String::from_utf8_lossy(&bytes).into_owned()
}
