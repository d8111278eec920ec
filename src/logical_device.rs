use std::{
    ffi::{CStr, CString},
    rc::Rc,
};

use ash::vk;
use thiserror::Error;
use tracing::debug;

use crate::{
    driver::{DeviceRequest, Driver},
    instance::Instance,
    physical_device::{find_graphics_family, DeviceEnumerator, EnumerationError, PhysicalDevice},
};

const QUEUE_PRIORITIES: [f32; 1] = [1.0];

#[derive(Debug, Error)]
pub enum CreateDeviceError {
    #[error("{adapter} has no queue family supporting graphics")]
    NoSuitableQueueFamily { adapter: String },
    #[error("Could not list queue families: {0}")]
    Enumeration(#[from] EnumerationError),
    #[error("Driver rejected logical device creation: {0}")]
    Rejected(vk::Result),
}

/// Creates logical devices with a single queue used for both graphics and
/// presentation.
pub struct DeviceFactory<'instance, D: Driver> {
    instance: &'instance Rc<Instance<D>>,
    extensions: Vec<CString>,
}

impl<'instance, D: Driver> DeviceFactory<'instance, D> {
    /// No device extensions are enabled unless added with [`Self::with_extension`].
    pub fn new(instance: &'instance Rc<Instance<D>>) -> Self {
        Self {
            instance,
            extensions: vec![],
        }
    }

    pub fn with_extension(mut self, name: &CStr) -> Self {
        self.extensions.push(name.to_owned());
        self
    }

    /// Creates the logical device to interface with the selected physical device. The first
    /// queue family supporting graphics serves graphics and presentation; the adapter's whole
    /// feature set is enabled.
    pub fn create_graphics_device(
        &self,
        physical_device: &PhysicalDevice,
    ) -> Result<LogicalDevice<D>, CreateDeviceError> {
        let queue_families =
            DeviceEnumerator::new(self.instance).list_queue_families(physical_device)?;
        let queue_family_index = find_graphics_family(&queue_families)
            .map(|queue_family| queue_family.index)
            .ok_or_else(|| CreateDeviceError::NoSuitableQueueFamily {
                adapter: physical_device.name().to_owned(),
            })?;

        let request = DeviceRequest {
            queue_family_index,
            queue_priorities: &QUEUE_PRIORITIES,
            features: &physical_device.features,
            layers: self.instance.enabled_layers(),
            extensions: &self.extensions,
        };

        let driver = self.instance.driver();
        let handle = driver
            .create_device(self.instance.handle(), physical_device.handle(), &request)
            .map_err(CreateDeviceError::Rejected)?;
        let queue = driver.device_queue(handle, queue_family_index, 0);
        debug!(
            "Using queue family {} of {} for graphics and presentation",
            queue_family_index,
            physical_device.name()
        );

        Ok(LogicalDevice {
            instance: self.instance.clone(),
            handle,
            physical_device: physical_device.handle(),
            queue_family_index,
            queue,
        })
    }
}

/// A logical device and its single graphics/present queue.
///
/// Keeps its instance alive, so the device is always destroyed first.
pub struct LogicalDevice<D: Driver> {
    instance: Rc<Instance<D>>,
    handle: vk::Device,
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
    queue: vk::Queue,
}

impl<D: Driver> LogicalDevice<D> {
    pub fn handle(&self) -> vk::Device {
        self.handle
    }

    /// The adapter this device was created from.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Index of the queue family serving both graphics and presentation.
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn instance(&self) -> &Rc<Instance<D>> {
        &self.instance
    }
}

impl<D: Driver> Drop for LogicalDevice<D> {
    fn drop(&mut self) {
        self.instance.driver().destroy_device(self.handle);
    }
}
