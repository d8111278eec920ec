use std::{ops::Deref, rc::Rc};

use ash::vk::{self, SurfaceKHR};
use thiserror::Error;
use tracing::trace;

use crate::{
    driver::Driver,
    instance::{ExtensionRequirementsProvider, Instance},
    logical_device::LogicalDevice,
};

#[derive(Debug, Error)]
pub enum SurfaceCreationError {
    #[error("Failed to create the window: {0}")]
    Window(String),
    #[error("Failed to create window surface: {0}")]
    Rejected(vk::Result),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresentationUnsupportedError {
    #[error("Queue family {queue_family_index} cannot present to the window surface")]
    Unsupported { queue_family_index: u32 },
    #[error("Could not query presentation support: {0}")]
    Query(vk::Result),
}

/// The windowing side of the application: owns the window, builds a surface
/// for it, and reports whether it is still open.
pub trait PresentationPlatform: ExtensionRequirementsProvider {
    fn create_surface(
        &mut self,
        instance: vk::Instance,
    ) -> Result<SurfaceKHR, SurfaceCreationError>;

    /// Processes pending window events. Returns `false` once the user asked to close.
    fn poll_and_check_open(&mut self) -> bool;
}

/// A presentation surface, destroyed before the instance it was created from.
pub struct Surface<D: Driver> {
    surface: SurfaceKHR,
    // references to make sure we are dropped before these
    instance: Rc<Instance<D>>,
}

impl<D: Driver> Surface<D> {
    pub fn new(
        instance: &Rc<Instance<D>>,
        platform: &mut impl PresentationPlatform,
    ) -> Result<Self, SurfaceCreationError> {
        let surface = platform.create_surface(instance.handle())?;
        trace!("Surface created");
        Ok(Self {
            surface,
            instance: instance.clone(),
        })
    }

    pub fn supports_presentation(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
    ) -> Result<bool, vk::Result> {
        self.instance.driver().surface_support(
            self.instance.handle(),
            physical_device,
            queue_family_index,
            self.surface,
        )
    }
}

impl<D: Driver> Drop for Surface<D> {
    fn drop(&mut self) {
        self.instance
            .driver()
            .destroy_surface(self.instance.handle(), self.surface);
    }
}

impl<D: Driver> Deref for Surface<D> {
    type Target = SurfaceKHR;

    fn deref(&self) -> &Self::Target {
        &self.surface
    }
}

/// Checks once that the device's queue family can present to `surface`.
pub fn ensure_presentation_support<D: Driver>(
    device: &LogicalDevice<D>,
    surface: &Surface<D>,
) -> Result<(), PresentationUnsupportedError> {
    let queue_family_index = device.queue_family_index();
    let supported = surface
        .supports_presentation(device.physical_device(), queue_family_index)
        .map_err(PresentationUnsupportedError::Query)?;
    if !supported {
        return Err(PresentationUnsupportedError::Unsupported { queue_family_index });
    }
    Ok(())
}
