use std::{rc::Rc, thread, time::Duration};

use thiserror::Error;
use tracing::info;

use crate::{
    config::StartupConfig,
    debug_messenger::DiagnosticSink,
    driver::Driver,
    instance::{Instance, InstanceCreationError},
    logical_device::{CreateDeviceError, DeviceFactory, LogicalDevice},
    physical_device::{
        describe_queue_family, score, select_physical_device, DeviceEnumerator, EnumerationError,
        SelectionError,
    },
    surface::{
        ensure_presentation_support, PresentationPlatform, PresentationUnsupportedError, Surface,
        SurfaceCreationError,
    },
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Instance creation failed: {0}")]
    Instance(#[from] InstanceCreationError),
    #[error("Device enumeration failed: {0}")]
    Enumeration(#[from] EnumerationError),
    #[error("Surface creation failed: {0}")]
    Surface(#[from] SurfaceCreationError),
    #[error("Physical device selection failed: {0}")]
    Selection(#[from] SelectionError),
    #[error("Logical device creation failed: {0}")]
    Device(#[from] CreateDeviceError),
    #[error("Presentation check failed: {0}")]
    Presentation(#[from] PresentationUnsupportedError),
}

/// Everything bring-up produced. Fields drop in declaration order: the device,
/// then the surface, then the instance.
pub struct GraphicsContext<D: Driver> {
    device: LogicalDevice<D>,
    surface: Surface<D>,
    instance: Rc<Instance<D>>,
}

impl<D: Driver> GraphicsContext<D> {
    pub fn device(&self) -> &LogicalDevice<D> {
        &self.device
    }

    pub fn surface(&self) -> &Surface<D> {
        &self.surface
    }

    pub fn instance(&self) -> &Rc<Instance<D>> {
        &self.instance
    }
}

/// Brings the graphics context up: instance, startup report, surface, adapter
/// selection, logical device and the presentation check. Any failure aborts
/// the whole sequence.
pub fn start<D: Driver, P: PresentationPlatform>(
    driver: Rc<D>,
    platform: &mut P,
    config: &StartupConfig,
    sink: Rc<dyn DiagnosticSink>,
) -> Result<GraphicsContext<D>, StartupError> {
    let instance = Rc::new(Instance::new(driver, &[], &*platform, config, sink)?);
    let enumerator = DeviceEnumerator::new(&instance);
    report_capabilities(&enumerator)?;

    let surface = Surface::new(&instance, platform)?;

    let physical_devices = enumerator.list_physical_devices()?;
    let physical_device = select_physical_device(&physical_devices, config.selection_policy)?;
    info!("Selected {}", physical_device.name());

    let device = DeviceFactory::new(&instance).create_graphics_device(physical_device)?;
    ensure_presentation_support(&device, &surface)?;

    Ok(GraphicsContext {
        device,
        surface,
        instance,
    })
}

/// Polls the platform until the window is closed, sleeping `poll_interval`
/// between polls.
pub fn run_until_closed(platform: &mut impl PresentationPlatform, poll_interval: Duration) {
    while platform.poll_and_check_open() {
        thread::sleep(poll_interval);
    }
    info!("Window closed, shutting down");
}

/// Logs the available extensions and, per adapter, its score and queue families.
fn report_capabilities<D: Driver>(
    enumerator: &DeviceEnumerator<'_, D>,
) -> Result<(), EnumerationError> {
    info!("[available extensions]");
    for extension in enumerator.list_instance_extensions()? {
        info!("  {}", extension.name);
    }
    info!("[available devices]");
    for physical_device in enumerator.list_physical_devices()? {
        info!("  {}", physical_device.name());
        info!("    > rate: {}", score(&physical_device));
        for queue_family in enumerator.list_queue_families(&physical_device)? {
            info!("    > queue: {}", describe_queue_family(&queue_family));
        }
    }
    Ok(())
}
