mod app;
mod config;
mod debug_messenger;
mod driver;
mod instance;
mod logging;
mod logical_device;
mod physical_device;
mod surface;
mod window;

pub use app::{run_until_closed, start, GraphicsContext, StartupError};
pub use config::{SelectionPolicy, StartupConfig, VALIDATION_LAYERS};
pub use debug_messenger::{Category, DiagnosticSink, Severity, TracingSink, DIAGNOSTIC_PREFIX};
pub use driver::{AshDriver, DebugMessengerRequest, DeviceRequest, Driver, InstanceRequest};
pub use instance::{ExtensionRequirementsProvider, Instance, InstanceCreationError};
pub use logging::init_logging;
pub use logical_device::{CreateDeviceError, DeviceFactory, LogicalDevice};
pub use physical_device::{
    describe_queue_family, find_graphics_family, score, select_highest_scored,
    select_physical_device, DeviceEnumerator, EnumerationError, Extension, PhysicalDevice,
    QueueFamily, SelectionError, SelectionScore,
};
pub use surface::{
    ensure_presentation_support, PresentationPlatform, PresentationUnsupportedError, Surface,
    SurfaceCreationError,
};
pub use window::GlfwPlatform;
