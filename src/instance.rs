use std::{
    ffi::{CString, NulError},
    rc::Rc,
};

use ash::{
    extensions::ext::DebugUtils,
    vk::{self, API_VERSION_1_0},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::StartupConfig,
    debug_messenger::{messenger_request, DiagnosticSink, SinkSlot},
    driver::{Driver, InstanceRequest},
};

const API_VERSION: u32 = API_VERSION_1_0;

/// Supplies the instance extensions the platform needs for presentation.
pub trait ExtensionRequirementsProvider {
    fn required_presentation_extensions(&self) -> Vec<String>;
}

#[derive(Debug, Error)]
pub enum InstanceCreationError {
    #[error("Invalid name passed to instance creation: {0}")]
    InvalidName(#[from] NulError),
    #[error("Driver rejected instance creation: {0}")]
    Rejected(vk::Result),
    #[error("Failed to set up debug messenger: {0}")]
    DebugMessenger(vk::Result),
}

/// Owns a Vulkan instance and, when diagnostics are enabled, the debug
/// messenger registered against it.
///
/// Surfaces and logical devices keep an `Rc<Instance>`, so the instance is
/// always destroyed after them.
pub struct Instance<D: Driver> {
    driver: Rc<D>,
    handle: vk::Instance,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    // user data of the debug messenger, dropped after it is destroyed
    _sink: Option<Box<SinkSlot>>,
    extensions: Vec<CString>,
    layers: Vec<CString>,
}

impl<D: Driver> Instance<D> {
    /// Creates an Instance to interact with the core of Vulkan. Registers the needed extensions and
    /// layers, as well as basic information about the application, and hooks `sink` up to the
    /// driver's diagnostics if they are enabled.
    pub fn new(
        driver: Rc<D>,
        required_extensions: &[String],
        provider: &impl ExtensionRequirementsProvider,
        config: &StartupConfig,
        sink: Rc<dyn DiagnosticSink>,
    ) -> Result<Self, InstanceCreationError> {
        let extension_names = merge_extensions(
            provider.required_presentation_extensions(),
            required_extensions,
            config.enable_diagnostics,
        );
        debug!("Instance extension names: {:?}", extension_names);
        debug!("Layers to enable: {}", config.enabled_layers().join(", "));

        let extensions = to_c_strings(&extension_names)?;
        let layers = to_c_strings(config.enabled_layers())?;
        let application_name = CString::new(config.application_name.as_str())?;

        let request = InstanceRequest {
            application_name: &application_name,
            application_version: config.application_version,
            api_version: API_VERSION,
            extensions: &extensions,
            layers: &layers,
        };
        let handle = driver
            .create_instance(&request)
            .map_err(InstanceCreationError::Rejected)?;

        let mut instance = Self {
            driver,
            handle,
            debug_messenger: None,
            _sink: None,
            extensions,
            layers,
        };
        if config.enable_diagnostics {
            // on failure the instance is dropped, which destroys the handle
            instance.register_debug_messenger(sink)?;
        }
        Ok(instance)
    }

    fn register_debug_messenger(
        &mut self,
        sink: Rc<dyn DiagnosticSink>,
    ) -> Result<(), InstanceCreationError> {
        let slot = Box::new(sink);
        let request = messenger_request(&slot);
        match self.driver.create_debug_messenger(self.handle, &request) {
            None => {
                warn!("Debug utils entry point unavailable, driver diagnostics disabled");
            }
            Some(messenger) => {
                let messenger = messenger.map_err(InstanceCreationError::DebugMessenger)?;
                self.debug_messenger = Some(messenger);
                self._sink = Some(slot);
            }
        }
        Ok(())
    }

    pub fn handle(&self) -> vk::Instance {
        self.handle
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn has_debug_messenger(&self) -> bool {
        self.debug_messenger.is_some()
    }

    pub fn enabled_extensions(&self) -> &[CString] {
        &self.extensions
    }

    /// The layer list the instance was created with. Logical devices are
    /// created with the same list.
    pub fn enabled_layers(&self) -> &[CString] {
        &self.layers
    }
}

impl<D: Driver> Drop for Instance<D> {
    fn drop(&mut self) {
        if let Some(messenger) = self.debug_messenger.take() {
            self.driver.destroy_debug_messenger(self.handle, messenger);
        }
        self.driver.destroy_instance(self.handle);
    }
}

/// Returns the needed instance extensions: the platform ones first, then the caller's, without
/// duplicates. Diagnostics add the debug utils extension.
fn merge_extensions(
    platform_extensions: Vec<String>,
    required_extensions: &[String],
    enable_diagnostics: bool,
) -> Vec<String> {
    let mut extension_names: Vec<String> = vec![];
    let diagnostics = enable_diagnostics
        .then(|| DebugUtils::name().to_string_lossy().into_owned());
    for extension_name in platform_extensions
        .into_iter()
        .chain(required_extensions.iter().cloned())
        .chain(diagnostics)
    {
        if !extension_names.contains(&extension_name) {
            extension_names.push(extension_name);
        }
    }
    extension_names
}

pub(crate) fn to_c_strings<S: AsRef<str>>(names: &[S]) -> Result<Vec<CString>, NulError> {
    names
        .iter()
        .map(|name| CString::new(name.as_ref()))
        .collect::<Result<Vec<_>, _>>()
}
