use std::time::Duration;

use ash::vk::make_api_version;

#[cfg(any(debug_assertions, feature = "enable_validations"))]
const ENABLE_VALIDATIONS: bool = true;
#[cfg(not(any(debug_assertions, feature = "enable_validations")))]
const ENABLE_VALIDATIONS: bool = false;

/// Layers requested when diagnostics are enabled.
pub const VALIDATION_LAYERS: &[&str] = &["VK_LAYER_KHRONOS_validation"];

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Which enumerated adapter the startup sequence hands to the device factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Pick the adapter with the strictly highest score, earliest on ties.
    #[default]
    HighestScore,
    /// Pick whatever adapter the driver lists first, ignoring the ranking.
    /// An adapter that scores 0 is still rejected.
    FirstListed,
}

/// Startup settings, resolved once before the instance is created and never
/// changed afterwards.
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub application_name: String,
    /// Packed with `make_api_version`.
    pub application_version: u32,
    /// Requests the debug utils extension, the layers below, and a debug messenger.
    pub enable_diagnostics: bool,
    pub layer_names: Vec<String>,
    pub selection_policy: SelectionPolicy,
    /// Sleep between two polls of the presentation loop.
    pub poll_interval: Duration,
}

impl StartupConfig {
    /// Builds the configuration from the package metadata and the build profile.
    /// Diagnostics are on for debug builds and whenever the `enable_validations`
    /// feature is set.
    pub fn from_build() -> Self {
        let version_major = env!("CARGO_PKG_VERSION_MAJOR").parse::<u32>().unwrap_or(0);
        let version_minor = env!("CARGO_PKG_VERSION_MINOR").parse::<u32>().unwrap_or(0);
        let version_patch = env!("CARGO_PKG_VERSION_PATCH").parse::<u32>().unwrap_or(0);

        Self {
            application_name: env!("CARGO_PKG_NAME").to_owned(),
            application_version: make_api_version(0, version_major, version_minor, version_patch),
            enable_diagnostics: ENABLE_VALIDATIONS,
            layer_names: VALIDATION_LAYERS.iter().map(|layer| (*layer).to_owned()).collect(),
            selection_policy: SelectionPolicy::default(),
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_diagnostics(mut self, enable_diagnostics: bool) -> Self {
        self.enable_diagnostics = enable_diagnostics;
        self
    }

    pub fn with_selection_policy(mut self, selection_policy: SelectionPolicy) -> Self {
        self.selection_policy = selection_policy;
        self
    }

    /// Layers that are actually requested from the driver.
    pub fn enabled_layers(&self) -> &[String] {
        if self.enable_diagnostics {
            &self.layer_names
        } else {
            &[]
        }
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self::from_build()
    }
}
