//! Forwarding of driver diagnostics into a [`DiagnosticSink`].

use std::{
    ffi::{c_void, CStr},
    panic::{catch_unwind, AssertUnwindSafe},
    rc::Rc,
};

use ash::vk::{
    self, Bool32, DebugUtilsMessageSeverityFlagsEXT, DebugUtilsMessageTypeFlagsEXT,
    DebugUtilsMessengerCallbackDataEXT,
};
use tracing::{event, Level};

use crate::driver::DebugMessengerRequest;

/// Prefix identifying driver diagnostics in the log.
pub const DIAGNOSTIC_PREFIX: &str = "[vulkan]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Verbose,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Picks the most severe bit that is set.
    pub fn from_flags(flags: DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if flags.contains(DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Self::Error
        } else if flags.contains(DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Self::Warning
        } else if flags.contains(DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Self::Info
        } else {
            Self::Verbose
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    General,
    Validation,
    Performance,
    Other,
}

impl Category {
    pub fn from_flags(flags: DebugUtilsMessageTypeFlagsEXT) -> Self {
        if flags.contains(DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
            Self::Validation
        } else if flags.contains(DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
            Self::Performance
        } else if flags.contains(DebugUtilsMessageTypeFlagsEXT::GENERAL) {
            Self::General
        } else {
            Self::Other
        }
    }
}

/// Receives every message the driver emits through the debug messenger.
/// Implementations must not panic; a panic is swallowed at the FFI boundary
/// and the message is lost.
pub trait DiagnosticSink {
    fn report(&self, severity: Severity, category: Category, message: &str);
}

/// Sink writing driver messages to `tracing` at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, severity: Severity, category: Category, message: &str) {
        let ty = format!("{:?}", category).to_lowercase();
        match severity {
            Severity::Verbose => {
                event!(Level::TRACE, ty = ty, "{} {}", DIAGNOSTIC_PREFIX, message)
            }
            Severity::Info => event!(Level::INFO, ty = ty, "{} {}", DIAGNOSTIC_PREFIX, message),
            Severity::Warning => {
                event!(Level::WARN, ty = ty, "{} {}", DIAGNOSTIC_PREFIX, message)
            }
            Severity::Error => {
                event!(Level::ERROR, ty = ty, "{} {}", DIAGNOSTIC_PREFIX, message)
            }
        }
    }
}

/// Heap slot the messenger's user data points at. Must stay alive, and must
/// not move, until the messenger is destroyed.
pub(crate) type SinkSlot = Rc<dyn DiagnosticSink>;

pub(crate) fn messenger_request(slot: &SinkSlot) -> DebugMessengerRequest {
    DebugMessengerRequest {
        severities: DebugUtilsMessageSeverityFlagsEXT::ERROR
            | DebugUtilsMessageSeverityFlagsEXT::WARNING
            | DebugUtilsMessageSeverityFlagsEXT::INFO
            | DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
        message_types: DebugUtilsMessageTypeFlagsEXT::GENERAL
            | DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            | DebugUtilsMessageTypeFlagsEXT::VALIDATION,
        callback: Some(forward_debug_message),
        user_data: slot as *const SinkSlot as *mut c_void,
    }
}

unsafe extern "system" fn forward_debug_message(
    message_severity: DebugUtilsMessageSeverityFlagsEXT,
    message_type: DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const DebugUtilsMessengerCallbackDataEXT,
    p_user_data: *mut c_void,
) -> Bool32 {
    if p_user_data.is_null() || p_callback_data.is_null() {
        return vk::FALSE;
    }
    let sink = &*(p_user_data as *const SinkSlot);
    let p_message = (*p_callback_data).p_message;
    let message = if p_message.is_null() {
        Default::default()
    } else {
        CStr::from_ptr(p_message).to_string_lossy()
    };

    let _ = catch_unwind(AssertUnwindSafe(|| {
        sink.report(
            Severity::from_flags(message_severity),
            Category::from_flags(message_type),
            &message,
        )
    }));
    // don't skip the driver's own handling
    vk::FALSE
}
