//! The raw Vulkan entry points used during bring-up.
//!
//! Everything above this module talks to the driver through [`Driver`], which
//! keeps the enumeration calls in their two-call shape (pass `None` to query a
//! count, then a buffer of that size to fill it). [`AshDriver`] is the
//! production implementation; tests substitute a recording fake.

mod ash_driver;

use std::ffi::{c_void, CStr, CString};

use ash::{prelude::VkResult, vk};

pub use self::ash_driver::AshDriver;

/// Parameters for `vkCreateInstance`.
#[derive(Debug)]
pub struct InstanceRequest<'a> {
    pub application_name: &'a CStr,
    pub application_version: u32,
    pub api_version: u32,
    pub extensions: &'a [CString],
    pub layers: &'a [CString],
}

/// Parameters for `vkCreateDebugUtilsMessengerEXT`.
#[derive(Clone, Copy)]
pub struct DebugMessengerRequest {
    pub severities: vk::DebugUtilsMessageSeverityFlagsEXT,
    pub message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    pub callback: vk::PFN_vkDebugUtilsMessengerCallbackEXT,
    pub user_data: *mut c_void,
}

/// Parameters for `vkCreateDevice` with a single queue create info.
#[derive(Debug)]
pub struct DeviceRequest<'a> {
    pub queue_family_index: u32,
    pub queue_priorities: &'a [f32],
    pub features: &'a vk::PhysicalDeviceFeatures,
    pub layers: &'a [CString],
    pub extensions: &'a [CString],
}

/// Blocking calls into the graphics driver. None of them may run concurrently
/// against the same instance or device.
pub trait Driver {
    fn create_instance(&self, request: &InstanceRequest<'_>) -> VkResult<vk::Instance>;

    fn destroy_instance(&self, instance: vk::Instance);

    /// Returns `None` when the driver does not expose the debug utils entry point.
    fn create_debug_messenger(
        &self,
        instance: vk::Instance,
        request: &DebugMessengerRequest,
    ) -> Option<VkResult<vk::DebugUtilsMessengerEXT>>;

    fn destroy_debug_messenger(
        &self,
        instance: vk::Instance,
        messenger: vk::DebugUtilsMessengerEXT,
    );

    /// Writes at most `out.len()` entries. `VK_INCOMPLETE` comes back as an error.
    fn enumerate_instance_extensions(
        &self,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> VkResult<u32>;

    /// Writes at most `out.len()` entries. `VK_INCOMPLETE` comes back as an error.
    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
        out: Option<&mut [vk::PhysicalDevice]>,
    ) -> VkResult<u32>;

    /// Fails only when `instance` was not created through this driver.
    fn physical_device_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<vk::PhysicalDeviceProperties>;

    fn physical_device_features(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<vk::PhysicalDeviceFeatures>;

    /// Returns the number of entries written, or the total count when `out` is `None`.
    fn queue_family_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        out: Option<&mut [vk::QueueFamilyProperties]>,
    ) -> VkResult<u32>;

    fn create_device(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        request: &DeviceRequest<'_>,
    ) -> VkResult<vk::Device>;

    fn device_queue(&self, device: vk::Device, queue_family_index: u32, queue_index: u32)
        -> vk::Queue;

    fn destroy_device(&self, device: vk::Device);

    fn surface_support(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;

    fn destroy_surface(&self, instance: vk::Instance, surface: vk::SurfaceKHR);
}
