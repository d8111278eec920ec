#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    ffi::{c_char, CStr},
    rc::Rc,
};

use ash::{
    prelude::VkResult,
    vk::{self, Handle, PhysicalDeviceType, QueueFlags},
};
use render3d::{
    Category, DebugMessengerRequest, DeviceRequest, DiagnosticSink, Driver,
    ExtensionRequirementsProvider, Instance, InstanceRequest, PresentationPlatform, Severity,
    StartupConfig, SurfaceCreationError,
};

pub const INSTANCE_HANDLE: u64 = 0x1000;
pub const DEVICE_HANDLE: u64 = 0x2000;
pub const QUEUE_HANDLE_BASE: u64 = 0x3000;
pub const MESSENGER_HANDLE: u64 = 0x4000;
pub const SURFACE_HANDLE: u64 = 0x5000;

#[derive(Debug, Clone)]
pub struct FakeAdapter {
    pub name: &'static str,
    pub device_type: PhysicalDeviceType,
    pub geometry_shader: bool,
    pub max_image_dimension_2d: u32,
    pub queue_families: Vec<QueueFlags>,
    pub presentable: bool,
}

impl FakeAdapter {
    pub fn discrete(name: &'static str) -> Self {
        Self {
            name,
            device_type: PhysicalDeviceType::DISCRETE_GPU,
            geometry_shader: true,
            max_image_dimension_2d: 16384,
            queue_families: vec![QueueFlags::GRAPHICS | QueueFlags::COMPUTE],
            presentable: true,
        }
    }

    pub fn integrated(name: &'static str) -> Self {
        Self {
            device_type: PhysicalDeviceType::INTEGRATED_GPU,
            max_image_dimension_2d: 8192,
            ..Self::discrete(name)
        }
    }

    pub fn with_queue_families(mut self, queue_families: Vec<QueueFlags>) -> Self {
        self.queue_families = queue_families;
        self
    }

    pub fn without_geometry_shader(mut self) -> Self {
        self.geometry_shader = false;
        self
    }

    pub fn not_presentable(mut self) -> Self {
        self.presentable = false;
        self
    }
}

/// Driver calls that matter for ordering and request contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateInstance {
        application_name: String,
        extensions: Vec<String>,
        layers: Vec<String>,
    },
    DestroyInstance,
    CreateDebugMessenger,
    DestroyDebugMessenger,
    CreateDevice {
        adapter: usize,
        queue_family_index: u32,
        queue_priorities: Vec<f32>,
        geometry_shader: bool,
        layers: Vec<String>,
        extensions: Vec<String>,
    },
    GetDeviceQueue {
        queue_family_index: u32,
        queue_index: u32,
    },
    DestroyDevice,
    SurfaceSupport {
        adapter: usize,
        queue_family_index: u32,
    },
    DestroySurface,
}

/// Recording stand-in for the Vulkan driver.
pub struct FakeDriver {
    pub adapters: Vec<FakeAdapter>,
    pub instance_extensions: Vec<&'static str>,
    pub reject_instance: Option<vk::Result>,
    pub debug_entry_point: bool,
    pub reject_debug_messenger: Option<vk::Result>,
    /// Added to the visible adapter count after the first count query.
    pub hotplug: isize,
    pub warning_on_device_creation: Option<&'static CStr>,
    pub reject_device: Option<vk::Result>,
    pub surface_query_error: Option<vk::Result>,
    calls: RefCell<Vec<Call>>,
    messenger: Cell<Option<DebugMessengerRequest>>,
}

impl FakeDriver {
    pub fn new(adapters: Vec<FakeAdapter>) -> Self {
        Self {
            adapters,
            instance_extensions: vec!["VK_KHR_surface", "VK_EXT_debug_utils"],
            reject_instance: None,
            debug_entry_point: true,
            reject_debug_messenger: None,
            hotplug: 0,
            warning_on_device_creation: None,
            reject_device: None,
            surface_query_error: None,
            calls: RefCell::new(vec![]),
            messenger: Cell::new(None),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn device_creations(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, Call::CreateDevice { .. }))
            .count()
    }

    /// The destroy calls, in the order they happened.
    pub fn teardown(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    Call::DestroyDevice
                        | Call::DestroySurface
                        | Call::DestroyDebugMessenger
                        | Call::DestroyInstance
                )
            })
            .cloned()
            .collect()
    }

    pub fn has_messenger(&self) -> bool {
        self.messenger.get().is_some()
    }

    /// Delivers a message through the registered messenger, as a layer would.
    /// Returns the callback's verdict, or `None` without a messenger.
    pub fn emit(
        &self,
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT,
        message: &CStr,
    ) -> Option<vk::Bool32> {
        let request = self.messenger.get()?;
        let callback = request.callback?;
        let data = vk::DebugUtilsMessengerCallbackDataEXT {
            p_message: message.as_ptr(),
            ..Default::default()
        };
        Some(unsafe { callback(severity, message_type, &data, request.user_data) })
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn adapter_index(physical_device: vk::PhysicalDevice) -> usize {
        physical_device.as_raw() as usize - 1
    }

    fn adapter(&self, physical_device: vk::PhysicalDevice) -> &FakeAdapter {
        &self.adapters[Self::adapter_index(physical_device)]
    }
}

fn strings(names: &[std::ffi::CString]) -> Vec<String> {
    names
        .iter()
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

fn write_fixed(target: &mut [c_char], value: &str) {
    for (slot, byte) in target.iter_mut().zip(value.bytes()) {
        *slot = byte as c_char;
    }
}

impl Driver for FakeDriver {
    fn create_instance(&self, request: &InstanceRequest<'_>) -> VkResult<vk::Instance> {
        self.record(Call::CreateInstance {
            application_name: request.application_name.to_string_lossy().into_owned(),
            extensions: strings(request.extensions),
            layers: strings(request.layers),
        });
        match self.reject_instance {
            Some(result) => Err(result),
            None => Ok(vk::Instance::from_raw(INSTANCE_HANDLE)),
        }
    }

    fn destroy_instance(&self, _instance: vk::Instance) {
        self.record(Call::DestroyInstance);
    }

    fn create_debug_messenger(
        &self,
        _instance: vk::Instance,
        request: &DebugMessengerRequest,
    ) -> Option<VkResult<vk::DebugUtilsMessengerEXT>> {
        if !self.debug_entry_point {
            return None;
        }
        self.record(Call::CreateDebugMessenger);
        if let Some(result) = self.reject_debug_messenger {
            return Some(Err(result));
        }
        self.messenger.set(Some(*request));
        Some(Ok(vk::DebugUtilsMessengerEXT::from_raw(MESSENGER_HANDLE)))
    }

    fn destroy_debug_messenger(
        &self,
        _instance: vk::Instance,
        _messenger: vk::DebugUtilsMessengerEXT,
    ) {
        self.record(Call::DestroyDebugMessenger);
        self.messenger.set(None);
    }

    fn enumerate_instance_extensions(
        &self,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> VkResult<u32> {
        let Some(buffer) = out else {
            return Ok(self.instance_extensions.len() as u32);
        };
        for (slot, name) in buffer.iter_mut().zip(&self.instance_extensions) {
            write_fixed(&mut slot.extension_name, name);
            slot.spec_version = 1;
        }
        Ok(buffer.len().min(self.instance_extensions.len()) as u32)
    }

    fn enumerate_physical_devices(
        &self,
        _instance: vk::Instance,
        out: Option<&mut [vk::PhysicalDevice]>,
    ) -> VkResult<u32> {
        let Some(buffer) = out else {
            return Ok(self.adapters.len() as u32);
        };
        let visible = (self.adapters.len() as isize + self.hotplug).max(0) as usize;
        let written = visible.min(buffer.len());
        for (index, slot) in buffer.iter_mut().take(written).enumerate() {
            *slot = vk::PhysicalDevice::from_raw(index as u64 + 1);
        }
        if visible > buffer.len() {
            Err(vk::Result::INCOMPLETE)
        } else {
            Ok(written as u32)
        }
    }

    fn physical_device_properties(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<vk::PhysicalDeviceProperties> {
        let adapter = self.adapter(physical_device);
        let mut properties = vk::PhysicalDeviceProperties {
            device_type: adapter.device_type,
            ..Default::default()
        };
        properties.limits.max_image_dimension2_d = adapter.max_image_dimension_2d;
        write_fixed(&mut properties.device_name, adapter.name);
        Ok(properties)
    }

    fn physical_device_features(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<vk::PhysicalDeviceFeatures> {
        Ok(vk::PhysicalDeviceFeatures {
            geometry_shader: self.adapter(physical_device).geometry_shader.into(),
            ..Default::default()
        })
    }

    fn queue_family_properties(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        out: Option<&mut [vk::QueueFamilyProperties]>,
    ) -> VkResult<u32> {
        let queue_families = &self.adapter(physical_device).queue_families;
        let Some(buffer) = out else {
            return Ok(queue_families.len() as u32);
        };
        for (slot, queue_flags) in buffer.iter_mut().zip(queue_families) {
            *slot = vk::QueueFamilyProperties {
                queue_flags: *queue_flags,
                queue_count: 1,
                timestamp_valid_bits: 64,
                min_image_transfer_granularity: vk::Extent3D {
                    width: 1,
                    height: 1,
                    depth: 1,
                },
            };
        }
        Ok(buffer.len().min(queue_families.len()) as u32)
    }

    fn create_device(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        request: &DeviceRequest<'_>,
    ) -> VkResult<vk::Device> {
        self.record(Call::CreateDevice {
            adapter: Self::adapter_index(physical_device),
            queue_family_index: request.queue_family_index,
            queue_priorities: request.queue_priorities.to_vec(),
            geometry_shader: request.features.geometry_shader == vk::TRUE,
            layers: strings(request.layers),
            extensions: strings(request.extensions),
        });
        if let Some(message) = self.warning_on_device_creation {
            let verdict = self.emit(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                message,
            );
            // a layer aborts the call when the callback asks it to
            if verdict == Some(vk::TRUE) {
                return Err(vk::Result::ERROR_VALIDATION_FAILED_EXT);
            }
        }
        match self.reject_device {
            Some(result) => Err(result),
            None => Ok(vk::Device::from_raw(DEVICE_HANDLE)),
        }
    }

    fn device_queue(
        &self,
        _device: vk::Device,
        queue_family_index: u32,
        queue_index: u32,
    ) -> vk::Queue {
        self.record(Call::GetDeviceQueue {
            queue_family_index,
            queue_index,
        });
        vk::Queue::from_raw(QUEUE_HANDLE_BASE + u64::from(queue_family_index))
    }

    fn destroy_device(&self, _device: vk::Device) {
        self.record(Call::DestroyDevice);
    }

    fn surface_support(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        self.record(Call::SurfaceSupport {
            adapter: Self::adapter_index(physical_device),
            queue_family_index,
        });
        match self.surface_query_error {
            Some(result) => Err(result),
            None => Ok(self.adapter(physical_device).presentable),
        }
    }

    fn destroy_surface(&self, _instance: vk::Instance, _surface: vk::SurfaceKHR) {
        self.record(Call::DestroySurface);
    }
}

/// Window stand-in: stays open for `open_polls` polls.
pub struct FakePlatform {
    pub extensions: Vec<String>,
    pub fail_surface: bool,
    pub open_polls: usize,
    pub polls: usize,
    pub surfaces_created: usize,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            extensions: vec!["VK_KHR_surface".to_owned(), "VK_KHR_xcb_surface".to_owned()],
            fail_surface: false,
            open_polls: 0,
            polls: 0,
            surfaces_created: 0,
        }
    }
}

impl ExtensionRequirementsProvider for FakePlatform {
    fn required_presentation_extensions(&self) -> Vec<String> {
        self.extensions.clone()
    }
}

impl PresentationPlatform for FakePlatform {
    fn create_surface(
        &mut self,
        instance: vk::Instance,
    ) -> Result<vk::SurfaceKHR, SurfaceCreationError> {
        assert_eq!(instance.as_raw(), INSTANCE_HANDLE);
        if self.fail_surface {
            return Err(SurfaceCreationError::Rejected(
                vk::Result::ERROR_NATIVE_WINDOW_IN_USE_KHR,
            ));
        }
        self.surfaces_created += 1;
        Ok(vk::SurfaceKHR::from_raw(SURFACE_HANDLE))
    }

    fn poll_and_check_open(&mut self) -> bool {
        self.polls += 1;
        self.polls <= self.open_polls
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub messages: RefCell<Vec<(Severity, Category, String)>>,
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, severity: Severity, category: Category, message: &str) {
        self.messages
            .borrow_mut()
            .push((severity, category, message.to_owned()));
    }
}

pub fn config(enable_diagnostics: bool) -> StartupConfig {
    StartupConfig::from_build().with_diagnostics(enable_diagnostics)
}

pub fn create_instance(
    driver: &Rc<FakeDriver>,
    config: &StartupConfig,
) -> Rc<Instance<FakeDriver>> {
    create_instance_with_sink(driver, config, Rc::new(RecordingSink::default()))
}

pub fn create_instance_with_sink(
    driver: &Rc<FakeDriver>,
    config: &StartupConfig,
    sink: Rc<dyn DiagnosticSink>,
) -> Rc<Instance<FakeDriver>> {
    let instance = Instance::new(driver.clone(), &[], &FakePlatform::new(), config, sink)
        .expect("fake instance creation succeeds");
    Rc::new(instance)
}
