use std::{cell::RefCell, collections::HashMap, ffi::c_char, ptr};

use ash::{
    extensions::{ext::DebugUtils, khr::Surface},
    prelude::VkResult,
    vk::{self, ApplicationInfo, DeviceCreateInfo, DeviceQueueCreateInfo, InstanceCreateInfo},
    Device, Entry, Instance, LoadingError,
};
use tracing::{debug, trace, warn};

use super::{DebugMessengerRequest, DeviceRequest, Driver, InstanceRequest};

const CREATE_DEBUG_MESSENGER_NAME: &std::ffi::CStr = c"vkCreateDebugUtilsMessengerEXT";

/// [`Driver`] backed by the system Vulkan loader through `ash`.
///
/// Keeps the `ash` dispatch tables of every instance and device it created so
/// callers only ever pass plain handles around.
pub struct AshDriver {
    entry: Entry,
    instances: RefCell<HashMap<vk::Instance, Instance>>,
    devices: RefCell<HashMap<vk::Device, Device>>,
}

impl AshDriver {
    /// Loads the Vulkan library installed on this machine.
    pub fn load() -> Result<Self, LoadingError> {
        let entry = unsafe { Entry::load()? };
        Ok(Self::from_entry(entry))
    }

    pub fn from_entry(entry: Entry) -> Self {
        Self {
            entry,
            instances: RefCell::new(HashMap::new()),
            devices: RefCell::new(HashMap::new()),
        }
    }

    fn with_instance<T>(
        &self,
        instance: vk::Instance,
        f: impl FnOnce(&Instance) -> VkResult<T>,
    ) -> VkResult<T> {
        let instances = self.instances.borrow();
        let Some(ash_instance) = instances.get(&instance) else {
            warn!("Instance {:?} was not created by this driver", instance);
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        };
        f(ash_instance)
    }
}

/// Splits an optional output buffer into the pointer and capacity the raw
/// enumeration calls expect.
fn raw_buffer<T>(out: Option<&mut [T]>) -> (*mut T, u32) {
    match out {
        Some(buffer) => (buffer.as_mut_ptr(), buffer.len() as u32),
        None => (ptr::null_mut(), 0),
    }
}

fn name_pointers(names: &[std::ffi::CString]) -> Vec<*const c_char> {
    names.iter().map(|name| name.as_ptr()).collect::<Vec<_>>()
}

impl Driver for AshDriver {
    fn create_instance(&self, request: &InstanceRequest<'_>) -> VkResult<vk::Instance> {
        let app_info = ApplicationInfo::builder()
            .application_name(request.application_name)
            .application_version(request.application_version)
            .engine_name(request.application_name)
            .engine_version(request.application_version)
            .api_version(request.api_version);

        let extension_name_ptrs = name_pointers(request.extensions);
        let layer_name_ptrs = name_pointers(request.layers);

        let create_info = InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_name_ptrs)
            .enabled_layer_names(&layer_name_ptrs);

        let instance = unsafe { self.entry.create_instance(&create_info, None)? };
        let handle = instance.handle();
        self.instances.borrow_mut().insert(handle, instance);
        trace!("Instance created: {:?}", handle);
        Ok(handle)
    }

    fn destroy_instance(&self, instance: vk::Instance) {
        if let Some(instance) = self.instances.borrow_mut().remove(&instance) {
            unsafe { instance.destroy_instance(None) };
            trace!("Instance destroyed");
        }
    }

    fn create_debug_messenger(
        &self,
        instance: vk::Instance,
        request: &DebugMessengerRequest,
    ) -> Option<VkResult<vk::DebugUtilsMessengerEXT>> {
        let entry_point = unsafe {
            self.entry
                .get_instance_proc_addr(instance, CREATE_DEBUG_MESSENGER_NAME.as_ptr())
        };
        if entry_point.is_none() {
            return None;
        }

        Some(self.with_instance(instance, |ash_instance| {
            let debug_utils = DebugUtils::new(&self.entry, ash_instance);
            let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
                .message_severity(request.severities)
                .message_type(request.message_types)
                .pfn_user_callback(request.callback)
                .user_data(request.user_data);
            unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
        }))
    }

    fn destroy_debug_messenger(
        &self,
        instance: vk::Instance,
        messenger: vk::DebugUtilsMessengerEXT,
    ) {
        let _ = self.with_instance(instance, |ash_instance| {
            let debug_utils = DebugUtils::new(&self.entry, ash_instance);
            unsafe { debug_utils.destroy_debug_utils_messenger(messenger, None) };
            Ok(())
        });
    }

    fn enumerate_instance_extensions(
        &self,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> VkResult<u32> {
        let (data, mut count) = raw_buffer(out);
        unsafe {
            (self.entry.fp_v1_0().enumerate_instance_extension_properties)(
                ptr::null(),
                &mut count,
                data,
            )
        }
        .result_with_success(count)
    }

    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
        out: Option<&mut [vk::PhysicalDevice]>,
    ) -> VkResult<u32> {
        self.with_instance(instance, |ash_instance| {
            let (data, mut count) = raw_buffer(out);
            unsafe {
                (ash_instance.fp_v1_0().enumerate_physical_devices)(instance, &mut count, data)
            }
            .result_with_success(count)
        })
    }

    fn physical_device_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<vk::PhysicalDeviceProperties> {
        self.with_instance(instance, |ash_instance| {
            Ok(unsafe { ash_instance.get_physical_device_properties(physical_device) })
        })
    }

    fn physical_device_features(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<vk::PhysicalDeviceFeatures> {
        self.with_instance(instance, |ash_instance| {
            Ok(unsafe { ash_instance.get_physical_device_features(physical_device) })
        })
    }

    fn queue_family_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        out: Option<&mut [vk::QueueFamilyProperties]>,
    ) -> VkResult<u32> {
        self.with_instance(instance, |ash_instance| {
            let (data, mut count) = raw_buffer(out);
            unsafe {
                (ash_instance
                    .fp_v1_0()
                    .get_physical_device_queue_family_properties)(
                    physical_device,
                    &mut count,
                    data,
                )
            };
            Ok(count)
        })
    }

    fn create_device(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        request: &DeviceRequest<'_>,
    ) -> VkResult<vk::Device> {
        let device = self.with_instance(instance, |ash_instance| {
            let queue_create_infos = [DeviceQueueCreateInfo::builder()
                .queue_family_index(request.queue_family_index)
                .queue_priorities(request.queue_priorities)
                .build()];
            let extension_name_ptrs = name_pointers(request.extensions);
            let layer_name_ptrs = name_pointers(request.layers);

            // device layers are deprecated but still honored by older loaders
            #[allow(deprecated)]
            let create_info = DeviceCreateInfo::builder()
                .queue_create_infos(&queue_create_infos)
                .enabled_features(request.features)
                .enabled_layer_names(&layer_name_ptrs)
                .enabled_extension_names(&extension_name_ptrs);

            unsafe { ash_instance.create_device(physical_device, &create_info, None) }
        })?;

        let handle = device.handle();
        self.devices.borrow_mut().insert(handle, device);
        debug!("Logical device created: {:?}", handle);
        Ok(handle)
    }

    fn device_queue(
        &self,
        device: vk::Device,
        queue_family_index: u32,
        queue_index: u32,
    ) -> vk::Queue {
        self.devices
            .borrow()
            .get(&device)
            .map(|device| unsafe { device.get_device_queue(queue_family_index, queue_index) })
            .unwrap_or_default()
    }

    fn destroy_device(&self, device: vk::Device) {
        if let Some(device) = self.devices.borrow_mut().remove(&device) {
            unsafe { device.destroy_device(None) };
            debug!("Logical device destroyed");
        }
    }

    fn surface_support(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        self.with_instance(instance, |ash_instance| {
            let surface_fn = Surface::new(&self.entry, ash_instance);
            unsafe {
                surface_fn.get_physical_device_surface_support(
                    physical_device,
                    queue_family_index,
                    surface,
                )
            }
        })
    }

    fn destroy_surface(&self, instance: vk::Instance, surface: vk::SurfaceKHR) {
        let _ = self.with_instance(instance, |ash_instance| {
            let surface_fn = Surface::new(&self.entry, ash_instance);
            unsafe { surface_fn.destroy_surface(surface, None) };
            trace!("Surface destroyed");
            Ok(())
        });
    }
}
