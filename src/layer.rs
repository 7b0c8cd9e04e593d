use crate::error::Error;
use crate::{device, exports, instance, queue};
use ash::vk;
use std::ffi::{c_char, CStr};
use std::ptr;

pub const LAYER_NAME: &CStr = c"VK_LAYER_QUEUE_MUX";
pub const LAYER_DESCRIPTION: &CStr = c"Guarantees a minimum number of queues per queue family";
pub const IMPLEMENTATION_VERSION: u32 = 1;

/// Writes the description of this layer into `properties`.
pub fn describe(properties: &mut vk::LayerProperties) -> Result<(), Error> {
    *properties = vk::LayerProperties::default()
        .layer_name(LAYER_NAME)?
        .description(LAYER_DESCRIPTION)?
        .spec_version(vk::API_VERSION_1_3)
        .implementation_version(IMPLEMENTATION_VERSION);

    Ok(())
}

/// Whether a layer name passed to an enumeration call names this layer.
///
/// # Safety
///
/// `p_layer_name` must be null or a valid C string.
pub unsafe fn is_us(p_layer_name: *const c_char) -> bool {
    !p_layer_name.is_null() && unsafe { CStr::from_ptr(p_layer_name) } == LAYER_NAME
}

/// Copy-and-truncate contract shared by all `vkEnumerate*` calls.
///
/// # Safety
///
/// `p_count` must be valid; `p_properties`, if not null, must hold `*p_count` elements.
pub unsafe fn enumerate<T: Copy>(available: &[T], p_count: *mut u32, p_properties: *mut T) -> vk::Result {
    unsafe {
        if p_properties.is_null() {
            *p_count = available.len() as u32;
            return vk::Result::SUCCESS;
        }

        let copied = (*p_count as usize).min(available.len());
        ptr::copy_nonoverlapping(available.as_ptr(), p_properties, copied);
        *p_count = copied as u32;

        if copied < available.len() {
            vk::Result::INCOMPLETE
        } else {
            vk::Result::SUCCESS
        }
    }
}

macro_rules! entry_point {
    ($pfn:ty, $function:expr) => {
        // SAFETY: The loader casts the pointer back to `$pfn` based on the name it asked for.
        Some(unsafe { std::mem::transmute::<$pfn, unsafe extern "system" fn()>($function) })
    };
}

/// Our implementation of an instance-scoped entry point, if we intercept `name`.
pub fn instance_entry_point(name: &CStr) -> vk::PFN_vkVoidFunction {
    match name.to_bytes() {
        b"vkEnumerateInstanceLayerProperties" => {
            entry_point!(vk::PFN_vkEnumerateInstanceLayerProperties, exports::vkEnumerateInstanceLayerProperties)
        }
        b"vkEnumerateInstanceExtensionProperties" => entry_point!(
            vk::PFN_vkEnumerateInstanceExtensionProperties,
            exports::vkEnumerateInstanceExtensionProperties
        ),
        b"vkEnumerateDeviceLayerProperties" => {
            entry_point!(vk::PFN_vkEnumerateDeviceLayerProperties, exports::vkEnumerateDeviceLayerProperties)
        }
        b"vkEnumerateDeviceExtensionProperties" => {
            entry_point!(vk::PFN_vkEnumerateDeviceExtensionProperties, exports::vkEnumerateDeviceExtensionProperties)
        }
        b"vkGetInstanceProcAddr" => entry_point!(vk::PFN_vkGetInstanceProcAddr, exports::vkGetInstanceProcAddr),
        b"vkCreateInstance" => entry_point!(vk::PFN_vkCreateInstance, instance::create_instance),
        b"vkDestroyInstance" => entry_point!(vk::PFN_vkDestroyInstance, instance::destroy_instance),
        b"vkGetPhysicalDeviceQueueFamilyProperties" => entry_point!(
            vk::PFN_vkGetPhysicalDeviceQueueFamilyProperties,
            instance::get_physical_device_queue_family_properties
        ),
        b"vkGetPhysicalDeviceQueueFamilyProperties2" | b"vkGetPhysicalDeviceQueueFamilyProperties2KHR" => entry_point!(
            vk::PFN_vkGetPhysicalDeviceQueueFamilyProperties2,
            instance::get_physical_device_queue_family_properties2
        ),
        b"vkCreateDevice" => entry_point!(vk::PFN_vkCreateDevice, instance::create_device),
        _ => None,
    }
}

/// Whether `name` is an intercepted device entry point the next layer may lack.
pub fn is_optional(name: &CStr) -> bool {
    matches!(
        name.to_bytes(),
        b"vkGetDeviceQueue2" | b"vkQueueSubmit2" | b"vkQueueSubmit2KHR" | b"vkQueuePresentKHR"
    )
}

/// Our implementation of a device-scoped entry point, if we intercept `name`.
pub fn device_entry_point(name: &CStr) -> vk::PFN_vkVoidFunction {
    match name.to_bytes() {
        b"vkEnumerateDeviceExtensionProperties" => {
            entry_point!(vk::PFN_vkEnumerateDeviceExtensionProperties, exports::vkEnumerateDeviceExtensionProperties)
        }
        b"vkGetDeviceProcAddr" => entry_point!(vk::PFN_vkGetDeviceProcAddr, exports::vkGetDeviceProcAddr),
        b"vkDestroyDevice" => entry_point!(vk::PFN_vkDestroyDevice, device::destroy_device),
        b"vkGetDeviceQueue" => entry_point!(vk::PFN_vkGetDeviceQueue, device::get_device_queue),
        b"vkGetDeviceQueue2" => entry_point!(vk::PFN_vkGetDeviceQueue2, device::get_device_queue2),
        b"vkQueueSubmit" => entry_point!(vk::PFN_vkQueueSubmit, queue::queue_submit),
        b"vkQueueSubmit2" | b"vkQueueSubmit2KHR" => entry_point!(vk::PFN_vkQueueSubmit2, queue::queue_submit2),
        b"vkQueueWaitIdle" => entry_point!(vk::PFN_vkQueueWaitIdle, queue::queue_wait_idle),
        b"vkQueueBindSparse" => entry_point!(vk::PFN_vkQueueBindSparse, queue::queue_bind_sparse),
        b"vkQueuePresentKHR" => entry_point!(vk::PFN_vkQueuePresentKHR, queue::queue_present_khr),
        _ => None,
    }
}
