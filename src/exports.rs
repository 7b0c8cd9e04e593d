//! Symbols the loader looks up in the shared library. Everything else is reached through the two
//! `*ProcAddr` resolvers.
#![allow(non_snake_case)]

use crate::layer;
use crate::registry::Registry;
use ash::vk;
use std::ffi::{c_char, CStr};

/// # Safety
///
/// Called by the loader with valid output pointers.
#[no_mangle]
pub unsafe extern "system" fn vkEnumerateInstanceLayerProperties(p_property_count: *mut u32, p_properties: *mut vk::LayerProperties) -> vk::Result {
    let mut properties = [vk::LayerProperties::default()];

    if let Err(e) = layer::describe(&mut properties[0]) {
        return e.vk_result();
    }

    unsafe { layer::enumerate(&properties, p_property_count, p_properties) }
}

/// # Safety
///
/// Called by the loader with valid output pointers.
#[no_mangle]
pub unsafe extern "system" fn vkEnumerateInstanceExtensionProperties(
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    unsafe {
        if layer::is_us(p_layer_name) {
            layer::enumerate::<vk::ExtensionProperties>(&[], p_property_count, p_properties)
        } else {
            vk::Result::ERROR_LAYER_NOT_PRESENT
        }
    }
}

/// # Safety
///
/// Called by the loader with valid output pointers.
#[no_mangle]
pub unsafe extern "system" fn vkEnumerateDeviceLayerProperties(
    _physical_device: vk::PhysicalDevice,
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    unsafe { vkEnumerateInstanceLayerProperties(p_property_count, p_properties) }
}

/// # Safety
///
/// Called by the loader with valid pointers; `physical_device` is null or belongs to an
/// instance created through us.
#[no_mangle]
pub unsafe extern "system" fn vkEnumerateDeviceExtensionProperties(
    physical_device: vk::PhysicalDevice,
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    unsafe { Registry::global().enumerate_device_extension_properties(physical_device, p_layer_name, p_property_count, p_properties) }
}

/// # Safety
///
/// `p_name` must be a valid C string; `instance` is null or created through us.
#[no_mangle]
pub unsafe extern "system" fn vkGetInstanceProcAddr(instance: vk::Instance, p_name: *const c_char) -> vk::PFN_vkVoidFunction {
    unsafe { Registry::global().get_instance_proc_addr(instance, CStr::from_ptr(p_name)) }
}

/// # Safety
///
/// `p_name` must be a valid C string; `device` is null or created through us.
#[no_mangle]
pub unsafe extern "system" fn vkGetDeviceProcAddr(device: vk::Device, p_name: *const c_char) -> vk::PFN_vkVoidFunction {
    unsafe { Registry::global().get_device_proc_addr(device, CStr::from_ptr(p_name)) }
}
