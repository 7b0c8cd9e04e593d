//! Loader-to-layer creation chain, as laid out by the loader's `vk_layer.h`.
//!
//! During `vkCreateInstance` and `vkCreateDevice` the loader threads a linked list of layer links
//! through the create info `p_next` chain. Each layer takes the head link, which holds the
//! resolvers of the layer below, and advances the list before calling down.
use crate::error;
use crate::error::{Error, Variant};
use ash::vk;
use std::ffi::{c_char, c_void};

/// `VkLayerFunction`
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerFunction(i32);

impl LayerFunction {
    pub const LAYER_LINK_INFO: Self = Self(0);
    pub const LOADER_DATA_CALLBACK: Self = Self(1);
    pub const LOADER_LAYER_CREATE_DEVICE_CALLBACK: Self = Self(2);
    pub const LOADER_FEATURES: Self = Self(3);
}

#[allow(non_camel_case_types)]
pub type PFN_GetPhysicalDeviceProcAddr = unsafe extern "system" fn(vk::Instance, *const c_char) -> vk::PFN_vkVoidFunction;

#[repr(C)]
pub struct LayerInstanceLink {
    pub p_next: *mut LayerInstanceLink,
    pub pfn_next_get_instance_proc_addr: Option<vk::PFN_vkGetInstanceProcAddr>,
    pub pfn_next_get_physical_device_proc_addr: Option<PFN_GetPhysicalDeviceProcAddr>,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union LayerInstancePayload {
    pub p_layer_info: *mut LayerInstanceLink,
    pub pfn_set_instance_loader_data: vk::PFN_vkVoidFunction,
    pub layer_device: [vk::PFN_vkVoidFunction; 2],
    pub loader_features: u32,
}

/// `VkLayerInstanceCreateInfo`, found in the `p_next` chain of `vk::InstanceCreateInfo`.
#[repr(C)]
pub struct LayerInstanceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: LayerFunction,
    pub u: LayerInstancePayload,
}

#[repr(C)]
pub struct LayerDeviceLink {
    pub p_next: *mut LayerDeviceLink,
    pub pfn_next_get_instance_proc_addr: Option<vk::PFN_vkGetInstanceProcAddr>,
    pub pfn_next_get_device_proc_addr: Option<vk::PFN_vkGetDeviceProcAddr>,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union LayerDevicePayload {
    pub p_layer_info: *mut LayerDeviceLink,
    pub pfn_set_device_loader_data: vk::PFN_vkVoidFunction,
}

/// `VkLayerDeviceCreateInfo`, found in the `p_next` chain of `vk::DeviceCreateInfo`.
#[repr(C)]
pub struct LayerDeviceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: LayerFunction,
    pub u: LayerDevicePayload,
}

/// Resolvers of the next layer, taken from an instance creation chain.
#[derive(Clone, Copy)]
pub struct InstanceLink {
    pub get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
}

/// Resolvers of the next layer, taken from a device creation chain.
#[derive(Clone, Copy)]
pub struct DeviceLink {
    pub get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
}

/// Takes our link out of an instance creation chain.
///
/// # Safety
///
/// `create_info` must point to a valid create info whose `p_next` chain consists of valid
/// Vulkan structures.
pub unsafe fn take_instance_link(create_info: *const vk::InstanceCreateInfo<'_>) -> Result<InstanceLink, Error> {
    let mut p_next = unsafe { (*create_info).p_next };

    while !p_next.is_null() {
        let chain_info = p_next as *mut LayerInstanceCreateInfo;

        // SAFETY: Every chained structure starts with `s_type` and `p_next`; `function` and the
        // payload are only read once `s_type` says this is a loader record.
        unsafe {
            if (*chain_info).s_type == vk::StructureType::LOADER_INSTANCE_CREATE_INFO
                && (*chain_info).function == LayerFunction::LAYER_LINK_INFO
            {
                let link = (*chain_info).u.p_layer_info;

                if link.is_null() {
                    break;
                }

                let get_instance_proc_addr = (*link)
                    .pfn_next_get_instance_proc_addr
                    .ok_or_else(|| error!(Variant::NoLayerLink, "instance link without vkGetInstanceProcAddr"))?;

                (*chain_info).u.p_layer_info = (*link).p_next;

                return Ok(InstanceLink { get_instance_proc_addr });
            }

            p_next = (*chain_info).p_next;
        }
    }

    Err(error!(Variant::NoLayerLink, "instance create info carries no layer link"))
}

/// Takes our link out of a device creation chain.
///
/// # Safety
///
/// Same as [`take_instance_link`].
pub unsafe fn take_device_link(create_info: *const vk::DeviceCreateInfo<'_>) -> Result<DeviceLink, Error> {
    let mut p_next = unsafe { (*create_info).p_next };

    while !p_next.is_null() {
        let chain_info = p_next as *mut LayerDeviceCreateInfo;

        // SAFETY: See `take_instance_link`.
        unsafe {
            if (*chain_info).s_type == vk::StructureType::LOADER_DEVICE_CREATE_INFO
                && (*chain_info).function == LayerFunction::LAYER_LINK_INFO
            {
                let link = (*chain_info).u.p_layer_info;

                if link.is_null() {
                    break;
                }

                let get_instance_proc_addr = (*link)
                    .pfn_next_get_instance_proc_addr
                    .ok_or_else(|| error!(Variant::NoLayerLink, "device link without vkGetInstanceProcAddr"))?;
                let get_device_proc_addr = (*link)
                    .pfn_next_get_device_proc_addr
                    .ok_or_else(|| error!(Variant::NoLayerLink, "device link without vkGetDeviceProcAddr"))?;

                (*chain_info).u.p_layer_info = (*link).p_next;

                return Ok(DeviceLink {
                    get_instance_proc_addr,
                    get_device_proc_addr,
                });
            }

            p_next = (*chain_info).p_next;
        }
    }

    Err(error!(Variant::NoLayerLink, "device create info carries no layer link"))
}
