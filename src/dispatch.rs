use crate::error;
use crate::error::{Error, Variant};
use ash::vk;
use std::ffi::CStr;
use std::mem;

/// Reinterprets a resolved entry point as its concrete signature.
///
/// # Safety
///
/// `T` must be the `PFN_*` type matching the name `function` was resolved from.
pub(crate) unsafe fn cast<T: Copy>(function: vk::PFN_vkVoidFunction) -> Option<T> {
    debug_assert_eq!(mem::size_of::<T>(), mem::size_of::<unsafe extern "system" fn()>());

    function.map(|f| unsafe { mem::transmute_copy::<unsafe extern "system" fn(), T>(&f) })
}

fn required<T>(function: Option<T>, name: &CStr) -> Result<T, Error> {
    function.ok_or_else(|| error!(Variant::EntryPointNotFound, "next layer does not provide {name:?}"))
}

/// Instance-scoped entry points of the layer below us.
#[derive(Clone, Copy)]
pub struct InstanceDispatch {
    pub get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub destroy_instance: vk::PFN_vkDestroyInstance,
    pub get_physical_device_queue_family_properties: vk::PFN_vkGetPhysicalDeviceQueueFamilyProperties,
    pub get_physical_device_queue_family_properties2: Option<vk::PFN_vkGetPhysicalDeviceQueueFamilyProperties2>,
    pub enumerate_device_extension_properties: vk::PFN_vkEnumerateDeviceExtensionProperties,
}

impl InstanceDispatch {
    /// Resolves the forwarding table through the next layer's `vkGetInstanceProcAddr`.
    ///
    /// # Safety
    ///
    /// `instance` must have been created by the layer `get_instance_proc_addr` belongs to.
    pub unsafe fn load(instance: vk::Instance, get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr) -> Result<Self, Error> {
        let resolve = |name: &CStr| unsafe { get_instance_proc_addr(instance, name.as_ptr()) };

        unsafe {
            Ok(Self {
                get_instance_proc_addr,
                destroy_instance: required(cast(resolve(c"vkDestroyInstance")), c"vkDestroyInstance")?,
                get_physical_device_queue_family_properties: required(
                    cast(resolve(c"vkGetPhysicalDeviceQueueFamilyProperties")),
                    c"vkGetPhysicalDeviceQueueFamilyProperties",
                )?,
                get_physical_device_queue_family_properties2: cast(resolve(c"vkGetPhysicalDeviceQueueFamilyProperties2"))
                    .or_else(|| cast(resolve(c"vkGetPhysicalDeviceQueueFamilyProperties2KHR"))),
                enumerate_device_extension_properties: required(
                    cast(resolve(c"vkEnumerateDeviceExtensionProperties")),
                    c"vkEnumerateDeviceExtensionProperties",
                )?,
            })
        }
    }
}

/// Device- and queue-scoped entry points of the layer below us.
#[derive(Clone, Copy)]
pub struct DeviceDispatch {
    pub get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
    pub destroy_device: vk::PFN_vkDestroyDevice,
    pub get_device_queue: vk::PFN_vkGetDeviceQueue,
    pub get_device_queue2: Option<vk::PFN_vkGetDeviceQueue2>,
    pub queue_submit: vk::PFN_vkQueueSubmit,
    pub queue_submit2: Option<vk::PFN_vkQueueSubmit2>,
    pub queue_wait_idle: vk::PFN_vkQueueWaitIdle,
    pub queue_bind_sparse: vk::PFN_vkQueueBindSparse,
    pub queue_present_khr: Option<vk::PFN_vkQueuePresentKHR>,
}

impl DeviceDispatch {
    /// Resolves the forwarding table through the next layer's `vkGetDeviceProcAddr`.
    ///
    /// # Safety
    ///
    /// `device` must have been created by the layer `get_device_proc_addr` belongs to.
    pub unsafe fn load(device: vk::Device, get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr) -> Result<Self, Error> {
        let resolve = |name: &CStr| unsafe { get_device_proc_addr(device, name.as_ptr()) };

        unsafe {
            Ok(Self {
                get_device_proc_addr,
                destroy_device: required(cast(resolve(c"vkDestroyDevice")), c"vkDestroyDevice")?,
                get_device_queue: required(cast(resolve(c"vkGetDeviceQueue")), c"vkGetDeviceQueue")?,
                get_device_queue2: cast(resolve(c"vkGetDeviceQueue2")),
                queue_submit: required(cast(resolve(c"vkQueueSubmit")), c"vkQueueSubmit")?,
                queue_submit2: cast(resolve(c"vkQueueSubmit2")).or_else(|| cast(resolve(c"vkQueueSubmit2KHR"))),
                queue_wait_idle: required(cast(resolve(c"vkQueueWaitIdle")), c"vkQueueWaitIdle")?,
                queue_bind_sparse: required(cast(resolve(c"vkQueueBindSparse")), c"vkQueueBindSparse")?,
                queue_present_khr: cast(resolve(c"vkQueuePresentKHR")),
            })
        }
    }

    /// Whether an entry point we intercept by `name` exists below us.
    ///
    /// Optional entry points are only handed out when the next layer has them, so the caller sees
    /// the same availability it would without us.
    pub fn provides(&self, name: &CStr) -> bool {
        match name.to_bytes() {
            b"vkGetDeviceQueue2" => self.get_device_queue2.is_some(),
            b"vkQueueSubmit2" | b"vkQueueSubmit2KHR" => self.queue_submit2.is_some(),
            b"vkQueuePresentKHR" => self.queue_present_khr.is_some(),
            _ => true,
        }
    }
}
