use crate::chain;
use crate::dispatch::{self, DeviceDispatch, InstanceDispatch};
use crate::error;
use crate::error::{status, Error, Variant};
use crate::identity::Identity;
use crate::layer;
use crate::registry::Registry;
use crate::session::{DeviceSession, InstanceSession};
use crate::virtualization;
use ash::vk;
use ash::vk::Handle;
use std::ffi::{c_char, CStr};
use std::slice;

pub(crate) unsafe extern "system" fn create_instance(
    p_create_info: *const vk::InstanceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    crate::init_logging();

    status(unsafe { Registry::global().create_instance(p_create_info, p_allocator, p_instance) })
}

pub(crate) unsafe extern "system" fn destroy_instance(instance: vk::Instance, p_allocator: *const vk::AllocationCallbacks<'_>) {
    unsafe { Registry::global().destroy_instance(instance, p_allocator) }
}

pub(crate) unsafe extern "system" fn get_physical_device_queue_family_properties(
    physical_device: vk::PhysicalDevice,
    p_queue_family_property_count: *mut u32,
    p_queue_family_properties: *mut vk::QueueFamilyProperties,
) {
    unsafe {
        Registry::global().get_physical_device_queue_family_properties(
            physical_device,
            p_queue_family_property_count,
            p_queue_family_properties,
        )
    }
}

pub(crate) unsafe extern "system" fn get_physical_device_queue_family_properties2(
    physical_device: vk::PhysicalDevice,
    p_queue_family_property_count: *mut u32,
    p_queue_family_properties: *mut vk::QueueFamilyProperties2<'_>,
) {
    unsafe {
        Registry::global().get_physical_device_queue_family_properties2(
            physical_device,
            p_queue_family_property_count,
            p_queue_family_properties,
        )
    }
}

pub(crate) unsafe extern "system" fn create_device(
    physical_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_device: *mut vk::Device,
) -> vk::Result {
    status(unsafe { Registry::global().create_device(physical_device, p_create_info, p_allocator, p_device) })
}

impl Registry {
    /// Creates the instance below us and registers its session.
    ///
    /// # Safety
    ///
    /// Arguments as passed by the loader to `vkCreateInstance`.
    pub unsafe fn create_instance(
        &self,
        p_create_info: *const vk::InstanceCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_instance: *mut vk::Instance,
    ) -> Result<(), Error> {
        unsafe {
            let link = chain::take_instance_link(p_create_info)?;
            let get_instance_proc_addr = link.get_instance_proc_addr;
            let next_create_instance: vk::PFN_vkCreateInstance =
                dispatch::cast(get_instance_proc_addr(vk::Instance::null(), c"vkCreateInstance".as_ptr()))
                    .ok_or_else(|| error!(Variant::EntryPointNotFound, "next layer does not provide vkCreateInstance"))?;

            next_create_instance(p_create_info, p_allocator, p_instance).result()?;

            let native_instance = *p_instance;
            let dispatch = match InstanceDispatch::load(native_instance, get_instance_proc_addr) {
                Ok(dispatch) => dispatch,
                Err(e) => {
                    let destroy: Option<vk::PFN_vkDestroyInstance> =
                        dispatch::cast(get_instance_proc_addr(native_instance, c"vkDestroyInstance".as_ptr()));

                    if let Some(destroy) = destroy {
                        destroy(native_instance, p_allocator);
                    }

                    return Err(e);
                }
            };

            self.add_instance(Identity::dispatch_key(native_instance), InstanceSession::new(native_instance, dispatch));
            log::info!("created instance {native_instance:?}");

            Ok(())
        }
    }

    /// # Safety
    ///
    /// Arguments as passed by the loader to `vkDestroyInstance`.
    pub unsafe fn destroy_instance(&self, instance: vk::Instance, p_allocator: *const vk::AllocationCallbacks<'_>) {
        if instance.as_raw() == 0 {
            return;
        }

        unsafe {
            let key = Identity::dispatch_key(instance);
            let session = self.instance(key);

            (session.dispatch().destroy_instance)(instance, p_allocator);
            self.remove_instance(key);
        }

        log::info!("destroyed instance {instance:?}");
    }

    /// Reports the physical queue families, each with at least the minimum queue count.
    ///
    /// # Safety
    ///
    /// Arguments as passed to `vkGetPhysicalDeviceQueueFamilyProperties`.
    pub unsafe fn get_physical_device_queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        p_queue_family_property_count: *mut u32,
        p_queue_family_properties: *mut vk::QueueFamilyProperties,
    ) {
        unsafe {
            let session = self.instance(Identity::dispatch_key(physical_device));

            (session.dispatch().get_physical_device_queue_family_properties)(
                physical_device,
                p_queue_family_property_count,
                p_queue_family_properties,
            );

            if !p_queue_family_properties.is_null() {
                let families = slice::from_raw_parts_mut(p_queue_family_properties, *p_queue_family_property_count as usize);
                virtualization::inflate_queue_families(families);
            }
        }
    }

    /// # Safety
    ///
    /// Arguments as passed to `vkGetPhysicalDeviceQueueFamilyProperties2`.
    pub unsafe fn get_physical_device_queue_family_properties2(
        &self,
        physical_device: vk::PhysicalDevice,
        p_queue_family_property_count: *mut u32,
        p_queue_family_properties: *mut vk::QueueFamilyProperties2<'_>,
    ) {
        unsafe {
            let session = self.instance(Identity::dispatch_key(physical_device));
            let Some(next) = session.dispatch().get_physical_device_queue_family_properties2 else {
                panic!("vkGetPhysicalDeviceQueueFamilyProperties2 called but not provided by the next layer");
            };

            next(physical_device, p_queue_family_property_count, p_queue_family_properties);

            if !p_queue_family_properties.is_null() {
                let families = slice::from_raw_parts_mut(p_queue_family_properties, *p_queue_family_property_count as usize);
                virtualization::inflate_queue_families2(families);
            }
        }
    }

    /// Creates the device below us with queue requests clamped to physical counts.
    ///
    /// # Safety
    ///
    /// Arguments as passed by the loader to `vkCreateDevice`.
    pub unsafe fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        p_create_info: *const vk::DeviceCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_device: *mut vk::Device,
    ) -> Result<(), Error> {
        unsafe {
            let link = chain::take_device_link(p_create_info)?;
            let instance = self.instance(Identity::dispatch_key(physical_device));
            let next_create_device: vk::PFN_vkCreateDevice =
                dispatch::cast((link.get_instance_proc_addr)(instance.native(), c"vkCreateDevice".as_ptr()))
                    .ok_or_else(|| error!(Variant::EntryPointNotFound, "next layer does not provide vkCreateDevice"))?;

            let queue_family_counts = instance.queue_family_counts(physical_device);
            let create_info = &*p_create_info;
            let requests = if create_info.p_queue_create_infos.is_null() {
                &[][..]
            } else {
                slice::from_raw_parts(create_info.p_queue_create_infos, create_info.queue_create_info_count as usize)
            };

            let clamped = virtualization::clamp_queue_requests(requests, &queue_family_counts);
            let mut forwarded = *create_info;
            forwarded.p_queue_create_infos = clamped.as_ptr();

            next_create_device(physical_device, &forwarded, p_allocator, p_device).result()?;

            let native_device = *p_device;
            let dispatch = match DeviceDispatch::load(native_device, link.get_device_proc_addr) {
                Ok(dispatch) => dispatch,
                Err(e) => {
                    let destroy: Option<vk::PFN_vkDestroyDevice> =
                        dispatch::cast((link.get_device_proc_addr)(native_device, c"vkDestroyDevice".as_ptr()));

                    if let Some(destroy) = destroy {
                        destroy(native_device, p_allocator);
                    }

                    return Err(e);
                }
            };

            self.add_device(
                Identity::dispatch_key(native_device),
                DeviceSession::new(native_device, instance, dispatch, queue_family_counts),
            );
            log::info!("created device {native_device:?} on {physical_device:?}");

            Ok(())
        }
    }

    /// Resolves an instance-level entry point for the layer above us.
    ///
    /// Device entry points the next layer may lack are only handed out when it resolves them too.
    ///
    /// # Safety
    ///
    /// `instance` must be null or a live instance created through us.
    pub unsafe fn get_instance_proc_addr(&self, instance: vk::Instance, name: &CStr) -> vk::PFN_vkVoidFunction {
        if let Some(function) = layer::instance_entry_point(name) {
            return Some(function);
        }

        let ours = layer::device_entry_point(name);

        if instance.as_raw() == 0 {
            return ours.filter(|_| !layer::is_optional(name));
        }

        let next = || unsafe {
            let session = self.instance(Identity::dispatch_key(instance));
            (session.dispatch().get_instance_proc_addr)(instance, name.as_ptr())
        };

        match ours {
            Some(function) if !layer::is_optional(name) => Some(function),
            Some(function) => next().map(|_| function),
            None => next(),
        }
    }

    /// Device extensions: none of our own, everything else comes from below.
    ///
    /// # Safety
    ///
    /// Arguments as passed to `vkEnumerateDeviceExtensionProperties`.
    pub unsafe fn enumerate_device_extension_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        p_layer_name: *const c_char,
        p_property_count: *mut u32,
        p_properties: *mut vk::ExtensionProperties,
    ) -> vk::Result {
        unsafe {
            if layer::is_us(p_layer_name) {
                return layer::enumerate::<vk::ExtensionProperties>(&[], p_property_count, p_properties);
            }

            if physical_device.as_raw() == 0 {
                return vk::Result::ERROR_LAYER_NOT_PRESENT;
            }

            let session = self.instance(Identity::dispatch_key(physical_device));
            (session.dispatch().enumerate_device_extension_properties)(physical_device, p_layer_name, p_property_count, p_properties)
        }
    }
}
