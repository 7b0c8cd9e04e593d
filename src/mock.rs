//! Driver stand-in for the layer below us.
//!
//! Objects are laid out like loader-managed dispatchable objects: the first word is a dispatch
//! pointer, shared by an instance and its physical device and by a device and its queues.
use crate::chain::{
    LayerDeviceCreateInfo, LayerDeviceLink, LayerDevicePayload, LayerFunction, LayerInstanceCreateInfo, LayerInstanceLink,
    LayerInstancePayload,
};
use crate::error::Error;
use crate::registry::Registry;
use ash::vk;
use ash::vk::Handle;
use std::cell::{Cell, RefCell};
use std::ffi::{c_void, CStr};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub use driver::get_device_proc_addr;

pub const DEVICE_EXTENSION_COUNT: u32 = 1;

/// What the next driver instance will look like.
#[derive(Clone, Default)]
struct Config {
    families: Vec<u32>,
    missing: Vec<&'static CStr>,
}

thread_local! {
    static PENDING: RefCell<Config> = RefCell::new(Config::default());
    static DESTROYED_INSTANCES: Cell<u32> = const { Cell::new(0) };
    static DESTROYED_DEVICES: Cell<u32> = const { Cell::new(0) };
}

#[repr(C)]
struct Dispatchable<T> {
    dispatch: *const u64,
    inner: T,
}

struct Instance {
    _table: Box<u64>,
    physical_device: vk::PhysicalDevice,
}

struct PhysicalDevice {
    config: Config,
}

struct Device {
    _table: Box<u64>,
    missing: Vec<&'static CStr>,
    requested: Vec<(u32, u32)>,
    queues: Vec<Vec<vk::Queue>>,
}

#[derive(Default)]
struct Queue {
    in_flight: AtomicU32,
    overlapped: AtomicBool,
    operations: AtomicU32,
}

fn into_handle<H: Handle, T>(dispatch: *const u64, inner: T) -> H {
    H::from_raw(Box::into_raw(Box::new(Dispatchable { dispatch, inner })) as u64)
}

unsafe fn object<'a, T, H: Handle>(handle: H) -> &'a T {
    unsafe { &(*(handle.as_raw() as usize as *const Dispatchable<T>)).inner }
}

unsafe fn free<T, H: Handle>(handle: H) {
    drop(unsafe { Box::from_raw(handle.as_raw() as usize as *mut Dispatchable<T>) });
}

fn provided(missing: &[&CStr], name: &CStr) -> bool {
    !missing.iter().any(|&x| x == name)
}

/// Entry points resolved by the next layer's `Get*ProcAddr`.
mod driver {
    use super::{free, into_handle, object, provided, Device, Instance, PhysicalDevice, Queue};
    use super::{DESTROYED_DEVICES, DESTROYED_INSTANCES, PENDING};
    use ash::vk;
    use ash::vk::Handle;
    use std::ffi::{c_char, CStr};
    use std::slice;
    use std::sync::atomic::Ordering;
    use std::thread;
    use std::time::Duration;

    unsafe extern "system" fn create_instance(
        _: *const vk::InstanceCreateInfo<'_>,
        _: *const vk::AllocationCallbacks<'_>,
        p_instance: *mut vk::Instance,
    ) -> vk::Result {
        let table = Box::new(0u64);
        let dispatch = &*table as *const u64;
        let config = PENDING.with(|x| x.borrow().clone());
        let physical_device = into_handle(dispatch, PhysicalDevice { config });

        unsafe { *p_instance = into_handle(dispatch, Instance { _table: table, physical_device }) };

        vk::Result::SUCCESS
    }

    unsafe extern "system" fn destroy_instance(instance: vk::Instance, _: *const vk::AllocationCallbacks<'_>) {
        unsafe {
            free::<PhysicalDevice, _>(object::<Instance, _>(instance).physical_device);
            free::<Instance, _>(instance);
        }

        DESTROYED_INSTANCES.with(|x| x.set(x.get() + 1));
    }

    unsafe extern "system" fn enumerate_physical_devices(
        instance: vk::Instance,
        p_count: *mut u32,
        p_devices: *mut vk::PhysicalDevice,
    ) -> vk::Result {
        unsafe {
            let available = [object::<Instance, _>(instance).physical_device];
            crate::layer::enumerate(&available, p_count, p_devices)
        }
    }

    unsafe extern "system" fn get_physical_device_queue_family_properties(
        physical_device: vk::PhysicalDevice,
        p_count: *mut u32,
        p_properties: *mut vk::QueueFamilyProperties,
    ) {
        unsafe {
            let families = &object::<PhysicalDevice, _>(physical_device).config.families;
            let available: Vec<_> = families
                .iter()
                .map(|&queue_count| vk::QueueFamilyProperties {
                    queue_flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
                    queue_count,
                    ..Default::default()
                })
                .collect();

            _ = crate::layer::enumerate(&available, p_count, p_properties);
        }
    }

    unsafe extern "system" fn get_physical_device_queue_family_properties2(
        physical_device: vk::PhysicalDevice,
        p_count: *mut u32,
        p_properties: *mut vk::QueueFamilyProperties2<'_>,
    ) {
        unsafe {
            let families = &object::<PhysicalDevice, _>(physical_device).config.families;

            if p_properties.is_null() {
                *p_count = families.len() as u32;
                return;
            }

            let written = (*p_count as usize).min(families.len());

            for (properties, &queue_count) in slice::from_raw_parts_mut(p_properties, written).iter_mut().zip(families) {
                properties.queue_family_properties.queue_count = queue_count;
            }

            *p_count = written as u32;
        }
    }

    unsafe extern "system" fn enumerate_device_extension_properties(
        _: vk::PhysicalDevice,
        _: *const c_char,
        p_count: *mut u32,
        p_properties: *mut vk::ExtensionProperties,
    ) -> vk::Result {
        let mut properties = [vk::ExtensionProperties::default()];
        properties[0].spec_version = 1;

        unsafe { crate::layer::enumerate(&properties, p_count, p_properties) }
    }

    unsafe extern "system" fn create_device(
        physical_device: vk::PhysicalDevice,
        p_create_info: *const vk::DeviceCreateInfo<'_>,
        _: *const vk::AllocationCallbacks<'_>,
        p_device: *mut vk::Device,
    ) -> vk::Result {
        unsafe {
            let config = &object::<PhysicalDevice, _>(physical_device).config;
            let create_info = &*p_create_info;
            let requests = slice::from_raw_parts(create_info.p_queue_create_infos, create_info.queue_create_info_count as usize);
            let mut requested = Vec::new();

            for request in requests {
                match config.families.get(request.queue_family_index as usize) {
                    Some(&available) if request.queue_count <= available => {}
                    _ => return vk::Result::ERROR_INITIALIZATION_FAILED,
                }

                requested.push((request.queue_family_index, request.queue_count));
            }

            let table = Box::new(0u64);
            let dispatch = &*table as *const u64;
            let mut queues = vec![Vec::new(); config.families.len()];

            for &(family, count) in &requested {
                queues[family as usize] = (0..count).map(|_| into_handle(dispatch, Queue::default())).collect();
            }

            *p_device = into_handle(
                dispatch,
                Device {
                    _table: table,
                    missing: config.missing.clone(),
                    requested,
                    queues,
                },
            );

            vk::Result::SUCCESS
        }
    }

    unsafe extern "system" fn destroy_device(device: vk::Device, _: *const vk::AllocationCallbacks<'_>) {
        unsafe {
            for &queue in object::<Device, _>(device).queues.iter().flatten() {
                free::<Queue, _>(queue);
            }

            free::<Device, _>(device);
        }

        DESTROYED_DEVICES.with(|x| x.set(x.get() + 1));
    }

    pub unsafe extern "system" fn get_device_queue(device: vk::Device, family: u32, index: u32, p_queue: *mut vk::Queue) {
        unsafe {
            let queues = &object::<Device, _>(device).queues;

            *p_queue = queues
                .get(family as usize)
                .and_then(|x| x.get(index as usize))
                .copied()
                .unwrap_or(vk::Queue::null());
        }
    }

    unsafe extern "system" fn get_device_queue2(device: vk::Device, p_queue_info: *const vk::DeviceQueueInfo2<'_>, p_queue: *mut vk::Queue) {
        unsafe {
            let info = &*p_queue_info;
            get_device_queue(device, info.queue_family_index, info.queue_index, p_queue);
        }
    }

    /// Runs one queue operation, noting whether another one was inside the driver at the same time.
    unsafe fn execute(queue: vk::Queue) -> vk::Result {
        let queue = unsafe { object::<Queue, _>(queue) };

        if queue.in_flight.fetch_add(1, Ordering::SeqCst) != 0 {
            queue.overlapped.store(true, Ordering::SeqCst);
        }

        thread::sleep(Duration::from_micros(200));

        queue.operations.fetch_add(1, Ordering::SeqCst);
        queue.in_flight.fetch_sub(1, Ordering::SeqCst);

        vk::Result::SUCCESS
    }

    unsafe extern "system" fn queue_submit(queue: vk::Queue, _: u32, _: *const vk::SubmitInfo<'_>, _: vk::Fence) -> vk::Result {
        unsafe { execute(queue) }
    }

    unsafe extern "system" fn queue_submit2(queue: vk::Queue, _: u32, _: *const vk::SubmitInfo2<'_>, _: vk::Fence) -> vk::Result {
        unsafe { execute(queue) }
    }

    unsafe extern "system" fn queue_wait_idle(queue: vk::Queue) -> vk::Result {
        unsafe { execute(queue) }
    }

    unsafe extern "system" fn queue_bind_sparse(queue: vk::Queue, _: u32, _: *const vk::BindSparseInfo<'_>, _: vk::Fence) -> vk::Result {
        unsafe { execute(queue) }
    }

    unsafe extern "system" fn queue_present_khr(queue: vk::Queue, _: *const vk::PresentInfoKHR<'_>) -> vk::Result {
        unsafe { execute(queue) }
    }

    unsafe extern "system" fn device_wait_idle(_: vk::Device) -> vk::Result {
        vk::Result::SUCCESS
    }

    macro_rules! entry_point {
        ($pfn:ty, $function:expr) => {
            Some(unsafe { std::mem::transmute::<$pfn, unsafe extern "system" fn()>($function) })
        };
    }

    fn instance_entry_point(name: &CStr) -> vk::PFN_vkVoidFunction {
        match name.to_bytes() {
            b"vkCreateInstance" => entry_point!(vk::PFN_vkCreateInstance, create_instance),
            b"vkDestroyInstance" => entry_point!(vk::PFN_vkDestroyInstance, destroy_instance),
            b"vkEnumeratePhysicalDevices" => entry_point!(vk::PFN_vkEnumeratePhysicalDevices, enumerate_physical_devices),
            b"vkGetPhysicalDeviceQueueFamilyProperties" => entry_point!(
                vk::PFN_vkGetPhysicalDeviceQueueFamilyProperties,
                get_physical_device_queue_family_properties
            ),
            b"vkGetPhysicalDeviceQueueFamilyProperties2" => entry_point!(
                vk::PFN_vkGetPhysicalDeviceQueueFamilyProperties2,
                get_physical_device_queue_family_properties2
            ),
            b"vkEnumerateDeviceExtensionProperties" => {
                entry_point!(vk::PFN_vkEnumerateDeviceExtensionProperties, enumerate_device_extension_properties)
            }
            b"vkCreateDevice" => entry_point!(vk::PFN_vkCreateDevice, create_device),
            _ => None,
        }
    }

    fn device_entry_point(name: &CStr) -> vk::PFN_vkVoidFunction {
        match name.to_bytes() {
            b"vkGetDeviceProcAddr" => entry_point!(vk::PFN_vkGetDeviceProcAddr, get_device_proc_addr),
            b"vkDestroyDevice" => entry_point!(vk::PFN_vkDestroyDevice, destroy_device),
            b"vkGetDeviceQueue" => entry_point!(vk::PFN_vkGetDeviceQueue, get_device_queue),
            b"vkGetDeviceQueue2" => entry_point!(vk::PFN_vkGetDeviceQueue2, get_device_queue2),
            b"vkQueueSubmit" => entry_point!(vk::PFN_vkQueueSubmit, queue_submit),
            b"vkQueueSubmit2" => entry_point!(vk::PFN_vkQueueSubmit2, queue_submit2),
            b"vkQueueWaitIdle" => entry_point!(vk::PFN_vkQueueWaitIdle, queue_wait_idle),
            b"vkQueueBindSparse" => entry_point!(vk::PFN_vkQueueBindSparse, queue_bind_sparse),
            b"vkQueuePresentKHR" => entry_point!(vk::PFN_vkQueuePresentKHR, queue_present_khr),
            b"vkDeviceWaitIdle" => entry_point!(vk::PFN_vkDeviceWaitIdle, device_wait_idle),
            _ => None,
        }
    }

    /// Resolves instance and device entry points, like a loader trampoline would.
    pub unsafe extern "system" fn get_instance_proc_addr(instance: vk::Instance, p_name: *const c_char) -> vk::PFN_vkVoidFunction {
        let name = unsafe { CStr::from_ptr(p_name) };

        if instance.as_raw() != 0 {
            let physical_device = unsafe { object::<Instance, _>(instance).physical_device };
            let missing = unsafe { &object::<PhysicalDevice, _>(physical_device).config.missing };

            if !provided(missing, name) {
                return None;
            }
        }

        instance_entry_point(name).or_else(|| device_entry_point(name))
    }

    pub unsafe extern "system" fn get_device_proc_addr(device: vk::Device, p_name: *const c_char) -> vk::PFN_vkVoidFunction {
        let name = unsafe { CStr::from_ptr(p_name) };

        if device.as_raw() != 0 && !provided(unsafe { &object::<Device, _>(device).missing }, name) {
            return None;
        }

        device_entry_point(name)
    }
}

/// Creates an instance through `registry` on top of a driver with the given queue families.
pub fn create_instance(registry: &Registry, families: &[u32]) -> Result<vk::Instance, Error> {
    create_instance_without(registry, families, &[])
}

/// Like [`create_instance`], but the driver and its devices do not resolve `missing`.
pub fn create_instance_without(registry: &Registry, families: &[u32], missing: &[&'static CStr]) -> Result<vk::Instance, Error> {
    let mut link = LayerInstanceLink {
        p_next: ptr::null_mut(),
        pfn_next_get_instance_proc_addr: Some(driver::get_instance_proc_addr),
        pfn_next_get_physical_device_proc_addr: None,
    };
    let mut chain = LayerInstanceCreateInfo {
        s_type: vk::StructureType::LOADER_INSTANCE_CREATE_INFO,
        p_next: ptr::null(),
        function: LayerFunction::LAYER_LINK_INFO,
        u: LayerInstancePayload {
            p_layer_info: ptr::addr_of_mut!(link),
        },
    };
    let mut create_info = vk::InstanceCreateInfo::default();
    create_info.p_next = ptr::addr_of_mut!(chain) as *const c_void;
    let mut instance = vk::Instance::null();

    PENDING.with(|x| {
        *x.borrow_mut() = Config {
            families: families.to_vec(),
            missing: missing.to_vec(),
        }
    });

    unsafe { registry.create_instance(&create_info, ptr::null(), &mut instance)? };

    Ok(instance)
}

pub fn destroy_instance(registry: &Registry, instance: vk::Instance) {
    unsafe { registry.destroy_instance(instance, ptr::null()) }
}

pub fn physical_device(instance: vk::Instance) -> vk::PhysicalDevice {
    unsafe { object::<Instance, _>(instance).physical_device }
}

/// Creates a device through `registry`, asking for `(family, count)` queues.
pub fn create_device(registry: &Registry, instance: vk::Instance, requests: &[(u32, u32)]) -> Result<vk::Device, Error> {
    let priorities = [1.0; 64];
    let queue_create_infos: Vec<_> = requests
        .iter()
        .map(|&(family, count)| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&priorities[..count as usize])
        })
        .collect();

    let mut link = LayerDeviceLink {
        p_next: ptr::null_mut(),
        pfn_next_get_instance_proc_addr: Some(driver::get_instance_proc_addr),
        pfn_next_get_device_proc_addr: Some(driver::get_device_proc_addr),
    };
    let mut chain = LayerDeviceCreateInfo {
        s_type: vk::StructureType::LOADER_DEVICE_CREATE_INFO,
        p_next: ptr::null(),
        function: LayerFunction::LAYER_LINK_INFO,
        u: LayerDevicePayload {
            p_layer_info: ptr::addr_of_mut!(link),
        },
    };
    let mut create_info = vk::DeviceCreateInfo::default().queue_create_infos(&queue_create_infos);
    create_info.p_next = ptr::addr_of_mut!(chain) as *const c_void;

    let mut device = vk::Device::null();

    unsafe { registry.create_device(physical_device(instance), &create_info, ptr::null(), &mut device)? };

    Ok(device)
}

pub fn destroy_device(registry: &Registry, device: vk::Device) {
    unsafe { registry.destroy_device(device, ptr::null()) }
}

/// Instances the driver destroyed on this thread so far.
pub fn destroyed_instances() -> u32 {
    DESTROYED_INSTANCES.with(Cell::get)
}

/// Devices the driver destroyed on this thread so far.
pub fn destroyed_devices() -> u32 {
    DESTROYED_DEVICES.with(Cell::get)
}

/// Retrieves a queue through `registry`.
pub fn get_queue(registry: &Registry, device: vk::Device, family: u32, index: u32) -> vk::Queue {
    let mut queue = vk::Queue::null();

    unsafe { registry.get_device_queue(device, family, index, &mut queue) };

    assert_ne!(queue, vk::Queue::null(), "driver had no queue {family}/{index}");
    queue
}

/// Retrieves a queue straight from the driver.
pub fn driver_queue(device: vk::Device, family: u32, index: u32) -> vk::Queue {
    let mut queue = vk::Queue::null();

    unsafe { driver::get_device_queue(device, family, index, &mut queue) };

    queue
}

/// Queue requests as the driver received them.
pub fn requested_queues(device: vk::Device) -> Vec<(u32, u32)> {
    unsafe { object::<Device, _>(device).requested.clone() }
}

/// Queue operations (submits, waits, binds, presents) the driver executed on `queue`.
pub fn operations(queue: vk::Queue) -> u32 {
    unsafe { object::<Queue, _>(queue).operations.load(Ordering::SeqCst) }
}

/// Whether two operations were ever inside the driver at once.
pub fn overlapped(queue: vk::Queue) -> bool {
    unsafe { object::<Queue, _>(queue).overlapped.load(Ordering::SeqCst) }
}
