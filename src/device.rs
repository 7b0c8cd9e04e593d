use crate::identity::Identity;
use crate::layer;
use crate::registry::Registry;
use ash::vk;
use ash::vk::Handle;
use std::ffi::CStr;

pub(crate) unsafe extern "system" fn destroy_device(device: vk::Device, p_allocator: *const vk::AllocationCallbacks<'_>) {
    unsafe { Registry::global().destroy_device(device, p_allocator) }
}

pub(crate) unsafe extern "system" fn get_device_queue(device: vk::Device, queue_family_index: u32, queue_index: u32, p_queue: *mut vk::Queue) {
    unsafe { Registry::global().get_device_queue(device, queue_family_index, queue_index, p_queue) }
}

pub(crate) unsafe extern "system" fn get_device_queue2(
    device: vk::Device,
    p_queue_info: *const vk::DeviceQueueInfo2<'_>,
    p_queue: *mut vk::Queue,
) {
    unsafe { Registry::global().get_device_queue2(device, p_queue_info, p_queue) }
}

impl Registry {
    /// Destroys the device below us, then drops its session and all its queue sessions.
    ///
    /// # Safety
    ///
    /// Arguments as passed to `vkDestroyDevice`.
    pub unsafe fn destroy_device(&self, device: vk::Device, p_allocator: *const vk::AllocationCallbacks<'_>) {
        if device.as_raw() == 0 {
            return;
        }

        let key = unsafe { Identity::dispatch_key(device) };
        let session = self.device(key);

        unsafe { (session.dispatch().destroy_device)(device, p_allocator) };

        let queues = self.purge_queues(&session);
        self.remove_device(key);

        log::info!("destroyed device {device:?} with {queues} queue session(s)");
    }

    /// Hands out the physical queue behind a possibly virtual queue index.
    ///
    /// # Safety
    ///
    /// Arguments as passed to `vkGetDeviceQueue`.
    pub unsafe fn get_device_queue(&self, device: vk::Device, queue_family_index: u32, queue_index: u32, p_queue: *mut vk::Queue) {
        let session = self.device(unsafe { Identity::dispatch_key(device) });
        let physical_index = session.physical_queue_index(queue_family_index, queue_index);

        unsafe {
            (session.dispatch().get_device_queue)(device, queue_family_index, physical_index, p_queue);

            let queue = *p_queue;

            if queue.as_raw() != 0 {
                self.queue_or_insert(&session, queue);
            }
        }
    }

    /// # Safety
    ///
    /// Arguments as passed to `vkGetDeviceQueue2`.
    pub unsafe fn get_device_queue2(&self, device: vk::Device, p_queue_info: *const vk::DeviceQueueInfo2<'_>, p_queue: *mut vk::Queue) {
        let session = self.device(unsafe { Identity::dispatch_key(device) });
        let Some(next) = session.dispatch().get_device_queue2 else {
            panic!("vkGetDeviceQueue2 called but not provided by the next layer");
        };

        unsafe {
            let mut queue_info = *p_queue_info;
            queue_info.queue_index = session.physical_queue_index(queue_info.queue_family_index, queue_info.queue_index);

            next(device, &queue_info, p_queue);

            let queue = *p_queue;

            if queue.as_raw() != 0 {
                self.queue_or_insert(&session, queue);
            }
        }
    }

    /// Resolves a device-level entry point for the layer above us.
    ///
    /// # Safety
    ///
    /// `device` must be null or a live device created through us.
    pub unsafe fn get_device_proc_addr(&self, device: vk::Device, name: &CStr) -> vk::PFN_vkVoidFunction {
        let ours = layer::device_entry_point(name);

        if device.as_raw() == 0 {
            return ours;
        }

        let session = self.device(unsafe { Identity::dispatch_key(device) });

        match ours {
            Some(function) if session.dispatch().provides(name) => Some(function),
            Some(_) => None,
            None => unsafe { (session.dispatch().get_device_proc_addr)(device, name.as_ptr()) },
        }
    }
}
