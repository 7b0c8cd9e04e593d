use crate::dispatch::{DeviceDispatch, InstanceDispatch};
use crate::lock::{Lock, LockGuard};
use crate::virtualization;
use ash::vk;
use std::ptr;
use std::sync::Arc;

/// Bookkeeping for one instance created through us.
pub struct InstanceSession {
    native_instance: vk::Instance,
    dispatch: InstanceDispatch,
}

impl InstanceSession {
    pub fn new(native_instance: vk::Instance, dispatch: InstanceDispatch) -> Self {
        Self {
            native_instance,
            dispatch,
        }
    }

    pub fn native(&self) -> vk::Instance {
        self.native_instance
    }

    pub fn dispatch(&self) -> &InstanceDispatch {
        &self.dispatch
    }

    /// Physical queue count of every queue family, as reported by the layer below.
    ///
    /// # Safety
    ///
    /// `physical_device` must belong to this instance.
    pub unsafe fn queue_family_counts(&self, physical_device: vk::PhysicalDevice) -> Vec<u32> {
        let query = self.dispatch.get_physical_device_queue_family_properties;
        let mut count = 0;

        unsafe {
            query(physical_device, &mut count, ptr::null_mut());

            let mut properties = vec![vk::QueueFamilyProperties::default(); count as usize];
            query(physical_device, &mut count, properties.as_mut_ptr());
            properties.truncate(count as usize);

            properties.iter().map(|x| x.queue_count).collect()
        }
    }
}

/// Bookkeeping for one device created through us.
pub struct DeviceSession {
    native_device: vk::Device,
    instance: Arc<InstanceSession>,
    dispatch: DeviceDispatch,
    lock: Lock,
    queue_family_counts: Box<[u32]>,
}

impl DeviceSession {
    pub fn new(native_device: vk::Device, instance: Arc<InstanceSession>, dispatch: DeviceDispatch, queue_family_counts: Vec<u32>) -> Self {
        Self {
            native_device,
            instance,
            dispatch,
            lock: Lock::new(),
            queue_family_counts: queue_family_counts.into_boxed_slice(),
        }
    }

    pub fn native(&self) -> vk::Device {
        self.native_device
    }

    pub fn instance(&self) -> &Arc<InstanceSession> {
        &self.instance
    }

    pub fn dispatch(&self) -> &DeviceDispatch {
        &self.dispatch
    }

    /// Serializes registration of queue sessions for this device.
    pub fn lock(&self) -> LockGuard<'_> {
        self.lock.lock()
    }

    pub fn queue_family_counts(&self) -> &[u32] {
        &self.queue_family_counts
    }

    pub fn physical_queue_index(&self, family: u32, index: u32) -> u32 {
        virtualization::physical_queue_index(&self.queue_family_counts, family, index)
    }
}

/// Bookkeeping for one physical queue, shared by every index aliasing onto it.
pub struct QueueSession {
    native_queue: vk::Queue,
    device: Arc<DeviceSession>,
    lock: Lock,
}

impl QueueSession {
    pub fn new(native_queue: vk::Queue, device: Arc<DeviceSession>) -> Self {
        Self {
            native_queue,
            device,
            lock: Lock::new(),
        }
    }

    pub fn native(&self) -> vk::Queue {
        self.native_queue
    }

    pub fn device(&self) -> &Arc<DeviceSession> {
        &self.device
    }

    /// Serializes work submitted to this queue.
    pub fn lock(&self) -> LockGuard<'_> {
        self.lock.lock()
    }
}
