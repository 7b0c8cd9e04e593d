use crate::identity::Identity;
use crate::identitymap::IdentityMap;
use crate::session::{DeviceSession, InstanceSession, QueueSession};
use ash::vk;
use parking_lot::RwLock;
use std::sync::{Arc, LazyLock};

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// All sessions of the layer, keyed by identity.
///
/// Instances and devices are registered and removed inside `vkCreate*` / `vkDestroy*`, which the
/// application already serializes against every other use of the same object. Queue sessions
/// appear lazily from any thread and are guarded by the owning device's lock. The table locks
/// only cover the lookup itself and are never held while calling into the next layer. Every
/// queue operation takes a read lock on the queue table to find its session; this is intended.
pub struct Registry {
    instances: RwLock<IdentityMap<Arc<InstanceSession>>>,
    devices: RwLock<IdentityMap<Arc<DeviceSession>>>,
    queues: RwLock<IdentityMap<Arc<QueueSession>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            instances: RwLock::new(IdentityMap::new()),
            devices: RwLock::new(IdentityMap::new()),
            queues: RwLock::new(IdentityMap::new()),
        }
    }

    /// The registry behind the exported entry points.
    pub fn global() -> &'static Registry {
        &REGISTRY
    }

    pub(crate) fn add_instance(&self, key: Identity, session: InstanceSession) -> Arc<InstanceSession> {
        let session = Arc::new(session);
        self.instances.write().add(key, session.clone());
        session
    }

    pub(crate) fn remove_instance(&self, key: Identity) -> Arc<InstanceSession> {
        self.instances.write().remove(key)
    }

    /// # Panics
    ///
    /// If no instance is registered under `key`.
    pub(crate) fn instance(&self, key: Identity) -> Arc<InstanceSession> {
        match self.instances.read().find(key) {
            Some(session) => session.clone(),
            None => panic!("no instance session for {key:?}"),
        }
    }

    pub(crate) fn add_device(&self, key: Identity, session: DeviceSession) -> Arc<DeviceSession> {
        let session = Arc::new(session);
        self.devices.write().add(key, session.clone());
        session
    }

    pub(crate) fn remove_device(&self, key: Identity) -> Arc<DeviceSession> {
        self.devices.write().remove(key)
    }

    /// # Panics
    ///
    /// If no device is registered under `key`.
    pub(crate) fn device(&self, key: Identity) -> Arc<DeviceSession> {
        match self.devices.read().find(key) {
            Some(session) => session.clone(),
            None => panic!("no device session for {key:?}"),
        }
    }

    pub(crate) fn find_queue(&self, queue: vk::Queue) -> Option<Arc<QueueSession>> {
        self.queues.read().find(Identity::of_handle(queue)).cloned()
    }

    /// Returns the session of `queue`, registering it on first sight.
    ///
    /// Registration happens under the device lock, so racing first retrievals of one physical
    /// queue end up with a single session.
    pub(crate) fn queue_or_insert(&self, device: &Arc<DeviceSession>, queue: vk::Queue) -> Arc<QueueSession> {
        if let Some(session) = self.find_queue(queue) {
            return session;
        }

        let _guard = device.lock();

        if let Some(session) = self.find_queue(queue) {
            return session;
        }

        log::debug!("registering queue {queue:?} of device {:?}", device.native());

        let session = Arc::new(QueueSession::new(queue, device.clone()));
        self.queues.write().add(Identity::of_handle(queue), session.clone());
        session
    }

    /// Drops every queue session belonging to `device`, returning how many there were.
    pub(crate) fn purge_queues(&self, device: &Arc<DeviceSession>) -> usize {
        self.queues
            .write()
            .remove_where(|queue| Arc::ptr_eq(queue.device(), device))
            .len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.read().len()
    }

    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    pub fn queue_count(&self) -> usize {
        self.queues.read().len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}
