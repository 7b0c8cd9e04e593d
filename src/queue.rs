use crate::identity::Identity;
use crate::registry::Registry;
use crate::session::QueueSession;
use ash::vk;
use std::sync::Arc;

pub(crate) unsafe extern "system" fn queue_submit(
    queue: vk::Queue,
    submit_count: u32,
    p_submits: *const vk::SubmitInfo<'_>,
    fence: vk::Fence,
) -> vk::Result {
    unsafe { Registry::global().queue_submit(queue, submit_count, p_submits, fence) }
}

pub(crate) unsafe extern "system" fn queue_submit2(
    queue: vk::Queue,
    submit_count: u32,
    p_submits: *const vk::SubmitInfo2<'_>,
    fence: vk::Fence,
) -> vk::Result {
    unsafe { Registry::global().queue_submit2(queue, submit_count, p_submits, fence) }
}

pub(crate) unsafe extern "system" fn queue_wait_idle(queue: vk::Queue) -> vk::Result {
    unsafe { Registry::global().queue_wait_idle(queue) }
}

pub(crate) unsafe extern "system" fn queue_bind_sparse(
    queue: vk::Queue,
    bind_info_count: u32,
    p_bind_info: *const vk::BindSparseInfo<'_>,
    fence: vk::Fence,
) -> vk::Result {
    unsafe { Registry::global().queue_bind_sparse(queue, bind_info_count, p_bind_info, fence) }
}

pub(crate) unsafe extern "system" fn queue_present_khr(queue: vk::Queue, p_present_info: *const vk::PresentInfoKHR<'_>) -> vk::Result {
    unsafe { Registry::global().queue_present_khr(queue, p_present_info) }
}

// Every forwarded queue operation runs with the queue session's lock held, so all virtual
// indices aliasing one physical queue take turns.
impl Registry {
    /// Session of `queue`, registering it if the queue was obtained without going through us.
    ///
    /// # Safety
    ///
    /// `queue` must be a live queue of a device created through us.
    pub(crate) unsafe fn queue_session(&self, queue: vk::Queue) -> Arc<QueueSession> {
        if let Some(session) = self.find_queue(queue) {
            return session;
        }

        let device = self.device(unsafe { Identity::dispatch_key(queue) });
        self.queue_or_insert(&device, queue)
    }

    /// # Safety
    ///
    /// Arguments as passed to `vkQueueSubmit`.
    pub unsafe fn queue_submit(&self, queue: vk::Queue, submit_count: u32, p_submits: *const vk::SubmitInfo<'_>, fence: vk::Fence) -> vk::Result {
        let session = unsafe { self.queue_session(queue) };
        let _guard = session.lock();

        unsafe { (session.device().dispatch().queue_submit)(queue, submit_count, p_submits, fence) }
    }

    /// # Safety
    ///
    /// Arguments as passed to `vkQueueSubmit2`.
    pub unsafe fn queue_submit2(&self, queue: vk::Queue, submit_count: u32, p_submits: *const vk::SubmitInfo2<'_>, fence: vk::Fence) -> vk::Result {
        let session = unsafe { self.queue_session(queue) };
        let Some(next) = session.device().dispatch().queue_submit2 else {
            panic!("vkQueueSubmit2 called but not provided by the next layer");
        };
        let _guard = session.lock();

        unsafe { next(queue, submit_count, p_submits, fence) }
    }

    /// # Safety
    ///
    /// Arguments as passed to `vkQueueWaitIdle`.
    pub unsafe fn queue_wait_idle(&self, queue: vk::Queue) -> vk::Result {
        let session = unsafe { self.queue_session(queue) };
        let _guard = session.lock();

        unsafe { (session.device().dispatch().queue_wait_idle)(queue) }
    }

    /// # Safety
    ///
    /// Arguments as passed to `vkQueueBindSparse`.
    pub unsafe fn queue_bind_sparse(
        &self,
        queue: vk::Queue,
        bind_info_count: u32,
        p_bind_info: *const vk::BindSparseInfo<'_>,
        fence: vk::Fence,
    ) -> vk::Result {
        let session = unsafe { self.queue_session(queue) };
        let _guard = session.lock();

        unsafe { (session.device().dispatch().queue_bind_sparse)(queue, bind_info_count, p_bind_info, fence) }
    }

    /// # Safety
    ///
    /// Arguments as passed to `vkQueuePresentKHR`.
    pub unsafe fn queue_present_khr(&self, queue: vk::Queue, p_present_info: *const vk::PresentInfoKHR<'_>) -> vk::Result {
        let session = unsafe { self.queue_session(queue) };
        let Some(next) = session.device().dispatch().queue_present_khr else {
            panic!("vkQueuePresentKHR called but not provided by the next layer");
        };
        let _guard = session.lock();

        unsafe { next(queue, p_present_info) }
    }
}
