use ash::vk::Handle;

/// Opaque key under which a session is registered.
///
/// Two derivations exist. [`Identity::dispatch_key`] reads the loader dispatch pointer stored in
/// the first word of every dispatchable object; children share it with their parent (physical
/// devices with their instance, queues with their device), which is what lets a call on a child
/// find the parent's session. [`Identity::of_handle`] is the handle value itself and is unique
/// per live object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Identity(usize);

impl Identity {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> usize {
        self.0
    }

    /// Returns the dispatch key of a dispatchable handle.
    ///
    /// # Safety
    ///
    /// `handle` must be a live, non-null dispatchable handle created through the loader.
    pub unsafe fn dispatch_key<H: Handle>(handle: H) -> Self {
        let object = handle.as_raw() as usize as *const usize;

        // SAFETY: Loader-created dispatchable objects start with their dispatch table pointer.
        Self(unsafe { *object })
    }

    pub fn of_handle<H: Handle>(handle: H) -> Self {
        Self(handle.as_raw() as usize)
    }
}
