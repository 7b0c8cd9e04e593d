use parking_lot::{Mutex, MutexGuard};

/// Plain mutual exclusion without payload.
///
/// Guards sections that call into the next layer, where the protected state lives below us.
/// Dropping the [`LockGuard`] releases the lock. Not reentrant.
#[derive(Default)]
pub struct Lock {
    inner: Mutex<()>,
}

impl Lock {
    pub const fn new() -> Self {
        Self { inner: Mutex::new(()) }
    }

    /// Blocks until the lock is acquired.
    pub fn lock(&self) -> LockGuard<'_> {
        LockGuard { _guard: self.inner.lock() }
    }
}

/// Held lock; released on drop.
#[must_use]
pub struct LockGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}
