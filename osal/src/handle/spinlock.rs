use log::warn;

use super::{Owned, kind::SpinlockKind};
use crate::adapter::Adapter;
use crate::hal::RawHandle;
use crate::status::OsResult;

/// Busy-waiting lock from the backend.
///
/// Safe to take in interrupt context. Never hold one across a blocking call.
pub type Spinlock = Owned<SpinlockKind>;

impl Adapter {
    pub fn spinlock(&self) -> OsResult<Spinlock> {
        Spinlock::create(self, |backend| backend.spinlock_create())
    }
}

impl Spinlock {
    /// Spin until acquired.
    pub fn take(&self) -> OsResult<SpinlockGuard<'_>> {
        let raw = self.raw()?;
        self.backend().spinlock_take(raw)?;
        Ok(SpinlockGuard { lock: self, raw })
    }
}

/// Holds a [`Spinlock`] until dropped.
#[must_use = "the spinlock is released as soon as the guard is dropped"]
pub struct SpinlockGuard<'a> {
    lock: &'a Spinlock,
    raw: RawHandle,
}

impl Drop for SpinlockGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.backend().spinlock_give(self.raw) {
            warn!("spinlock give failed: {}", err);
        }
    }
}
