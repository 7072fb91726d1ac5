use log::warn;

use super::{Owned, kind::MutexKind};
use crate::adapter::Adapter;
use crate::hal::RawHandle;
use crate::status::OsResult;
use crate::timeout::Timeout;

/// Blocking mutex.
pub type Mutex = Owned<MutexKind>;

impl Adapter {
    pub fn mutex(&self) -> OsResult<Mutex> {
        Mutex::create(self, |backend| backend.mutex_create())
    }
}

impl Mutex {
    /// Acquire the mutex, releasing it when the guard drops.
    pub fn lock(&self, timeout: Timeout) -> OsResult<MutexGuard<'_>> {
        let raw = self.raw()?;
        self.backend().mutex_lock(raw, timeout)?;
        Ok(MutexGuard {
            mutex: self,
            raw: Some(raw),
        })
    }
}

/// Holds a [`Mutex`] until dropped or [`unlock`](MutexGuard::unlock)ed.
#[must_use = "the mutex is released as soon as the guard is dropped"]
pub struct MutexGuard<'a> {
    mutex: &'a Mutex,
    raw: Option<RawHandle>,
}

impl MutexGuard<'_> {
    /// Release now, reporting the backend's verdict.
    pub fn unlock(mut self) -> OsResult<()> {
        self.release()
    }

    fn release(&mut self) -> OsResult<()> {
        match self.raw.take() {
            Some(raw) => self.mutex.backend().mutex_unlock(raw),
            None => Ok(()),
        }
    }
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("mutex unlock on drop failed: {}", err);
        }
    }
}
