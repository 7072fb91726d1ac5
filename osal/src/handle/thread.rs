use alloc::boxed::Box;

use super::{Owned, kind::ThreadKind};
use crate::adapter::Adapter;
use crate::hal::thread::ThreadSpec;
use crate::status::OsResult;

/// A thread created through the adapter.
///
/// Destroying the handle deletes the thread's control block. How a thread
/// that is still running reacts depends on the backend.
pub type Thread = Owned<ThreadKind>;

impl Adapter {
    /// Create and start a thread running `entry`.
    pub fn spawn<F>(&self, spec: &ThreadSpec, entry: F) -> OsResult<Thread>
    where
        F: FnOnce() + Send + 'static,
    {
        Thread::create(self, |backend| backend.thread_create(spec, Box::new(entry)))
    }

    /// Block the calling thread.
    pub fn sleep(&self, duration: core::time::Duration) {
        self.backend().sleep(duration);
    }

    pub fn sleep_ms(&self, ms: u64) {
        self.sleep(core::time::Duration::from_millis(ms));
    }

    /// Time since the backend started.
    pub fn uptime(&self) -> core::time::Duration {
        self.backend().uptime()
    }
}
