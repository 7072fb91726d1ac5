//! Thread interface.

use alloc::boxed::Box;
use alloc::string::String;
use core::time::Duration;

use super::RawHandle;
use crate::status::OsResult;

/// Default stack for driver threads, in bytes.
pub const DEFAULT_STACK_SIZE: usize = 4096;
/// Smallest stack a backend accepts.
pub const MIN_STACK_SIZE: usize = 512;
/// Default priority for driver threads.
pub const DEFAULT_PRIORITY: u8 = 5;

/// Body of a thread.
pub type ThreadEntry = Box<dyn FnOnce() + Send + 'static>;

/// Creation parameters for a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSpec {
    /// Thread name, for debugging.
    pub name: String,
    /// Stack size in bytes.
    pub stack_size: usize,
    /// Scheduler priority; higher runs first on backends that honor it.
    pub priority: u8,
}

impl ThreadSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stack_size: DEFAULT_STACK_SIZE,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }
}

/// Thread entries of the dispatch table.
pub trait ThreadOps {
    /// Create and start a thread running `entry`.
    ///
    /// # Errors
    ///
    /// - `Invalid`: stack smaller than [`MIN_STACK_SIZE`]
    /// - `NoMemory`: no room for the stack or control block
    fn thread_create(&self, spec: &ThreadSpec, entry: ThreadEntry) -> OsResult<RawHandle>;

    /// Delete a thread and release its control block.
    fn thread_delete(&self, thread: RawHandle) -> OsResult<()>;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);

    /// Time since the backend started, on a monotonic clock.
    fn uptime(&self) -> Duration;
}
