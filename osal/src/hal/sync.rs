//! Inter-thread communication and locking interfaces.
//!
//! Blocking entries take a [`Timeout`]; when it runs out they fail with
//! `WouldBlock` (non-blocking) or `Timeout` (bounded wait).

use super::RawHandle;
use crate::status::OsResult;
use crate::timeout::Timeout;

/// Fixed-item-size message queue.
pub trait QueueOps {
    /// Create a queue holding up to `capacity` items of `item_size` bytes.
    ///
    /// Storage is reserved up front; sending never allocates.
    fn queue_create(&self, capacity: usize, item_size: usize) -> OsResult<RawHandle>;

    fn queue_delete(&self, queue: RawHandle) -> OsResult<()>;

    /// Copy one item into the queue. `item` must be exactly `item_size` bytes.
    fn queue_send(&self, queue: RawHandle, item: &[u8], timeout: Timeout) -> OsResult<()>;

    /// Copy the oldest item into the front of `item`, which must hold at
    /// least `item_size` bytes.
    fn queue_receive(&self, queue: RawHandle, item: &mut [u8], timeout: Timeout) -> OsResult<()>;

    /// Items currently waiting.
    fn queue_len(&self, queue: RawHandle) -> OsResult<usize>;
}

/// Counting semaphore.
pub trait SemaphoreOps {
    /// Create a semaphore with `initial` of `max` tokens available.
    fn semaphore_create(&self, max: u32, initial: u32) -> OsResult<RawHandle>;

    fn semaphore_delete(&self, semaphore: RawHandle) -> OsResult<()>;

    /// Take one token.
    fn semaphore_take(&self, semaphore: RawHandle, timeout: Timeout) -> OsResult<()>;

    /// Return one token. Fails with `Fail` if the count is already at max.
    fn semaphore_give(&self, semaphore: RawHandle) -> OsResult<()>;
}

/// Blocking mutual exclusion lock.
pub trait MutexOps {
    fn mutex_create(&self) -> OsResult<RawHandle>;

    fn mutex_delete(&self, mutex: RawHandle) -> OsResult<()>;

    fn mutex_lock(&self, mutex: RawHandle, timeout: Timeout) -> OsResult<()>;

    /// Release the mutex. Backends that track ownership fail with `Fail` when
    /// the caller is not the holder, and with `Invalid` when it is not held.
    fn mutex_unlock(&self, mutex: RawHandle) -> OsResult<()>;
}

/// Busy-waiting lock for interrupt context and very short sections.
///
/// Never hold a spinlock across a call that can block.
pub trait SpinlockOps {
    fn spinlock_create(&self) -> OsResult<RawHandle>;

    fn spinlock_delete(&self, spinlock: RawHandle) -> OsResult<()>;

    /// Spin until the lock is acquired.
    fn spinlock_take(&self, spinlock: RawHandle) -> OsResult<()>;

    /// Release the lock. Fails with `Invalid` if it was not held.
    fn spinlock_give(&self, spinlock: RawHandle) -> OsResult<()>;
}
