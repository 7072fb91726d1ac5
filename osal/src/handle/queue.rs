use super::{Owned, kind::QueueKind};
use crate::adapter::Adapter;
use crate::status::OsResult;
use crate::timeout::Timeout;

/// Fixed-item-size message queue.
pub type Queue = Owned<QueueKind>;

impl Adapter {
    /// Create a queue of `capacity` items, each `item_size` bytes.
    pub fn queue(&self, capacity: usize, item_size: usize) -> OsResult<Queue> {
        Queue::create(self, |backend| backend.queue_create(capacity, item_size))
    }
}

impl Queue {
    pub fn send(&self, item: &[u8], timeout: Timeout) -> OsResult<()> {
        self.backend().queue_send(self.raw()?, item, timeout)
    }

    pub fn receive(&self, item: &mut [u8], timeout: Timeout) -> OsResult<()> {
        self.backend().queue_receive(self.raw()?, item, timeout)
    }

    /// Items waiting to be received.
    pub fn len(&self) -> OsResult<usize> {
        self.backend().queue_len(self.raw()?)
    }

    pub fn is_empty(&self) -> OsResult<bool> {
        Ok(self.len()? == 0)
    }
}
