use super::{Owned, kind::SemaphoreKind};
use crate::adapter::Adapter;
use crate::status::OsResult;
use crate::timeout::Timeout;

/// Counting semaphore.
pub type Semaphore = Owned<SemaphoreKind>;

impl Adapter {
    pub fn semaphore(&self, max: u32, initial: u32) -> OsResult<Semaphore> {
        Semaphore::create(self, |backend| backend.semaphore_create(max, initial))
    }

    /// Semaphore with a single token, initially taken.
    pub fn binary_semaphore(&self) -> OsResult<Semaphore> {
        self.semaphore(1, 0)
    }
}

impl Semaphore {
    pub fn take(&self, timeout: Timeout) -> OsResult<()> {
        self.backend().semaphore_take(self.raw()?, timeout)
    }

    pub fn give(&self) -> OsResult<()> {
        self.backend().semaphore_give(self.raw()?)
    }
}
