use std::thread::{self, ThreadId};

use common::sync::RawSpinLock;
use log::trace;

use super::HostedBackend;
use super::wait::Waitable;
use crate::hal::RawHandle;
use crate::hal::sync::{MutexOps, QueueOps, SemaphoreOps, SpinlockOps};
use crate::platform::objects::{ByteRing, Counter, HandleTable, Ownership};
use crate::status::{OsError, OsResult};
use crate::timeout::Timeout;

type Queue = Waitable<ByteRing>;
type Semaphore = Waitable<Counter>;
type Mutex = Waitable<Ownership<ThreadId>>;

pub(super) struct SyncObjects {
    queues: HandleTable<Queue>,
    semaphores: HandleTable<Semaphore>,
    mutexes: HandleTable<Mutex>,
    spinlocks: HandleTable<RawSpinLock>,
}

impl SyncObjects {
    pub(super) const fn new() -> Self {
        Self {
            queues: HandleTable::new(),
            semaphores: HandleTable::new(),
            mutexes: HandleTable::new(),
            spinlocks: HandleTable::new(),
        }
    }
}

impl QueueOps for HostedBackend {
    fn queue_create(&self, capacity: usize, item_size: usize) -> OsResult<RawHandle> {
        let cost = ByteRing::footprint(capacity, item_size)?;
        self.sync.queues.insert_with(&self.heap, cost, || {
            ByteRing::new(capacity, item_size).map(Waitable::new)
        })
    }

    fn queue_delete(&self, queue: RawHandle) -> OsResult<()> {
        self.sync.queues.remove(&self.heap, queue).map(drop)
    }

    fn queue_send(&self, queue: RawHandle, item: &[u8], timeout: Timeout) -> OsResult<()> {
        let queue = self.sync.queues.get(queue)?;
        queue.lock().check_send(item)?;
        queue.wait_for(timeout, |ring| ring.try_push(item).then_some(()))
    }

    fn queue_receive(&self, queue: RawHandle, item: &mut [u8], timeout: Timeout) -> OsResult<()> {
        let queue = self.sync.queues.get(queue)?;
        queue.lock().check_receive(item)?;
        queue.wait_for(timeout, |ring| ring.try_pop(item).then_some(()))
    }

    fn queue_len(&self, queue: RawHandle) -> OsResult<usize> {
        Ok(self.sync.queues.get(queue)?.lock().len())
    }
}

impl SemaphoreOps for HostedBackend {
    fn semaphore_create(&self, max: u32, initial: u32) -> OsResult<RawHandle> {
        let cost = core::mem::size_of::<Semaphore>();
        self.sync.semaphores.insert_with(&self.heap, cost, || {
            Counter::new(max, initial).map(Waitable::new)
        })
    }

    fn semaphore_delete(&self, semaphore: RawHandle) -> OsResult<()> {
        self.sync.semaphores.remove(&self.heap, semaphore).map(drop)
    }

    fn semaphore_take(&self, semaphore: RawHandle, timeout: Timeout) -> OsResult<()> {
        let semaphore = self.sync.semaphores.get(semaphore)?;
        semaphore.wait_for(timeout, |count| count.try_take().then_some(()))
    }

    fn semaphore_give(&self, semaphore: RawHandle) -> OsResult<()> {
        self.sync.semaphores.get(semaphore)?.update(Counter::give)
    }
}

impl MutexOps for HostedBackend {
    fn mutex_create(&self) -> OsResult<RawHandle> {
        let cost = core::mem::size_of::<Mutex>();
        self.sync
            .mutexes
            .insert_with(&self.heap, cost, || Ok(Waitable::new(Ownership::new())))
    }

    fn mutex_delete(&self, mutex: RawHandle) -> OsResult<()> {
        self.sync.mutexes.remove(&self.heap, mutex).map(drop)
    }

    fn mutex_lock(&self, mutex: RawHandle, timeout: Timeout) -> OsResult<()> {
        let me = thread::current().id();
        trace!("hosted: {:?} locking {:?}", me, mutex);
        let mutex = self.sync.mutexes.get(mutex)?;
        mutex.wait_for(timeout, |owner| owner.try_lock(me).then_some(()))
    }

    fn mutex_unlock(&self, mutex: RawHandle) -> OsResult<()> {
        let me = thread::current().id();
        self.sync.mutexes.get(mutex)?.update(|owner| owner.unlock(me))
    }
}

impl SpinlockOps for HostedBackend {
    fn spinlock_create(&self) -> OsResult<RawHandle> {
        let cost = core::mem::size_of::<RawSpinLock>();
        self.sync
            .spinlocks
            .insert_with(&self.heap, cost, || Ok(RawSpinLock::new()))
    }

    fn spinlock_delete(&self, spinlock: RawHandle) -> OsResult<()> {
        self.sync.spinlocks.remove(&self.heap, spinlock).map(drop)
    }

    fn spinlock_take(&self, spinlock: RawHandle) -> OsResult<()> {
        self.sync.spinlocks.get(spinlock)?.lock();
        Ok(())
    }

    fn spinlock_give(&self, spinlock: RawHandle) -> OsResult<()> {
        if self.sync.spinlocks.get(spinlock)?.unlock() {
            Ok(())
        } else {
            Err(OsError::Invalid)
        }
    }
}
