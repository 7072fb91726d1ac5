use common::sync::{IrqControl, IrqSpinLock, RawSpinLock, SpinLock};

use super::BareMetalBackend;
use crate::hal::RawHandle;
use crate::hal::gpio::PinDriver;
use crate::hal::sync::{MutexOps, QueueOps, SemaphoreOps, SpinlockOps};
use crate::hal::timer::TickSource;
use crate::platform::objects::{ByteRing, Counter, HandleTable, Ownership};
use crate::status::{OsError, OsResult};
use crate::timeout::Timeout;

/// Spinlock that keeps interrupts masked from take to give.
struct MaskedSpinlock<I: IrqControl> {
    raw: RawSpinLock,
    saved: SpinLock<Option<I::State>>,
}

impl<I: IrqControl> MaskedSpinlock<I> {
    const fn new() -> Self {
        Self {
            raw: RawSpinLock::new(),
            saved: SpinLock::new(None),
        }
    }

    fn take(&self) {
        let state = I::disable();
        self.raw.lock();
        *self.saved.lock() = Some(state);
    }

    fn give(&self) -> OsResult<()> {
        let state = self.saved.lock().take();
        if !self.raw.unlock() {
            return Err(OsError::Invalid);
        }
        if let Some(state) = state {
            I::restore(state);
        }
        Ok(())
    }
}

pub(super) struct SyncObjects<I: IrqControl> {
    queues: HandleTable<IrqSpinLock<ByteRing, I>, I>,
    semaphores: HandleTable<IrqSpinLock<Counter, I>, I>,
    // No thread identity without a scheduler: any caller may unlock.
    mutexes: HandleTable<IrqSpinLock<Ownership<()>, I>, I>,
    spinlocks: HandleTable<MaskedSpinlock<I>, I>,
}

impl<I: IrqControl> SyncObjects<I> {
    pub(super) const fn new() -> Self {
        Self {
            queues: HandleTable::new(),
            semaphores: HandleTable::new(),
            mutexes: HandleTable::new(),
            spinlocks: HandleTable::new(),
        }
    }
}

impl<I, T, P> QueueOps for BareMetalBackend<I, T, P>
where
    I: IrqControl,
    T: TickSource,
    P: PinDriver,
{
    fn queue_create(&self, capacity: usize, item_size: usize) -> OsResult<RawHandle> {
        let cost = ByteRing::footprint(capacity, item_size)?;
        self.sync.queues.insert_with(&self.heap, cost, || {
            ByteRing::new(capacity, item_size).map(IrqSpinLock::new)
        })
    }

    fn queue_delete(&self, queue: RawHandle) -> OsResult<()> {
        self.sync.queues.remove(&self.heap, queue).map(drop)
    }

    fn queue_send(&self, queue: RawHandle, item: &[u8], timeout: Timeout) -> OsResult<()> {
        let queue = self.sync.queues.get(queue)?;
        queue.lock().check_send(item)?;
        self.block_on(&*queue, timeout, |ring| ring.try_push(item).then_some(()))
    }

    fn queue_receive(&self, queue: RawHandle, item: &mut [u8], timeout: Timeout) -> OsResult<()> {
        let queue = self.sync.queues.get(queue)?;
        queue.lock().check_receive(item)?;
        self.block_on(&*queue, timeout, |ring| ring.try_pop(item).then_some(()))
    }

    fn queue_len(&self, queue: RawHandle) -> OsResult<usize> {
        Ok(self.sync.queues.get(queue)?.lock().len())
    }
}

impl<I, T, P> SemaphoreOps for BareMetalBackend<I, T, P>
where
    I: IrqControl,
    T: TickSource,
    P: PinDriver,
{
    fn semaphore_create(&self, max: u32, initial: u32) -> OsResult<RawHandle> {
        let cost = core::mem::size_of::<IrqSpinLock<Counter, I>>();
        self.sync.semaphores.insert_with(&self.heap, cost, || {
            Counter::new(max, initial).map(IrqSpinLock::new)
        })
    }

    fn semaphore_delete(&self, semaphore: RawHandle) -> OsResult<()> {
        self.sync.semaphores.remove(&self.heap, semaphore).map(drop)
    }

    fn semaphore_take(&self, semaphore: RawHandle, timeout: Timeout) -> OsResult<()> {
        let semaphore = self.sync.semaphores.get(semaphore)?;
        self.block_on(&*semaphore, timeout, |count| count.try_take().then_some(()))
    }

    fn semaphore_give(&self, semaphore: RawHandle) -> OsResult<()> {
        self.sync.semaphores.get(semaphore)?.lock().give()
    }
}

impl<I, T, P> MutexOps for BareMetalBackend<I, T, P>
where
    I: IrqControl,
    T: TickSource,
    P: PinDriver,
{
    fn mutex_create(&self) -> OsResult<RawHandle> {
        let cost = core::mem::size_of::<IrqSpinLock<Ownership<()>, I>>();
        self.sync
            .mutexes
            .insert_with(&self.heap, cost, || Ok(IrqSpinLock::new(Ownership::new())))
    }

    fn mutex_delete(&self, mutex: RawHandle) -> OsResult<()> {
        self.sync.mutexes.remove(&self.heap, mutex).map(drop)
    }

    fn mutex_lock(&self, mutex: RawHandle, timeout: Timeout) -> OsResult<()> {
        let mutex = self.sync.mutexes.get(mutex)?;
        self.block_on(&*mutex, timeout, |owner| owner.try_lock(()).then_some(()))
    }

    fn mutex_unlock(&self, mutex: RawHandle) -> OsResult<()> {
        self.sync.mutexes.get(mutex)?.lock().unlock(())
    }
}

impl<I, T, P> SpinlockOps for BareMetalBackend<I, T, P>
where
    I: IrqControl,
    T: TickSource,
    P: PinDriver,
{
    fn spinlock_create(&self) -> OsResult<RawHandle> {
        let cost = core::mem::size_of::<MaskedSpinlock<I>>();
        self.sync
            .spinlocks
            .insert_with(&self.heap, cost, || Ok(MaskedSpinlock::new()))
    }

    fn spinlock_delete(&self, spinlock: RawHandle) -> OsResult<()> {
        self.sync.spinlocks.remove(&self.heap, spinlock).map(drop)
    }

    fn spinlock_take(&self, spinlock: RawHandle) -> OsResult<()> {
        self.sync.spinlocks.get(spinlock)?.take();
        Ok(())
    }

    fn spinlock_give(&self, spinlock: RawHandle) -> OsResult<()> {
        self.sync.spinlocks.get(spinlock)?.give()
    }
}
