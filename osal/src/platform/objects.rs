//! Backend-neutral object state.
//!
//! Both backends keep the same bookkeeping for queues, semaphores and
//! mutexes; they differ only in how a caller waits for the state to change
//! (condition variable vs. spinning on a tick source). The state machines
//! here never block.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicUsize, Ordering};

use common::sync::{IrqControl, NoIrq, RwLock};

use crate::hal::RawHandle;
use crate::mem::accounting::HeapAccounting;
use crate::status::{OsError, OsResult};

// ============================================================================
// Handle Table
// ============================================================================

struct Entry<T> {
    object: Arc<T>,
    cost: usize,
}

/// Maps handle tokens to live objects of one kind.
///
/// Tokens are never reused, so a stale handle fails lookup with `Invalid`
/// instead of reaching a newer object. Every object is charged against the
/// backend heap while it lives.
///
/// Interrupts are masked through `I` for as long as the map is locked: an
/// interrupt handler that looks up a handle must never find the lock held by
/// the code it preempted.
pub struct HandleTable<T, I: IrqControl = NoIrq> {
    next: AtomicUsize,
    entries: RwLock<BTreeMap<usize, Entry<T>>>,
    _irq: PhantomData<fn() -> I>,
}

impl<T, I: IrqControl> HandleTable<T, I> {
    pub const fn new() -> Self {
        Self {
            next: AtomicUsize::new(1),
            entries: RwLock::new(BTreeMap::new()),
            _irq: PhantomData,
        }
    }

    fn with_entries<R>(&self, f: impl FnOnce(&BTreeMap<usize, Entry<T>>) -> R) -> R {
        let state = I::disable();
        let result = f(&self.entries.read());
        I::restore(state);
        result
    }

    fn with_entries_mut<R>(&self, f: impl FnOnce(&mut BTreeMap<usize, Entry<T>>) -> R) -> R {
        let state = I::disable();
        let result = f(&mut self.entries.write());
        I::restore(state);
        result
    }

    /// Charge `cost` bytes, build the object, and register it.
    ///
    /// If `build` fails the charge is returned, so a failed creation leaves
    /// the heap exactly as it was. `build` runs with interrupts enabled.
    pub fn insert_with(
        &self,
        heap: &HeapAccounting,
        cost: usize,
        build: impl FnOnce() -> OsResult<T>,
    ) -> OsResult<RawHandle> {
        heap.reserve(cost)?;
        let object = match build() {
            Ok(object) => object,
            Err(err) => {
                heap.release(cost);
                return Err(err);
            }
        };

        let id = self.next.fetch_add(1, Ordering::Relaxed);
        let handle = RawHandle::from_raw(id).ok_or(OsError::Fail)?;
        let entry = Entry {
            object: Arc::new(object),
            cost,
        };
        self.with_entries_mut(|entries| entries.insert(id, entry));
        Ok(handle)
    }

    pub fn get(&self, handle: RawHandle) -> OsResult<Arc<T>> {
        self.with_entries(|entries| {
            entries
                .get(&handle.as_raw())
                .map(|entry| entry.object.clone())
                .ok_or(OsError::Invalid)
        })
    }

    /// Unregister an object and return its charge to the heap.
    pub fn remove(&self, heap: &HeapAccounting, handle: RawHandle) -> OsResult<Arc<T>> {
        let entry = self
            .with_entries_mut(|entries| entries.remove(&handle.as_raw()))
            .ok_or(OsError::Invalid)?;
        heap.release(entry.cost);
        Ok(entry.object)
    }

    /// Live objects in creation order.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.with_entries(|entries| entries.values().map(|entry| entry.object.clone()).collect())
    }
}

impl<T, I: IrqControl> Default for HandleTable<T, I> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Object State Machines
// ============================================================================

/// Fixed-size ring of fixed-size items, preallocated at creation.
#[derive(Debug)]
pub struct ByteRing {
    storage: Vec<u8>,
    item_size: usize,
    capacity: usize,
    head: usize,
    len: usize,
}

impl ByteRing {
    pub fn new(capacity: usize, item_size: usize) -> OsResult<Self> {
        if capacity == 0 || item_size == 0 {
            return Err(OsError::Invalid);
        }
        let bytes = capacity.checked_mul(item_size).ok_or(OsError::Invalid)?;
        Ok(Self {
            storage: vec![0; bytes],
            item_size,
            capacity,
            head: 0,
            len: 0,
        })
    }

    /// Bytes a queue of this shape costs.
    pub fn footprint(capacity: usize, item_size: usize) -> OsResult<usize> {
        capacity
            .checked_mul(item_size)
            .and_then(|bytes| bytes.checked_add(core::mem::size_of::<Self>()))
            .ok_or(OsError::Invalid)
    }

    pub fn check_send(&self, item: &[u8]) -> OsResult<()> {
        if item.len() != self.item_size {
            return Err(OsError::Invalid);
        }
        Ok(())
    }

    pub fn check_receive(&self, item: &[u8]) -> OsResult<()> {
        if item.len() < self.item_size {
            return Err(OsError::Invalid);
        }
        Ok(())
    }

    /// Copy `item` in; `false` if full.
    pub fn try_push(&mut self, item: &[u8]) -> bool {
        if self.len == self.capacity {
            return false;
        }
        let slot = (self.head + self.len) % self.capacity;
        let start = slot * self.item_size;
        self.storage[start..start + self.item_size].copy_from_slice(item);
        self.len += 1;
        true
    }

    /// Copy the oldest item out; `false` if empty.
    pub fn try_pop(&mut self, item: &mut [u8]) -> bool {
        if self.len == 0 {
            return false;
        }
        let start = self.head * self.item_size;
        item[..self.item_size].copy_from_slice(&self.storage[start..start + self.item_size]);
        self.head = (self.head + 1) % self.capacity;
        self.len -= 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

/// Counting semaphore state.
#[derive(Debug)]
pub struct Counter {
    count: u32,
    max: u32,
}

impl Counter {
    pub fn new(max: u32, initial: u32) -> OsResult<Self> {
        if max == 0 || initial > max {
            return Err(OsError::Invalid);
        }
        Ok(Self {
            count: initial,
            max,
        })
    }

    pub fn try_take(&mut self) -> bool {
        if self.count == 0 {
            return false;
        }
        self.count -= 1;
        true
    }

    pub fn give(&mut self) -> OsResult<()> {
        if self.count == self.max {
            return Err(OsError::Fail);
        }
        self.count += 1;
        Ok(())
    }
}

/// Mutex state with an owner token.
///
/// Backends without a notion of thread identity use `()` as the owner.
#[derive(Debug)]
pub struct Ownership<O> {
    owner: Option<O>,
}

impl<O: Copy + PartialEq> Ownership<O> {
    pub const fn new() -> Self {
        Self { owner: None }
    }

    pub fn try_lock(&mut self, who: O) -> bool {
        if self.owner.is_some() {
            return false;
        }
        self.owner = Some(who);
        true
    }

    pub fn unlock(&mut self, who: O) -> OsResult<()> {
        match self.owner {
            None => Err(OsError::Invalid),
            Some(owner) if owner != who => Err(OsError::Fail),
            Some(_) => {
                self.owner = None;
                Ok(())
            }
        }
    }
}

impl<O: Copy + PartialEq> Default for Ownership<O> {
    fn default() -> Self {
        Self::new()
    }
}
