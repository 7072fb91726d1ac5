//! Heap budget bookkeeping shared by the backends.
//!
//! Backends allocate from the global allocator but charge every request,
//! including object control blocks, against a fixed budget. That makes
//! exhaustion deterministic and lets callers check that every allocation was
//! paired with a free.

use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::hal::memory::{HeapStats, MemCaps, effective_layout};
use crate::status::{OsError, OsResult};

/// Byte budget with allocation counters.
#[derive(Debug)]
pub struct HeapAccounting {
    total: usize,
    used: AtomicUsize,
    peak: AtomicUsize,
    allocations: AtomicUsize,
    frees: AtomicUsize,
}

impl HeapAccounting {
    pub const fn new(total: usize) -> Self {
        Self {
            total,
            used: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            allocations: AtomicUsize::new(0),
            frees: AtomicUsize::new(0),
        }
    }

    /// Charge `size` bytes, failing with `NoMemory` if the budget is spent.
    pub fn reserve(&self, size: usize) -> OsResult<()> {
        let mut used = self.used.load(Ordering::Relaxed);
        loop {
            let next = used
                .checked_add(size)
                .filter(|&next| next <= self.total)
                .ok_or(OsError::NoMemory)?;
            match self
                .used
                .compare_exchange_weak(used, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    self.peak.fetch_max(next, Ordering::Relaxed);
                    self.allocations.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                Err(actual) => used = actual,
            }
        }
    }

    /// Return `size` bytes to the budget.
    pub fn release(&self, size: usize) {
        self.used.fetch_sub(size, Ordering::AcqRel);
        self.frees.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> HeapStats {
        let used = self.used.load(Ordering::Relaxed);
        let peak = self.peak.load(Ordering::Relaxed);
        HeapStats {
            total: self.total,
            free: self.total - used,
            min_free: self.total - peak,
            allocations: self.allocations.load(Ordering::Relaxed),
            frees: self.frees.load(Ordering::Relaxed),
        }
    }

    /// Allocate from the global allocator, charged against this budget.
    pub fn alloc(&self, layout: Layout, caps: MemCaps, zeroed: bool) -> Option<NonNull<u8>> {
        let layout = effective_layout(layout, caps)?;
        if layout.size() == 0 {
            return None;
        }
        self.reserve(layout.size()).ok()?;

        // SAFETY: layout has a non-zero size
        let ptr = unsafe {
            if zeroed {
                alloc::alloc::alloc_zeroed(layout)
            } else {
                alloc::alloc::alloc(layout)
            }
        };

        match NonNull::new(ptr) {
            Some(ptr) => Some(ptr),
            None => {
                self.release(layout.size());
                None
            }
        }
    }

    /// Free memory obtained from [`HeapAccounting::alloc`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `alloc` on this accounting with the same `layout`
    /// and `caps`.
    pub unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout, caps: MemCaps) {
        let Some(layout) = effective_layout(layout, caps) else {
            return;
        };
        // SAFETY: guaranteed by caller
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) };
        self.release(layout.size());
    }
}
