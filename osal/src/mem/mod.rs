//! Memory subsystem.
//!
//! Three tiers, all backed by the adapter's heap:
//!
//! - plain allocation ([`Adapter::malloc`], [`Adapter::calloc`]): word aligned
//! - DMA-capable allocation ([`Adapter::dma_malloc`]): aligned to
//!   [`DMA_ALIGNMENT`] with the length rounded up to a multiple of it
//! - pooled buffers ([`pool::BufferPool`]): fixed-size blocks carved from
//!   one DMA region, recycled instead of freed
//!
//! Buffers handed out here are always initialized, so they can be used as
//! ordinary byte slices.

pub mod accounting;
pub mod pool;

use core::alloc::Layout;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

use log::error;

use crate::adapter::Adapter;
use crate::hal::memory::{DMA_ALIGNMENT, HeapStats, MALLOC_ALIGNMENT, MemCaps, effective_layout};
use crate::status::{OsError, OsResult};
use crate::transport::MAX_TRANSPORT_BUFFER_SIZE;

/// A heap block owned by the caller, returned to the backend on drop.
pub struct HeapBuf {
    adapter: Adapter,
    ptr: NonNull<u8>,
    layout: Layout,
    caps: MemCaps,
}

// SAFETY: the block is exclusively owned; shared access only reads it.
unsafe impl Send for HeapBuf {}
unsafe impl Sync for HeapBuf {}

impl HeapBuf {
    fn zeroed(adapter: &Adapter, layout: Layout, caps: MemCaps) -> OsResult<Self> {
        if layout.size() == 0 {
            return Err(OsError::Invalid);
        }

        match adapter.backend().alloc_zeroed(layout, caps) {
            Some(ptr) => Ok(Self {
                adapter: adapter.clone(),
                ptr,
                layout,
                caps,
            }),
            None => {
                error!(
                    "allocation of {} bytes ({:?}) failed",
                    layout.size(),
                    caps
                );
                Err(OsError::NoMemory)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn caps(&self) -> MemCaps {
        self.caps
    }

    /// Start of the block, for handing to a DMA engine.
    pub fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }
}

impl Deref for HeapBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: the block holds `len` initialized bytes owned by self
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }
}

impl DerefMut for HeapBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as in `deref`, and `&mut self` makes the access unique
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len()) }
    }
}

impl Drop for HeapBuf {
    fn drop(&mut self) {
        // SAFETY: allocated by this backend with exactly this layout and caps
        unsafe { self.adapter.backend().free(self.ptr, self.layout, self.caps) };
    }
}

impl fmt::Debug for HeapBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapBuf")
            .field("ptr", &self.ptr)
            .field("len", &self.len())
            .field("caps", &self.caps)
            .finish()
    }
}

impl Adapter {
    /// General-purpose allocation, word aligned.
    ///
    /// # Errors
    ///
    /// - `Invalid`: `size` is zero
    /// - `NoMemory`: the heap is exhausted
    pub fn malloc(&self, size: usize) -> OsResult<HeapBuf> {
        let layout = Layout::from_size_align(size, MALLOC_ALIGNMENT).map_err(|_| OsError::Invalid)?;
        HeapBuf::zeroed(self, layout, MemCaps::DEFAULT)
    }

    /// Zeroed allocation of `count` elements of `size` bytes.
    pub fn calloc(&self, count: usize, size: usize) -> OsResult<HeapBuf> {
        let total = count.checked_mul(size).ok_or(OsError::Invalid)?;
        self.malloc(total)
    }

    /// DMA-capable allocation. The length is rounded up to a multiple of
    /// [`DMA_ALIGNMENT`].
    pub fn dma_malloc(&self, size: usize) -> OsResult<HeapBuf> {
        let caps = MemCaps::DMA | MemCaps::INTERNAL;
        let layout = Layout::from_size_align(size, DMA_ALIGNMENT)
            .ok()
            .and_then(|layout| effective_layout(layout, caps))
            .ok_or(OsError::Invalid)?;
        HeapBuf::zeroed(self, layout, caps)
    }

    /// A DMA buffer sized for one full transport frame.
    pub fn transport_buffer(&self) -> OsResult<HeapBuf> {
        self.dma_malloc(MAX_TRANSPORT_BUFFER_SIZE)
    }

    pub fn heap_stats(&self) -> HeapStats {
        self.backend().heap_stats()
    }
}

/// Free whatever `slot` holds and leave it empty. Freeing an empty slot is
/// a no-op.
pub fn free(slot: &mut Option<HeapBuf>) {
    drop(slot.take());
}
