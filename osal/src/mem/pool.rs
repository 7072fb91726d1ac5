//! Preallocated buffer pool for hot-path network buffers.
//!
//! All blocks come from one DMA-capable region allocated when the pool is
//! built. Fetching and recycling only move an index on the free list under a
//! backend spinlock, so they are cheap and safe from interrupt handlers.

use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::fmt;
use core::ops::{Deref, DerefMut};

use log::{debug, error, warn};

use super::HeapBuf;
use crate::adapter::Adapter;
use crate::handle::Spinlock;
use crate::hal::memory::DMA_ALIGNMENT;
use crate::status::{OsError, OsResult};
use crate::transport::MAX_TRANSPORT_BUFFER_SIZE;

/// Shape of a buffer pool.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Usable bytes per block.
    pub block_size: usize,
    /// Number of blocks.
    pub capacity: usize,
    /// Clear every block as it is fetched.
    pub zero_on_fetch: bool,
}

impl PoolConfig {
    pub const fn new(block_size: usize, capacity: usize) -> Self {
        Self {
            block_size,
            capacity,
            zero_on_fetch: false,
        }
    }

    /// Blocks large enough for a full transport frame.
    pub const fn transport(capacity: usize) -> Self {
        Self::new(MAX_TRANSPORT_BUFFER_SIZE, capacity)
    }

    pub const fn zero_on_fetch(mut self, zero: bool) -> Self {
        self.zero_on_fetch = zero;
        self
    }
}

/// Fixed set of equally sized buffers, created once and recycled.
pub struct BufferPool {
    config: PoolConfig,
    stride: usize,
    region: HeapBuf,
    lock: Spinlock,
    /// Indices of free blocks. Only touched while `lock` is held.
    free: UnsafeCell<Vec<usize>>,
}

// SAFETY: the free list is only accessed under `lock`, and each block is
// handed to at most one `PoolBuf` at a time.
unsafe impl Send for BufferPool {}
unsafe impl Sync for BufferPool {}

impl BufferPool {
    /// Allocate the region and the spinlock guarding it.
    ///
    /// # Errors
    ///
    /// - `Invalid`: zero block size or capacity
    /// - `NoMemory`: the region or the lock could not be allocated
    pub fn new(adapter: &Adapter, config: PoolConfig) -> OsResult<Self> {
        if config.block_size == 0 || config.capacity == 0 {
            return Err(OsError::Invalid);
        }

        let stride = config
            .block_size
            .checked_next_multiple_of(DMA_ALIGNMENT)
            .ok_or(OsError::Invalid)?;
        let total = stride
            .checked_mul(config.capacity)
            .ok_or(OsError::Invalid)?;

        let region = adapter.dma_malloc(total)?;
        let lock = adapter.spinlock()?;
        // Fetch order follows block order.
        let free = (0..config.capacity).rev().collect();

        debug!(
            "pool: {} blocks of {} bytes ({} byte region)",
            config.capacity, config.block_size, total
        );
        Ok(Self {
            config,
            stride,
            region,
            lock,
            free: UnsafeCell::new(free),
        })
    }

    /// Pool of transport-frame-sized blocks.
    pub fn for_transport(adapter: &Adapter, capacity: usize) -> OsResult<Self> {
        Self::new(adapter, PoolConfig::transport(capacity))
    }

    /// Run `f` on the free list with the pool lock held.
    fn with_free<R>(&self, f: impl FnOnce(&mut Vec<usize>) -> R) -> OsResult<R> {
        let _guard = self.lock.take()?;
        // SAFETY: the spinlock serializes every access to the free list
        Ok(f(unsafe { &mut *self.free.get() }))
    }

    /// Fetch a block and view its first `len` bytes.
    ///
    /// Blocks keep whatever the previous user wrote unless the pool zeroes
    /// on fetch.
    ///
    /// # Errors
    ///
    /// - `Invalid`: `len` is zero or larger than the block size
    /// - `NoMemory`: every block is in use
    pub fn alloc(&self, len: usize) -> OsResult<PoolBuf<'_>> {
        self.fetch(len, self.config.zero_on_fetch)
    }

    /// Fetch a block and clear it.
    pub fn alloc_zeroed(&self, len: usize) -> OsResult<PoolBuf<'_>> {
        self.fetch(len, true)
    }

    fn fetch(&self, len: usize, zero: bool) -> OsResult<PoolBuf<'_>> {
        if len == 0 || len > self.config.block_size {
            return Err(OsError::Invalid);
        }

        let Some(index) = self.with_free(|free| free.pop())? else {
            error!("pool: all {} blocks in use", self.config.capacity);
            return Err(OsError::NoMemory);
        };

        let mut buf = PoolBuf {
            pool: self,
            index,
            len,
        };
        if zero {
            buf.block_mut().fill(0);
        }
        Ok(buf)
    }

    fn recycle(&self, index: usize) {
        if let Err(err) = self.with_free(|free| free.push(index)) {
            warn!("pool: block {} lost: {}", index, err);
        }
    }

    /// Blocks ready to be fetched.
    ///
    /// Fails with the spinlock's error if the pool lock cannot be taken.
    pub fn available(&self) -> OsResult<usize> {
        self.with_free(|free| free.len())
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    /// Blocks currently fetched.
    pub fn in_use(&self) -> OsResult<usize> {
        Ok(self.capacity() - self.available()?)
    }

    fn block_ptr(&self, index: usize) -> *mut u8 {
        // SAFETY: index < capacity, so the block lies inside the region
        unsafe { self.region.as_non_null().as_ptr().add(index * self.stride) }
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("config", &self.config)
            .field("stride", &self.stride)
            .finish()
    }
}

/// A block fetched from a [`BufferPool`], recycled on drop.
pub struct PoolBuf<'p> {
    pool: &'p BufferPool,
    index: usize,
    len: usize,
}

impl PoolBuf<'_> {
    /// The whole block, beyond the requested length.
    fn block_mut(&mut self) -> &mut [u8] {
        // SAFETY: this PoolBuf owns block `index` exclusively
        unsafe {
            core::slice::from_raw_parts_mut(self.pool.block_ptr(self.index), self.pool.block_size())
        }
    }

    /// Position of the block within the pool.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Deref for PoolBuf<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: block `index` is owned by self and initialized
        unsafe { core::slice::from_raw_parts(self.pool.block_ptr(self.index), self.len) }
    }
}

impl DerefMut for PoolBuf<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut self.block_mut()[..len]
    }
}

impl Drop for PoolBuf<'_> {
    fn drop(&mut self) {
        self.pool.recycle(self.index);
    }
}

impl fmt::Debug for PoolBuf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuf")
            .field("index", &self.index)
            .field("len", &self.len)
            .finish()
    }
}
