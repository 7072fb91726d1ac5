//! Memory allocation interface.

use core::alloc::Layout;
use core::ptr::NonNull;

bitflags::bitflags! {
    /// Placement capabilities requested from the backend heap.
    ///
    /// Bit values match the co-processor SDK's heap capability flags.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct MemCaps: u32 {
        /// Reachable by the DMA engine.
        const DMA = 1 << 3;
        /// Byte-addressable memory.
        const BYTE_ACCESS = 1 << 2;
        /// Internal (on-chip) RAM.
        const INTERNAL = 1 << 11;
        /// Whatever the plain allocator returns.
        const DEFAULT = 1 << 12;
    }
}

/// Alignment and length granularity required by the DMA engine.
pub const DMA_ALIGNMENT: usize = 4;

/// Alignment plain allocations get. No stronger guarantee is made.
pub const MALLOC_ALIGNMENT: usize = core::mem::align_of::<usize>();

/// Layout a backend actually uses for a request with `caps`.
///
/// DMA requests are widened to [`DMA_ALIGNMENT`] in both alignment and
/// length. Backends must apply this identically in `alloc` and `free`.
pub fn effective_layout(layout: Layout, caps: MemCaps) -> Option<Layout> {
    if caps.contains(MemCaps::DMA) {
        let align = layout.align().max(DMA_ALIGNMENT);
        let size = layout.size().checked_next_multiple_of(DMA_ALIGNMENT)?;
        Layout::from_size_align(size, align).ok()
    } else {
        Some(layout)
    }
}

/// Snapshot of backend heap usage.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Heap budget in bytes.
    pub total: usize,
    /// Bytes currently free.
    pub free: usize,
    /// Lowest `free` ever observed.
    pub min_free: usize,
    /// Successful allocations so far, including object control blocks.
    pub allocations: usize,
    /// Releases so far.
    pub frees: usize,
}

impl HeapStats {
    /// Allocations not yet released.
    pub fn outstanding(&self) -> usize {
        self.allocations - self.frees
    }
}

/// Heap entries of the dispatch table.
pub trait MemoryOps {
    /// Allocate `layout` bytes. `None` means the heap is exhausted.
    fn alloc(&self, layout: Layout, caps: MemCaps) -> Option<NonNull<u8>>;

    /// Allocate zero-filled memory.
    fn alloc_zeroed(&self, layout: Layout, caps: MemCaps) -> Option<NonNull<u8>>;

    /// Return memory to the heap.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `alloc`/`alloc_zeroed` on this backend with the
    /// same `layout` and `caps`, and must not be used afterwards.
    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout, caps: MemCaps);

    /// Current heap usage.
    fn heap_stats(&self) -> HeapStats;
}
