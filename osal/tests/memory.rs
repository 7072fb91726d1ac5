mod common;

use hosted_osal::hal::memory::DMA_ALIGNMENT;
use hosted_osal::hal::sync::SpinlockOps;
use hosted_osal::mem::pool::{BufferPool, PoolConfig};
use hosted_osal::transport::MAX_TRANSPORT_BUFFER_SIZE;
use hosted_osal::{OsError, RawHandle, Timeout, mem};

use crate::common::hosted;

#[test]
fn test_exhaustion_returns_no_memory_without_leaking() {
    let (_backend, adapter) = hosted(1024);

    let mut held = Vec::new();
    let err = loop {
        match adapter.malloc(100) {
            Ok(buf) => held.push(buf),
            Err(err) => break err,
        }
    };
    assert_eq!(err, OsError::NoMemory);
    assert_eq!(held.len(), 10);

    // Object creation hits the same budget.
    assert_eq!(adapter.queue(64, 4).unwrap_err(), OsError::NoMemory);

    held.clear();
    let stats = adapter.heap_stats();
    assert_eq!(stats.free, stats.total);
    assert_eq!(stats.allocations, stats.frees);
}

#[test]
fn test_failed_creation_leaves_counts_symmetric() {
    let (_backend, adapter) = hosted(4096);

    // Invalid shape: fails after nothing was charged.
    assert_eq!(adapter.queue(0, 4).unwrap_err(), OsError::Invalid);
    assert_eq!(adapter.semaphore(1, 2).unwrap_err(), OsError::Invalid);

    let queue = adapter.queue(4, 4).unwrap();
    queue.send(&[1, 2, 3, 4], Timeout::NonBlocking).unwrap();
    drop(queue);

    let stats = adapter.heap_stats();
    assert_eq!(stats.outstanding(), 0);
    assert_eq!(stats.free, 4096);
}

#[test]
fn test_dma_and_transport_buffers() {
    let (_backend, adapter) = hosted(16 * 1024);

    for size in [1, 3, 4, 5, 1537] {
        let buf = adapter.dma_malloc(size).unwrap();
        assert_eq!(buf.len() % DMA_ALIGNMENT, 0);
        assert!(buf.len() >= size && buf.len() < size + DMA_ALIGNMENT);
        assert_eq!(buf.as_non_null().as_ptr() as usize % DMA_ALIGNMENT, 0);
    }

    let frame = adapter.transport_buffer().unwrap();
    assert_eq!(frame.len(), MAX_TRANSPORT_BUFFER_SIZE);
}

#[test]
fn test_free_of_empty_slot_is_noop() {
    let (_backend, adapter) = hosted(1024);
    let mut slot = None;
    mem::free(&mut slot);

    slot = Some(adapter.malloc(16).unwrap());
    mem::free(&mut slot);
    assert!(slot.is_none());
    assert_eq!(adapter.heap_stats().outstanding(), 0);
}

#[test]
fn test_pool_capacity_plus_one() {
    let (_backend, adapter) = hosted(64 * 1024);
    let pool = BufferPool::new(&adapter, PoolConfig::new(256, 4)).unwrap();

    let mut held: Vec<_> = (0..4).map(|_| pool.alloc(256).unwrap()).collect();
    assert_eq!(pool.in_use(), Ok(4));
    assert_eq!(pool.alloc(16).unwrap_err(), OsError::NoMemory);

    held.pop();
    let again = pool.alloc(16).unwrap();
    assert_eq!(again.len(), 16);
    assert_eq!(pool.available(), Ok(0));
}

#[test]
fn test_pool_rejects_bad_lengths() {
    let (_backend, adapter) = hosted(64 * 1024);
    let pool = BufferPool::new(&adapter, PoolConfig::new(100, 2)).unwrap();

    assert_eq!(pool.alloc(0).unwrap_err(), OsError::Invalid);
    assert_eq!(pool.alloc(101).unwrap_err(), OsError::Invalid);
    assert_eq!(pool.available(), Ok(2));

    assert_eq!(
        BufferPool::new(&adapter, PoolConfig::new(100, 0)).unwrap_err(),
        OsError::Invalid
    );
}

#[test]
fn test_pool_counts_report_lock_failure() {
    let (backend, adapter) = hosted(64 * 1024);
    let pool = BufferPool::new(&adapter, PoolConfig::new(64, 2)).unwrap();
    let _held = pool.alloc(64).unwrap();
    assert_eq!(pool.in_use(), Ok(1));

    // The pool's lock is the only spinlock on this backend.
    backend
        .spinlock_delete(RawHandle::from_raw(1).unwrap())
        .unwrap();
    assert_eq!(pool.available(), Err(OsError::Invalid));
    assert_eq!(pool.in_use(), Err(OsError::Invalid));
}

#[test]
fn test_pool_blocks_are_recycled_and_optionally_cleared() {
    let (_backend, adapter) = hosted(64 * 1024);

    let pool = BufferPool::new(&adapter, PoolConfig::new(8, 1)).unwrap();
    pool.alloc(8).unwrap().copy_from_slice(&[0xAA; 8]);
    assert_eq!(&*pool.alloc(8).unwrap(), &[0xAA; 8]);
    assert!(pool.alloc_zeroed(8).unwrap().iter().all(|&b| b == 0));

    let zeroing = BufferPool::new(&adapter, PoolConfig::new(8, 1).zero_on_fetch(true)).unwrap();
    zeroing.alloc(8).unwrap().fill(0x55);
    assert!(zeroing.alloc(8).unwrap().iter().all(|&b| b == 0));
}

#[test]
fn test_transport_pool() {
    let (_backend, adapter) = hosted(64 * 1024);
    let pool = BufferPool::for_transport(&adapter, 3).unwrap();
    assert_eq!(pool.block_size(), MAX_TRANSPORT_BUFFER_SIZE);
    assert_eq!(pool.capacity(), 3);

    let buf = pool.alloc(MAX_TRANSPORT_BUFFER_SIZE).unwrap();
    assert_eq!(buf.len(), MAX_TRANSPORT_BUFFER_SIZE);
}

#[test]
fn test_pool_teardown_returns_everything() {
    let (_backend, adapter) = hosted(64 * 1024);
    {
        let pool = BufferPool::new(&adapter, PoolConfig::new(512, 8)).unwrap();
        let _a = pool.alloc(10).unwrap();
    }
    assert_eq!(adapter.heap_stats().outstanding(), 0);
}
