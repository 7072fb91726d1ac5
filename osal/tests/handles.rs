mod common;

use hosted_osal::handle::{self, Queue};
use hosted_osal::{OsError, Timeout};

use crate::common::hosted;

#[test]
fn test_destroy_clears_slot() {
    let (_backend, adapter) = hosted(4096);

    let mut slot: Option<Queue> = Some(adapter.queue(2, 4).unwrap());
    handle::destroy(&mut slot).unwrap();
    assert!(slot.is_none());
    assert_eq!(adapter.heap_stats().outstanding(), 0);

    // Teardown paths call this unconditionally.
    handle::destroy(&mut slot).unwrap();
}

#[test]
fn test_destroyed_handle_is_invalid() {
    let (_backend, adapter) = hosted(4096);

    let mut queue = adapter.queue(2, 4).unwrap();
    let raw = queue.raw().unwrap();
    queue.destroy().unwrap();

    assert!(!queue.is_live());
    assert_eq!(queue.raw(), Err(OsError::Invalid));
    assert_eq!(queue.send(&[0; 4], Timeout::NonBlocking), Err(OsError::Invalid));
    queue.destroy().unwrap();

    // The backend has forgotten the token too.
    assert_eq!(adapter.backend().queue_delete(raw), Err(OsError::Invalid));
}

#[test]
fn test_tokens_are_not_reused() {
    let (_backend, adapter) = hosted(4096);

    let first = adapter.semaphore(1, 0).unwrap();
    let first_raw = first.raw().unwrap();
    drop(first);

    let second = adapter.semaphore(1, 0).unwrap();
    assert_ne!(second.raw().unwrap(), first_raw);
}
