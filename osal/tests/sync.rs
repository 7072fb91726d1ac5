mod common;

use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use hosted_osal::hal::sync::{MutexOps, SpinlockOps};
use hosted_osal::{OsError, ThreadSpec, Timeout};

use crate::common::hosted;

#[test]
fn test_non_blocking_receive_on_empty_queue() {
    let (_backend, adapter) = hosted(64 * 1024);
    let queue = adapter.queue(4, 8).unwrap();

    let mut item = [0u8; 8];
    let start = Instant::now();
    assert_eq!(
        queue.receive(&mut item, Timeout::NonBlocking),
        Err(OsError::WouldBlock)
    );
    assert!(start.elapsed() < Duration::from_millis(50));
}

#[test]
fn test_bounded_receive_times_out() {
    let (_backend, adapter) = hosted(64 * 1024);
    let queue = adapter.queue(1, 4).unwrap();

    let mut item = [0u8; 4];
    let start = Instant::now();
    assert_eq!(
        queue.receive(&mut item, Timeout::ms(40)),
        Err(OsError::Timeout)
    );
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[test]
fn test_forever_receive_waits_for_delayed_producer() {
    let (_backend, adapter) = hosted(256 * 1024);
    let queue = Arc::new(adapter.queue(2, 4).unwrap());

    let producer = {
        let queue = queue.clone();
        let sleeper = adapter.clone();
        adapter
            .spawn(&ThreadSpec::new("producer"), move || {
                sleeper.sleep_ms(60);
                queue.send(&[9, 8, 7, 6], Timeout::Forever).unwrap();
            })
            .unwrap()
    };

    let start = Instant::now();
    let mut item = [0u8; 4];
    queue.receive(&mut item, Timeout::Forever).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(item, [9, 8, 7, 6]);
    drop(producer);
}

#[test]
fn test_full_queue_and_item_sizes() {
    let (_backend, adapter) = hosted(64 * 1024);
    let queue = adapter.queue(2, 2).unwrap();

    queue.send(&[1, 1], Timeout::NonBlocking).unwrap();
    queue.send(&[2, 2], Timeout::NonBlocking).unwrap();
    assert_eq!(
        queue.send(&[3, 3], Timeout::NonBlocking),
        Err(OsError::WouldBlock)
    );
    assert_eq!(queue.len(), Ok(2));

    assert_eq!(queue.send(&[1], Timeout::NonBlocking), Err(OsError::Invalid));
    let mut small = [0u8; 1];
    assert_eq!(
        queue.receive(&mut small, Timeout::NonBlocking),
        Err(OsError::Invalid)
    );

    // Larger receive buffers are fine; the item lands at the front.
    let mut big = [0u8; 4];
    queue.receive(&mut big, Timeout::NonBlocking).unwrap();
    assert_eq!(big, [1, 1, 0, 0]);
}

#[test]
fn test_mutex_contention_end_to_end() {
    let (_backend, adapter) = hosted(256 * 1024);
    let mutex = Arc::new(adapter.mutex().unwrap());

    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel();

    let holder = {
        let mutex = mutex.clone();
        adapter
            .spawn(&ThreadSpec::new("thread-a"), move || {
                let guard = mutex.lock(Timeout::Forever).unwrap();
                locked_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                guard.unlock().unwrap();
                done_tx.send(()).unwrap();
            })
            .unwrap()
    };

    locked_rx.recv().unwrap();
    assert_eq!(mutex.lock(Timeout::ms(50)).err(), Some(OsError::Timeout));
    assert_eq!(mutex.lock(Timeout::NonBlocking).err(), Some(OsError::WouldBlock));

    release_tx.send(()).unwrap();
    done_rx.recv().unwrap();
    let guard = mutex.lock(Timeout::ms(500)).unwrap();
    drop(guard);
    drop(holder);
}

#[test]
fn test_mutex_unlock_rules() {
    let (backend, adapter) = hosted(64 * 1024);
    let mutex = Arc::new(adapter.mutex().unwrap());
    let raw = mutex.raw().unwrap();

    assert_eq!(backend.mutex_unlock(raw), Err(OsError::Invalid));

    backend.mutex_lock(raw, Timeout::Forever).unwrap();
    let other = {
        let backend = backend.clone();
        std::thread::spawn(move || backend.mutex_unlock(raw))
    };
    assert_eq!(other.join().unwrap(), Err(OsError::Fail));
    backend.mutex_unlock(raw).unwrap();
}

#[test]
fn test_semaphore_counts() {
    let (_backend, adapter) = hosted(64 * 1024);
    let sem = adapter.semaphore(2, 1).unwrap();

    sem.take(Timeout::NonBlocking).unwrap();
    assert_eq!(sem.take(Timeout::NonBlocking), Err(OsError::WouldBlock));
    sem.give().unwrap();
    sem.give().unwrap();
    assert_eq!(sem.give(), Err(OsError::Fail));

    let binary = adapter.binary_semaphore().unwrap();
    assert_eq!(binary.take(Timeout::ms(10)), Err(OsError::Timeout));
}

#[test]
fn test_semaphore_signals_across_threads() {
    let (_backend, adapter) = hosted(256 * 1024);
    let sem = Arc::new(adapter.binary_semaphore().unwrap());

    let giver = {
        let sem = sem.clone();
        adapter
            .spawn(&ThreadSpec::new("giver"), move || sem.give().unwrap())
            .unwrap()
    };
    sem.take(Timeout::ms(2000)).unwrap();
    drop(giver);
}

#[test]
fn test_spinlock_guard_and_unheld_give() {
    let (backend, adapter) = hosted(64 * 1024);
    let lock = adapter.spinlock().unwrap();

    {
        let _guard = lock.take().unwrap();
    }
    let again = lock.take().unwrap();
    drop(again);

    assert_eq!(
        backend.spinlock_give(lock.raw().unwrap()),
        Err(OsError::Invalid)
    );
}

#[test]
fn test_thread_stack_limits() {
    let (_backend, adapter) = hosted(8 * 1024);

    let tiny = ThreadSpec::new("tiny").stack_size(64);
    assert_eq!(adapter.spawn(&tiny, || {}).unwrap_err(), OsError::Invalid);

    let huge = ThreadSpec::new("huge").stack_size(64 * 1024);
    assert_eq!(adapter.spawn(&huge, || {}).unwrap_err(), OsError::NoMemory);
    assert_eq!(adapter.heap_stats().outstanding(), 0);
}
