use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::HostedBackend;
use super::wait::Waitable;
use crate::hal::RawHandle;
use crate::hal::thread::{MIN_STACK_SIZE, ThreadEntry, ThreadOps, ThreadSpec};
use crate::hal::timer::{TimerCallback, TimerMode, TimerOps};
use crate::platform::objects::HandleTable;
use crate::status::{OsError, OsResult};
use crate::timeout::Timeout;

/// Smallest stack given to an OS thread; driver stack sizes are sized for
/// an RTOS and are too small for debug builds of std code.
const HOST_MIN_STACK: usize = 64 * 1024;

struct ThreadSlot {
    name: String,
    // Dropping the join handle detaches the thread.
    _handle: JoinHandle<()>,
}

pub(super) struct ThreadTable {
    threads: HandleTable<ThreadSlot>,
}

impl ThreadTable {
    pub(super) const fn new() -> Self {
        Self {
            threads: HandleTable::new(),
        }
    }
}

impl ThreadOps for HostedBackend {
    fn thread_create(&self, spec: &ThreadSpec, entry: ThreadEntry) -> OsResult<RawHandle> {
        if spec.stack_size < MIN_STACK_SIZE {
            return Err(OsError::Invalid);
        }

        let cost = spec.stack_size + core::mem::size_of::<ThreadSlot>();
        self.threads.threads.insert_with(&self.heap, cost, || {
            let handle = thread::Builder::new()
                .name(spec.name.clone())
                .stack_size(spec.stack_size.max(HOST_MIN_STACK))
                .spawn(entry)
                .map_err(|err| {
                    warn!("hosted: spawning {} failed: {}", spec.name, err);
                    OsError::Fail
                })?;
            debug!("hosted: started thread {}", spec.name);
            Ok(ThreadSlot {
                name: spec.name.clone(),
                _handle: handle,
            })
        })
    }

    fn thread_delete(&self, thread: RawHandle) -> OsResult<()> {
        let slot = self.threads.threads.remove(&self.heap, thread)?;
        debug!("hosted: deleted thread {}", slot.name);
        Ok(())
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }

    fn uptime(&self) -> Duration {
        self.epoch.elapsed()
    }
}

// ============================================================================
// Timers
// ============================================================================

struct TimerSlot {
    stopped: Arc<Waitable<bool>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TimerSlot {
    /// Signal the worker and wait for a running callback to finish.
    ///
    /// A callback that stops its own timer cannot wait for itself; its worker
    /// exits once the callback returns.
    fn stop(&self) {
        self.stopped.update(|stopped| *stopped = true);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker
            && worker.thread().id() != thread::current().id()
            && worker.join().is_err()
        {
            warn!("hosted: timer callback panicked");
        }
    }
}

pub(super) struct TimerTable {
    timers: HandleTable<TimerSlot>,
}

impl TimerTable {
    pub(super) const fn new() -> Self {
        Self {
            timers: HandleTable::new(),
        }
    }

    /// Stop every worker. Handles stay registered until deleted.
    pub(super) fn stop_all(&self) {
        for timer in self.timers.snapshot() {
            timer.stop();
        }
    }
}

fn run_timer(stopped: &Waitable<bool>, period: Duration, mode: TimerMode, callback: TimerCallback) {
    let mut next = Instant::now().checked_add(period);
    loop {
        // An expiry the clock cannot represent never comes; wait for stop.
        let wait = match next {
            Some(at) => Timeout::After(at.saturating_duration_since(Instant::now())),
            None => Timeout::Forever,
        };
        let signalled = stopped.wait_for(wait, |stopped| stopped.then_some(()));
        if signalled.is_ok() {
            return;
        }

        callback();

        if mode == TimerMode::OneShot {
            return;
        }
        next = next.and_then(|at| at.checked_add(period));
    }
}

impl TimerOps for HostedBackend {
    fn timer_start(
        &self,
        period: Duration,
        mode: TimerMode,
        callback: TimerCallback,
    ) -> OsResult<RawHandle> {
        if period.is_zero() {
            return Err(OsError::Invalid);
        }

        let cost = core::mem::size_of::<TimerSlot>();
        self.timers.timers.insert_with(&self.heap, cost, || {
            let stopped = Arc::new(Waitable::new(false));
            let worker = {
                let stopped = stopped.clone();
                thread::Builder::new()
                    .name("osal-timer".into())
                    .spawn(move || run_timer(&stopped, period, mode, callback))
                    .map_err(|err| {
                        warn!("hosted: timer worker failed to start: {}", err);
                        OsError::Fail
                    })?
            };
            debug!("hosted: timer armed, {:?} {:?}", mode, period);
            Ok(TimerSlot {
                stopped,
                worker: Mutex::new(Some(worker)),
            })
        })
    }

    fn timer_stop(&self, timer: RawHandle) -> OsResult<()> {
        self.timers.timers.remove(&self.heap, timer)?.stop();
        Ok(())
    }
}
