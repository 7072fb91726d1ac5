use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::status::OsResult;
use crate::timeout::Timeout;

/// Object state paired with a condition variable that is notified on every
/// change.
#[derive(Debug, Default)]
pub(super) struct Waitable<S> {
    state: Mutex<S>,
    changed: Condvar,
}

impl<S> Waitable<S> {
    pub(super) fn new(state: S) -> Self {
        Self {
            state: Mutex::new(state),
            changed: Condvar::new(),
        }
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the state and wake every waiter.
    pub(super) fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let result = f(&mut *self.lock());
        self.changed.notify_all();
        result
    }

    /// Retry `attempt` each time the state changes until it yields a value
    /// or `timeout` runs out.
    ///
    /// A successful attempt counts as a change and wakes the other waiters.
    pub(super) fn wait_for<R>(
        &self,
        timeout: Timeout,
        mut attempt: impl FnMut(&mut S) -> Option<R>,
    ) -> OsResult<R> {
        // A deadline too far out to represent is the same as none.
        let deadline = match timeout {
            Timeout::After(limit) => Instant::now().checked_add(limit),
            _ => None,
        };

        let mut state = self.lock();
        loop {
            if let Some(result) = attempt(&mut *state) {
                drop(state);
                self.changed.notify_all();
                return Ok(result);
            }

            state = match (timeout, deadline) {
                (Timeout::NonBlocking, _) => return Err(timeout.exhausted()),
                (Timeout::After(_), Some(deadline)) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(timeout.exhausted());
                    }
                    self.changed
                        .wait_timeout(state, deadline - now)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|poisoned| poisoned.into_inner().0)
                }
                _ => self
                    .changed
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}
