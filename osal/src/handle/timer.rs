use alloc::sync::Arc;
use core::time::Duration;

use super::{Owned, kind::TimerKind};
use crate::adapter::Adapter;
use crate::hal::timer::TimerMode;
use crate::status::OsResult;

/// An armed software timer. Dropping it stops the timer.
pub type Timer = Owned<TimerKind>;

impl Adapter {
    /// Arm a timer that calls `callback` after `period`, once or repeatedly.
    pub fn timer<F>(&self, period: Duration, mode: TimerMode, callback: F) -> OsResult<Timer>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Timer::create(self, |backend| {
            backend.timer_start(period, mode, Arc::new(callback))
        })
    }
}

impl Timer {
    /// Disarm and release the timer.
    pub fn stop(&mut self) -> OsResult<()> {
        self.destroy()
    }
}
