//! Timer interface.
//!
//! Software timers invoke a callback after an interval, once or repeatedly.
//! [`TickSource`] is the hardware side a bare-metal backend needs to keep
//! time.

use alloc::sync::Arc;
use core::time::Duration;

use super::RawHandle;
use crate::status::OsResult;

/// Timer operating mode.
///
/// The discriminants match the control layer's `RPC__TIMER_ONESHOT` and
/// `RPC__TIMER_PERIODIC`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum TimerMode {
    /// Timer fires once after the specified interval.
    OneShot = 0,
    /// Timer automatically reloads and fires periodically.
    Periodic = 1,
}

/// Timer expiry callback.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Timer entries of the dispatch table.
pub trait TimerOps {
    /// Create and arm a timer.
    ///
    /// # Errors
    ///
    /// - `Invalid`: zero period
    /// - `NoMemory`: no room for the timer control block
    fn timer_start(
        &self,
        period: Duration,
        mode: TimerMode,
        callback: TimerCallback,
    ) -> OsResult<RawHandle>;

    /// Disarm a timer and release it. A callback already running finishes.
    fn timer_stop(&self, timer: RawHandle) -> OsResult<()>;
}

/// Free-running microsecond counter.
pub trait TickSource {
    /// Current counter value in microseconds.
    ///
    /// Must be monotonic; wrapping is not expected within the device's life.
    fn now_us(&self) -> u64;

    /// Busy-wait delay for the specified number of microseconds.
    ///
    /// This blocks the CPU and should only be used for short delays.
    fn delay_us(&self, us: u64) {
        let start = self.now_us();

        while self.now_us().wrapping_sub(start) < us {
            core::hint::spin_loop();
        }
    }

    /// Counter value as a duration.
    fn now(&self) -> Duration {
        Duration::from_micros(self.now_us())
    }
}
