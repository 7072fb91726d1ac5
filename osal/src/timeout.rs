//! Timeouts for blocking adapter calls.
//!
//! The control layer passes timeouts as raw milliseconds with two sentinels:
//! `HOSTED_BLOCKING` (-1) waits forever and `HOSTED_NON_BLOCKING` (0) returns
//! at once. [`Timeout`] is the typed form every blocking entry takes.

use core::time::Duration;

use crate::status::{OsError, OsResult};

/// Raw encoding of "block forever".
pub const HOSTED_BLOCKING: i32 = -1;
/// Raw encoding of "do not block".
pub const HOSTED_NON_BLOCKING: i32 = 0;
/// Tick count that backends treat as an infinite wait (`portMAX_DELAY`).
pub const BLOCK_MAX_TICKS: u32 = u32::MAX;

/// How long a blocking call may wait.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Timeout {
    /// Return immediately with `WouldBlock` if the resource is unavailable.
    NonBlocking,
    /// Wait up to the given duration, then fail with `Timeout`.
    After(Duration),
    /// Wait until the resource becomes available.
    Forever,
}

impl Timeout {
    /// Bounded wait in milliseconds. Zero means non-blocking.
    pub const fn ms(ms: u64) -> Self {
        if ms == 0 {
            Timeout::NonBlocking
        } else {
            Timeout::After(Duration::from_millis(ms))
        }
    }

    /// Decode the raw millisecond encoding used by the control layer.
    pub fn from_raw_ms(raw: i32) -> OsResult<Self> {
        match raw {
            HOSTED_BLOCKING => Ok(Timeout::Forever),
            HOSTED_NON_BLOCKING => Ok(Timeout::NonBlocking),
            ms if ms > 0 => Ok(Timeout::After(Duration::from_millis(ms as u64))),
            _ => Err(OsError::Invalid),
        }
    }

    /// Raw millisecond encoding. Waits too long to encode saturate.
    pub fn to_raw_ms(self) -> i32 {
        match self {
            Timeout::NonBlocking => HOSTED_NON_BLOCKING,
            Timeout::Forever => HOSTED_BLOCKING,
            Timeout::After(d) => d.as_millis().clamp(1, i32::MAX as u128) as i32,
        }
    }

    /// Convert to scheduler ticks at `tick_hz`, rounding partial ticks up.
    pub fn to_ticks(self, tick_hz: u32) -> u32 {
        match self {
            Timeout::NonBlocking => 0,
            Timeout::Forever => BLOCK_MAX_TICKS,
            Timeout::After(d) => {
                let ticks = (d.as_micros() * tick_hz as u128).div_ceil(1_000_000);
                ticks.min((BLOCK_MAX_TICKS - 1) as u128) as u32
            }
        }
    }

    /// Whether a wait that started at `start` has run out at `now`.
    ///
    /// Both instants are offsets on the same monotonic clock.
    pub fn expired(self, start: Duration, now: Duration) -> bool {
        match self {
            Timeout::NonBlocking => true,
            Timeout::After(limit) => now.saturating_sub(start) >= limit,
            Timeout::Forever => false,
        }
    }

    /// The error a caller sees when the wait gives up.
    pub const fn exhausted(self) -> OsError {
        match self {
            Timeout::NonBlocking => OsError::WouldBlock,
            _ => OsError::Timeout,
        }
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Timeout::Forever
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        if d.is_zero() {
            Timeout::NonBlocking
        } else {
            Timeout::After(d)
        }
    }
}
