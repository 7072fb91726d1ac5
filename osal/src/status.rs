//! Adapter status codes.
//!
//! Every dispatch-table entry reports failure through [`OsError`]. The integer
//! codes are the ones the control/RPC layer already understands, so they are
//! fixed and must not be renumbered.

use core::fmt;

/// Success.
pub const RET_OK: i32 = 0;
/// Generic backend failure.
pub const RET_FAIL: i32 = -1;
/// Bad argument or configuration.
pub const RET_INVALID: i32 = -2;
/// Allocation failure.
pub const RET_FAIL_MEM: i32 = -3;
/// First extended code; a bounded wait expired.
pub const RET_FAIL4: i32 = -4;
/// A non-blocking call found the resource unavailable.
pub const RET_WOULD_BLOCK: i32 = -5;

/// Failure outcome of an adapter operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OsError {
    /// Generic backend failure.
    Fail,
    /// Bad argument, stale handle or rejected configuration.
    Invalid,
    /// The backend could not allocate memory for the request.
    NoMemory,
    /// A bounded wait expired before the resource became available.
    Timeout,
    /// Non-blocking call and the resource was unavailable.
    WouldBlock,
    /// Backend-specific extended code.
    Backend(i32),
}

/// Result type used by every adapter operation.
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    /// Integer status code for this error.
    pub const fn code(self) -> i32 {
        match self {
            OsError::Fail => RET_FAIL,
            OsError::Invalid => RET_INVALID,
            OsError::NoMemory => RET_FAIL_MEM,
            OsError::Timeout => RET_FAIL4,
            OsError::WouldBlock => RET_WOULD_BLOCK,
            OsError::Backend(code) => code,
        }
    }

    /// Decode an integer status code. `RET_OK` decodes to `None`.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            RET_OK => None,
            RET_FAIL => Some(OsError::Fail),
            RET_INVALID => Some(OsError::Invalid),
            RET_FAIL_MEM => Some(OsError::NoMemory),
            RET_FAIL4 => Some(OsError::Timeout),
            RET_WOULD_BLOCK => Some(OsError::WouldBlock),
            other => Some(OsError::Backend(other)),
        }
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsError::Fail => f.write_str("backend failure"),
            OsError::Invalid => f.write_str("invalid argument"),
            OsError::NoMemory => f.write_str("out of memory"),
            OsError::Timeout => f.write_str("timed out"),
            OsError::WouldBlock => f.write_str("would block"),
            OsError::Backend(code) => write!(f, "backend error {}", code),
        }
    }
}

impl From<OsError> for i32 {
    fn from(err: OsError) -> i32 {
        err.code()
    }
}

/// Collapse a result into the integer status code the C-facing layers use.
pub fn status_code<T>(result: &OsResult<T>) -> i32 {
    match result {
        Ok(_) => RET_OK,
        Err(err) => err.code(),
    }
}

/// Turn an integer status code back into a result.
pub fn check(code: i32) -> OsResult<()> {
    match OsError::from_code(code) {
        None => Ok(()),
        Some(err) => Err(err),
    }
}
