//! The process-wide binding is set once, so everything about it lives in one
//! test binary and one test.

mod common;

use hosted_osal::OsError;
use hosted_osal::adapter::{bind, bind_default, bound};

use crate::common::hosted;

#[test]
fn test_bind_once() {
    assert_eq!(bound().unwrap_err(), OsError::Fail);

    let (_backend, adapter) = hosted(64 * 1024);
    let first = bind(adapter).unwrap();
    assert_eq!(first.name(), "hosted");
    assert!(core::ptr::eq(bound().unwrap(), first));

    let (_backend, other) = hosted(1024);
    assert_eq!(bind(other).unwrap_err(), OsError::Invalid);
    assert_eq!(bind_default().unwrap_err(), OsError::Invalid);

    // The first binding survives the rejected attempts.
    assert_eq!(bound().unwrap().heap_stats().total, 64 * 1024);
}
