//! Synchronization primitives shared across the workspace.
//!
//! Everything here is `no_std` and allocation free so it can sit underneath
//! both the hosted and the bare-metal adapter backends.

#![cfg_attr(not(test), no_std)]

pub mod sync;
