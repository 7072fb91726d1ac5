//! OS adapter for a host driver talking to a wireless co-processor
//!
//! The driver core never touches an RTOS directly. Every thread, lock,
//! queue, timer, GPIO line and heap block it uses goes through one dispatch
//! table, the [`Adapter`], which wraps a concrete [`Backend`].
//!
//! # Module Organization
//!
//! - [`hal`]: the primitive families a backend implements
//! - [`adapter`]: the dispatch table and its process-wide binding
//! - [`handle`]: owning handles that destroy their object on drop
//! - [`mem`]: plain, DMA-capable and pooled buffers
//! - [`platform`]: the hosted and bare-metal backends
//! - [`status`]: result codes shared with the control layer
//! - [`timeout`]: blocking-call timeouts
//! - [`transport`]: wire buffer budgets
//!
//! # Usage Example
//!
//! ```no_run
//! use hosted_osal::{Adapter, OsResult, Timeout};
//! use hosted_osal::platform::hosted::HostedBackend;
//!
//! fn run() -> OsResult<()> {
//!     let adapter = Adapter::new(HostedBackend::new(Default::default()));
//!     let queue = adapter.queue(8, 4)?;
//!     queue.send(&[1, 2, 3, 4], Timeout::NonBlocking)?;
//!
//!     let mut item = [0u8; 4];
//!     queue.receive(&mut item, Timeout::Forever)?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod adapter;
pub mod hal;
pub mod handle;
pub mod mem;
pub mod platform;
pub mod status;
pub mod timeout;
pub mod transport;

// Re-export commonly used types
pub use adapter::Adapter;
pub use hal::gpio::{GpioConfig, GpioMode, GpioPortId, InterruptTrigger, PinLevel, PullMode};
pub use hal::memory::MemCaps;
pub use hal::thread::ThreadSpec;
pub use hal::timer::TimerMode;
pub use hal::{Backend, DeliveryContext, RawHandle};
pub use status::{OsError, OsResult};
pub use timeout::Timeout;
