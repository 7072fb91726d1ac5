//! Backend-facing primitive traits.
//!
//! Each submodule describes one family of OS services as a trait. A concrete
//! backend implements all of them and is then usable as a [`Backend`], which
//! is what the dispatch table ([`crate::adapter::Adapter`]) holds.
//!
//! # Design Principles
//!
//! - **No backend leakage**: traits never mention RTOS types
//! - **Handles are tokens**: backends hand out [`RawHandle`]s and keep the
//!   objects themselves
//! - **Failure is a value**: every fallible entry returns
//!   [`OsResult`](crate::status::OsResult), nothing panics across the boundary
//!
//! # Available Interfaces
//!
//! - [`memory`]: plain and DMA-capable allocation
//! - [`thread`]: thread creation, deletion, sleeping
//! - [`sync`]: queues, semaphores, mutexes, spinlocks
//! - [`timer`]: one-shot and periodic software timers
//! - [`gpio`]: GPIO configuration, level access, interrupts
//! - [`event`]: named event channel

pub mod event;
pub mod gpio;
pub mod memory;
pub mod sync;
pub mod thread;
pub mod timer;

use core::fmt;
use core::num::NonZeroUsize;

use event::EventOps;
use gpio::GpioOps;
use memory::MemoryOps;
use sync::{MutexOps, QueueOps, SemaphoreOps, SpinlockOps};
use thread::ThreadOps;
use timer::TimerOps;

/// Opaque token naming one live backend object.
///
/// Tokens are never zero, so `Option<RawHandle>` plays the role of a
/// nullable handle at no extra cost.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawHandle(NonZeroUsize);

impl RawHandle {
    /// Wrap a backend token. Zero is not a valid token.
    pub const fn from_raw(raw: usize) -> Option<Self> {
        match NonZeroUsize::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    pub const fn as_raw(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:#x})", self.0)
    }
}

/// Context a backend runs asynchronous callbacks in.
///
/// Handlers delivered in [`DeliveryContext::Interrupt`] must not block:
/// only non-blocking queue/semaphore calls and spinlocks are safe there.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeliveryContext {
    /// Interrupt context, or an emulation with the same restrictions.
    Interrupt,
    /// A dedicated backend task.
    Task,
    /// Synchronously in whichever context triggered the delivery.
    Caller,
}

/// A complete set of OS primitives for one backend.
pub trait Backend:
    MemoryOps
    + ThreadOps
    + QueueOps
    + SemaphoreOps
    + MutexOps
    + SpinlockOps
    + TimerOps
    + GpioOps
    + EventOps
    + Send
    + Sync
{
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Where GPIO interrupt handlers run.
    fn gpio_delivery(&self) -> DeliveryContext;

    /// Where event handlers run.
    fn event_delivery(&self) -> DeliveryContext;

    /// Stop backend-owned workers and release backend-level resources.
    ///
    /// Objects still referenced by handles stay valid for deletion.
    fn shutdown(&self) {}
}
