//! Owning resource handles.
//!
//! Every OS object the driver core creates is held through an [`Owned`]
//! handle. Creation goes through the adapter and either yields a live handle
//! or an error, never a half-built one. Destruction happens exactly once:
//! explicitly with [`Owned::destroy`] / [`destroy`], or on drop.
//!
//! Handles are not `Clone`. Components that share an object borrow it.

mod event;
mod gpio;
mod mutex;
mod queue;
mod semaphore;
mod spinlock;
mod thread;
mod timer;

pub use event::Subscription;
pub use gpio::GpioPort;
pub use mutex::{Mutex, MutexGuard};
pub use queue::Queue;
pub use semaphore::Semaphore;
pub use spinlock::{Spinlock, SpinlockGuard};
pub use thread::Thread;
pub use timer::Timer;

use core::fmt;
use core::marker::PhantomData;

use log::{error, trace, warn};

use crate::adapter::Adapter;
use crate::hal::{Backend, RawHandle};
use crate::status::{OsError, OsResult};

/// One kind of backend object.
pub trait HandleKind {
    /// Name used in log messages.
    const NAME: &'static str;

    /// The dispatch entry that destroys an object of this kind.
    fn release(backend: &dyn Backend, raw: RawHandle) -> OsResult<()>;
}

macro_rules! handle_kinds {
    ($($(#[$meta:meta])* $kind:ident => $name:literal, $release:ident;)*) => {
        /// Marker types naming each kind of backend object.
        pub mod kind {
            use super::{HandleKind, OsResult};
            use crate::hal::{Backend, RawHandle};

            $(
                $(#[$meta])*
                #[derive(Debug)]
                pub enum $kind {}

                impl HandleKind for $kind {
                    const NAME: &'static str = $name;

                    fn release(backend: &dyn Backend, raw: RawHandle) -> OsResult<()> {
                        backend.$release(raw)
                    }
                }
            )*
        }
    };
}

handle_kinds! {
    ThreadKind => "thread", thread_delete;
    QueueKind => "queue", queue_delete;
    SemaphoreKind => "semaphore", semaphore_delete;
    MutexKind => "mutex", mutex_delete;
    SpinlockKind => "spinlock", spinlock_delete;
    /// Stopping a timer also releases it.
    TimerKind => "timer", timer_stop;
    GpioPortKind => "gpio port", gpio_port_close;
    SubscriptionKind => "event subscription", event_unsubscribe;
}

/// A live backend object of kind `K`, destroyed on drop.
pub struct Owned<K: HandleKind> {
    adapter: Adapter,
    raw: Option<RawHandle>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> Owned<K> {
    /// Run a creation entry and take ownership of what it returns.
    ///
    /// A failure is logged with the resource name and handed back unchanged.
    pub(crate) fn create(
        adapter: &Adapter,
        create: impl FnOnce(&dyn Backend) -> OsResult<RawHandle>,
    ) -> OsResult<Self> {
        match create(adapter.backend()) {
            Ok(raw) => {
                trace!("{} created: {:?}", K::NAME, raw);
                Ok(Self {
                    adapter: adapter.clone(),
                    raw: Some(raw),
                    _kind: PhantomData,
                })
            }
            Err(err) => {
                error!("{} creation failed: {}", K::NAME, err);
                Err(err)
            }
        }
    }

    /// The backend token, or `Invalid` once destroyed.
    pub fn raw(&self) -> OsResult<RawHandle> {
        self.raw.ok_or(OsError::Invalid)
    }

    pub fn is_live(&self) -> bool {
        self.raw.is_some()
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.adapter.backend()
    }

    /// Destroy the object now and clear the handle.
    ///
    /// The handle is cleared even if the backend reports an error. Destroying
    /// a cleared handle is a no-op that succeeds.
    pub fn destroy(&mut self) -> OsResult<()> {
        let Some(raw) = self.raw.take() else {
            return Ok(());
        };
        trace!("{} destroyed: {:?}", K::NAME, raw);
        K::release(self.adapter.backend(), raw)
    }
}

impl<K: HandleKind> Drop for Owned<K> {
    fn drop(&mut self) {
        if let Err(err) = self.destroy() {
            warn!("{} destroy on drop failed: {}", K::NAME, err);
        }
    }
}

impl<K: HandleKind> fmt::Debug for Owned<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(K::NAME)
            .field("raw", &self.raw)
            .field("backend", &self.adapter.name())
            .finish()
    }
}

/// Values that own something the backend must release.
pub trait Destroy {
    /// Release the resource, reporting the backend's verdict.
    fn destroy(self) -> OsResult<()>;
}

impl<K: HandleKind> Destroy for Owned<K> {
    fn destroy(mut self) -> OsResult<()> {
        Owned::destroy(&mut self)
    }
}

/// Destroy whatever `slot` holds and leave it empty.
///
/// An empty slot is a no-op that succeeds, so teardown paths can call this
/// unconditionally.
pub fn destroy<T: Destroy>(slot: &mut Option<T>) -> OsResult<()> {
    match slot.take() {
        Some(resource) => resource.destroy(),
        None => Ok(()),
    }
}
