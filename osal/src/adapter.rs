//! The capability dispatch table.
//!
//! An [`Adapter`] is the only path from the driver core to the host OS. It
//! is cheap to clone and immutable, so components take their own copy at
//! construction. Code that cannot be handed one can use the process-wide
//! binding ([`bind`] / [`bound`]), which is set exactly once.

use alloc::sync::Arc;
use core::fmt;

use log::{debug, info};
use spin::Once;

use crate::hal::Backend;
use crate::status::{OsError, OsResult};

/// Dispatch table over one concrete backend.
#[derive(Clone)]
pub struct Adapter {
    backend: Arc<dyn Backend>,
}

impl Adapter {
    pub fn new<B: Backend + 'static>(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn Backend>) -> Self {
        debug!("adapter: created over {} backend", backend.name());
        Self { backend }
    }

    /// The backend every entry dispatches to.
    #[inline]
    pub fn backend(&self) -> &dyn Backend {
        &*self.backend
    }

    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    /// Stop backend workers. Handles still alive may be destroyed afterwards.
    pub fn shutdown(&self) {
        info!("adapter: shutting down {} backend", self.name());
        self.backend.shutdown();
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("backend", &self.name())
            .finish()
    }
}

static BOUND: Once<Adapter> = Once::new();

/// Bind the process-wide adapter.
///
/// # Errors
///
/// - `Invalid`: an adapter is already bound; the binding is never replaced
pub fn bind(adapter: Adapter) -> OsResult<&'static Adapter> {
    let mut fresh = false;
    let bound = BOUND.call_once(|| {
        fresh = true;
        adapter
    });

    if fresh {
        info!("adapter: bound {} backend", bound.name());
        Ok(bound)
    } else {
        Err(OsError::Invalid)
    }
}

/// The process-wide adapter, if [`bind`] has run.
pub fn bound() -> OsResult<&'static Adapter> {
    BOUND.get().ok_or(OsError::Fail)
}

/// Bind a hosted backend with default configuration.
#[cfg(feature = "hosted")]
pub fn bind_default() -> OsResult<&'static Adapter> {
    use crate::platform::hosted::{HostedBackend, HostedConfig};

    bind(Adapter::new(HostedBackend::new(HostedConfig::default())))
}
