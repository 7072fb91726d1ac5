use alloc::sync::Arc;

use super::{Owned, kind::SubscriptionKind};
use crate::adapter::Adapter;
use crate::hal::event::{Event, EventBase, WifiEvent, WIFI_EVENT};
use crate::status::OsResult;
use crate::timeout::Timeout;

/// A registered event handler. Dropping it unsubscribes.
pub type Subscription = Owned<SubscriptionKind>;

impl Adapter {
    /// Call `handler` for events `id` of `base`
    /// ([`ANY_EVENT_ID`](crate::hal::event::ANY_EVENT_ID) for all).
    pub fn subscribe<F>(&self, base: EventBase, id: i32, handler: F) -> OsResult<Subscription>
    where
        F: Fn(&Event<'_>) + Send + Sync + 'static,
    {
        Subscription::create(self, |backend| {
            backend.event_subscribe(base, id, Arc::new(handler))
        })
    }

    /// Post an event; `data` is copied.
    pub fn post(&self, base: EventBase, id: i32, data: &[u8], timeout: Timeout) -> OsResult<()> {
        self.backend().event_post(base, id, data, timeout)
    }

    /// Post a Wi-Fi event under [`WIFI_EVENT`].
    pub fn post_wifi(&self, event: WifiEvent, data: &[u8], timeout: Timeout) -> OsResult<()> {
        self.post(WIFI_EVENT, event.id(), data, timeout)
    }
}
