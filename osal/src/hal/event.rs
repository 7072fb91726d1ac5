//! Named event channel.
//!
//! The control layer reports co-processor state changes (station connected,
//! scan done, ...) by posting to an event base; the network stack subscribes
//! to the ids it cares about.

use alloc::sync::Arc;

use super::RawHandle;
use crate::status::OsResult;
use crate::timeout::Timeout;

/// Subscribe to every id of a base.
pub const ANY_EVENT_ID: i32 = -1;

/// Name of an event source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventBase(&'static str);

impl EventBase {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(&self) -> &'static str {
        self.0
    }
}

/// Wi-Fi connectivity events relayed from the co-processor.
pub const WIFI_EVENT: EventBase = EventBase::new("WIFI_EVENT");

/// Event ids posted under [`WIFI_EVENT`].
///
/// Values follow the co-processor's Wi-Fi event numbering.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i32)]
pub enum WifiEvent {
    Ready = 0,
    ScanDone = 1,
    StaStart = 2,
    StaStop = 3,
    StaConnected = 4,
    StaDisconnected = 5,
    ApStart = 12,
    ApStop = 13,
    ApStaConnected = 14,
    ApStaDisconnected = 15,
}

impl WifiEvent {
    pub const fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(WifiEvent::Ready),
            1 => Some(WifiEvent::ScanDone),
            2 => Some(WifiEvent::StaStart),
            3 => Some(WifiEvent::StaStop),
            4 => Some(WifiEvent::StaConnected),
            5 => Some(WifiEvent::StaDisconnected),
            12 => Some(WifiEvent::ApStart),
            13 => Some(WifiEvent::ApStop),
            14 => Some(WifiEvent::ApStaConnected),
            15 => Some(WifiEvent::ApStaDisconnected),
            _ => None,
        }
    }
}

/// One delivered event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Event<'a> {
    pub base: EventBase,
    pub id: i32,
    pub data: &'a [u8],
}

/// Event handler.
pub type EventHandler = Arc<dyn Fn(&Event<'_>) + Send + Sync>;

/// Event entries of the dispatch table.
pub trait EventOps {
    /// Register `handler` for `id` of `base` ([`ANY_EVENT_ID`] for all ids).
    fn event_subscribe(&self, base: EventBase, id: i32, handler: EventHandler)
    -> OsResult<RawHandle>;

    fn event_unsubscribe(&self, subscription: RawHandle) -> OsResult<()>;

    /// Post an event. `data` is copied. `timeout` bounds the wait for room
    /// on backends that buffer events.
    fn event_post(&self, base: EventBase, id: i32, data: &[u8], timeout: Timeout) -> OsResult<()>;
}

/// Whether a subscription to (`base`, `id`) receives `event`.
pub fn matches(base: EventBase, id: i32, event: &Event<'_>) -> bool {
    base == event.base && (id == ANY_EVENT_ID || id == event.id)
}
