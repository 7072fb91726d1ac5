use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use super::HostedBackend;
use super::wait::Waitable;
use crate::hal::RawHandle;
use crate::hal::event::{Event, EventBase, EventHandler, EventOps, matches};
use crate::platform::objects::HandleTable;
use crate::status::{OsError, OsResult};
use crate::timeout::Timeout;

struct Subscriber {
    base: EventBase,
    id: i32,
    handler: EventHandler,
}

struct Posted {
    base: EventBase,
    id: i32,
    data: Vec<u8>,
}

struct Backlog {
    pending: VecDeque<Posted>,
    capacity: usize,
    closed: bool,
}

struct Shared {
    subscribers: HandleTable<Subscriber>,
    backlog: Waitable<Backlog>,
}

impl Shared {
    fn next(&self) -> Option<Posted> {
        self.backlog
            .wait_for(Timeout::Forever, |backlog| match backlog.pending.pop_front() {
                Some(posted) => Some(Some(posted)),
                None if backlog.closed => Some(None),
                None => None,
            })
            .ok()
            .flatten()
    }

    fn dispatch(&self) {
        while let Some(posted) = self.next() {
            let event = Event {
                base: posted.base,
                id: posted.id,
                data: &posted.data,
            };
            for subscriber in self.subscribers.snapshot() {
                if matches(subscriber.base, subscriber.id, &event) {
                    (subscriber.handler)(&event);
                }
            }
        }
        debug!("hosted: event dispatcher stopped");
    }
}

/// Event subscriptions plus the dispatcher that delivers posted events.
pub(super) struct EventHub {
    shared: Arc<Shared>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl EventHub {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                subscribers: HandleTable::new(),
                backlog: Waitable::new(Backlog {
                    pending: VecDeque::with_capacity(capacity),
                    capacity: capacity.max(1),
                    closed: false,
                }),
            }),
            dispatcher: Mutex::new(None),
        }
    }

    fn ensure_dispatcher(&self) -> OsResult<()> {
        let mut dispatcher = self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner);
        if dispatcher.is_some() {
            return Ok(());
        }

        let shared = self.shared.clone();
        let worker = thread::Builder::new()
            .name("osal-events".into())
            .spawn(move || shared.dispatch())
            .map_err(|err| {
                warn!("hosted: event dispatcher failed to start: {}", err);
                OsError::Fail
            })?;
        *dispatcher = Some(worker);
        Ok(())
    }

    /// Deliver what is already queued, then stop the dispatcher.
    pub(super) fn shutdown(&self) {
        self.shared.backlog.update(|backlog| backlog.closed = true);

        let worker = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker
            && worker.thread().id() != thread::current().id()
            && worker.join().is_err()
        {
            warn!("hosted: event handler panicked");
        }
    }
}

impl EventOps for HostedBackend {
    fn event_subscribe(
        &self,
        base: EventBase,
        id: i32,
        handler: EventHandler,
    ) -> OsResult<RawHandle> {
        let cost = core::mem::size_of::<Subscriber>();
        self.events
            .shared
            .subscribers
            .insert_with(&self.heap, cost, || Ok(Subscriber { base, id, handler }))
    }

    fn event_unsubscribe(&self, subscription: RawHandle) -> OsResult<()> {
        self.events
            .shared
            .subscribers
            .remove(&self.heap, subscription)
            .map(drop)
    }

    fn event_post(&self, base: EventBase, id: i32, data: &[u8], timeout: Timeout) -> OsResult<()> {
        if self.events.shared.backlog.lock().closed {
            return Err(OsError::Fail);
        }
        self.events.ensure_dispatcher()?;

        let mut posted = Some(Posted {
            base,
            id,
            data: data.to_vec(),
        });
        self.events.shared.backlog.wait_for(timeout, |backlog| {
            if backlog.closed {
                return Some(Err(OsError::Fail));
            }
            if backlog.pending.len() >= backlog.capacity {
                return None;
            }
            backlog.pending.extend(posted.take());
            Some(Ok(()))
        })?
    }
}
