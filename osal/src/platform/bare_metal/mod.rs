//! Bare-metal backend
//!
//! For hosts without an RTOS: a single super-loop plus interrupt handlers.
//! The firmware supplies three pieces of hardware glue:
//!
//! - an [`IrqControl`] policy that masks interrupts around critical sections
//! - a [`TickSource`] counting microseconds
//! - a [`PinDriver`] over its GPIO registers
//!
//! There is no scheduler. Created "threads" are deferred entries that the
//! super-loop runs to completion with [`BareMetalBackend::run_pending_threads`].
//! Blocking calls spin against the tick source, so a forever-wait only ends
//! if an interrupt handler produces what the caller waits for.
//!
//! # Super-loop
//!
//! ```text
//! loop {
//!     backend.run_pending_threads();
//!     backend.poll_timers();
//! }
//!
//! gpio_isr() { backend.handle_gpio_interrupt(); }
//! ```
//!
//! # Delivery context
//!
//! - GPIO handlers run inside [`BareMetalBackend::handle_gpio_interrupt`],
//!   i.e. in interrupt context.
//! - Event handlers run synchronously inside `event_post` (caller context).

mod gpio;
mod sync;

use alloc::collections::VecDeque;
use core::alloc::Layout;
use core::ptr::NonNull;
use core::time::Duration;

use common::sync::{IrqControl, IrqSpinLock, SpinLock};
use log::{debug, info, trace};

use crate::hal::event::{Event, EventBase, EventHandler, EventOps, matches};
use crate::hal::gpio::PinDriver;
use crate::hal::memory::{HeapStats, MemCaps, MemoryOps};
use crate::hal::thread::{MIN_STACK_SIZE, ThreadEntry, ThreadOps, ThreadSpec};
use crate::hal::timer::{TickSource, TimerCallback, TimerMode, TimerOps};
use crate::hal::{Backend, DeliveryContext, RawHandle};
use crate::mem::accounting::HeapAccounting;
use crate::platform::objects::HandleTable;
use crate::status::{OsError, OsResult};
use crate::timeout::Timeout;

use gpio::PinBank;
use sync::SyncObjects;

/// Bare-metal backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BareMetalConfig {
    /// Heap budget shared by buffers and object control blocks.
    pub heap_size: usize,
}

impl Default for BareMetalConfig {
    fn default() -> Self {
        Self {
            heap_size: 64 * 1024,
        }
    }
}

impl BareMetalConfig {
    pub fn heap_size(mut self, bytes: usize) -> Self {
        self.heap_size = bytes;
        self
    }
}

struct DeferredThread {
    name: alloc::string::String,
    entry: SpinLock<Option<ThreadEntry>>,
}

struct SoftTimer {
    period: Duration,
    mode: TimerMode,
    callback: TimerCallback,
    /// Next expiry; `None` once a one-shot has fired or the next deadline
    /// would pass `Duration::MAX`.
    due: SpinLock<Option<Duration>>,
}

impl SoftTimer {
    /// Whether the timer expires at `now`, advancing it past `now` if so.
    fn expire(&self, now: Duration) -> bool {
        let mut due = self.due.lock();
        match *due {
            Some(at) if now >= at => {
                *due = match self.mode {
                    TimerMode::OneShot => None,
                    TimerMode::Periodic => {
                        // Missed periods are skipped, not queued. A deadline
                        // past the clock's range is never reached.
                        let mut next = at.checked_add(self.period);
                        while let Some(at) = next.filter(|&at| at <= now) {
                            next = at.checked_add(self.period);
                        }
                        next
                    }
                };
                true
            }
            _ => false,
        }
    }
}

struct Subscriber {
    base: EventBase,
    id: i32,
    handler: EventHandler,
}

/// Dispatch table for an interrupt-driven super-loop.
pub struct BareMetalBackend<I, T, P>
where
    I: IrqControl,
    T: TickSource,
    P: PinDriver,
{
    heap: HeapAccounting,
    clock: T,
    epoch: Duration,
    threads: HandleTable<DeferredThread, I>,
    run_list: IrqSpinLock<VecDeque<RawHandle>, I>,
    timers: HandleTable<SoftTimer, I>,
    sync: SyncObjects<I>,
    pins: PinBank<P, I>,
    subscribers: HandleTable<Subscriber, I>,
}

impl<I, T, P> BareMetalBackend<I, T, P>
where
    I: IrqControl,
    T: TickSource,
    P: PinDriver,
{
    pub fn new(config: BareMetalConfig, clock: T, pins: P) -> Self {
        info!(
            "bare-metal: heap {} bytes, {} pins",
            config.heap_size,
            pins.pin_count()
        );

        let epoch = clock.now();
        Self {
            heap: HeapAccounting::new(config.heap_size),
            clock,
            epoch,
            threads: HandleTable::new(),
            run_list: IrqSpinLock::new(VecDeque::new()),
            timers: HandleTable::new(),
            sync: SyncObjects::new(),
            pins: PinBank::new(pins),
            subscribers: HandleTable::new(),
        }
    }

    /// Run every deferred thread created so far to completion.
    ///
    /// Threads created while this runs are picked up in the same call.
    /// Returns how many entries ran.
    pub fn run_pending_threads(&self) -> usize {
        let mut ran = 0;
        loop {
            let Some(handle) = self.run_list.lock().pop_front() else {
                return ran;
            };
            // Deleted before it got to run.
            let Ok(thread) = self.threads.get(handle) else {
                continue;
            };
            let Some(entry) = thread.entry.lock().take() else {
                continue;
            };

            trace!("bare-metal: running {}", thread.name);
            entry();
            ran += 1;
        }
    }

    /// Fire every software timer that has expired. Returns how many fired.
    ///
    /// Callbacks run in the caller's context, one expiry per timer per call.
    pub fn poll_timers(&self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        for timer in self.timers.snapshot() {
            if timer.expire(now) {
                (timer.callback)();
                fired += 1;
            }
        }
        fired
    }

    /// Dispatch pending GPIO events; call from the host's GPIO interrupt.
    ///
    /// Returns how many handlers ran.
    pub fn handle_gpio_interrupt(&self) -> usize {
        self.pins.dispatch()
    }

    /// Spin until `attempt` succeeds on the state behind `lock` or `timeout`
    /// runs out on the tick source.
    fn block_on<S, R>(
        &self,
        lock: &IrqSpinLock<S, I>,
        timeout: Timeout,
        mut attempt: impl FnMut(&mut S) -> Option<R>,
    ) -> OsResult<R> {
        let start = self.clock.now();
        loop {
            if let Some(result) = attempt(&mut *lock.lock()) {
                return Ok(result);
            }
            if timeout.expired(start, self.clock.now()) {
                return Err(timeout.exhausted());
            }
            core::hint::spin_loop();
        }
    }
}

impl<I, T, P> MemoryOps for BareMetalBackend<I, T, P>
where
    I: IrqControl,
    T: TickSource,
    P: PinDriver,
{
    fn alloc(&self, layout: Layout, caps: MemCaps) -> Option<NonNull<u8>> {
        self.heap.alloc(layout, caps, false)
    }

    fn alloc_zeroed(&self, layout: Layout, caps: MemCaps) -> Option<NonNull<u8>> {
        self.heap.alloc(layout, caps, true)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout, caps: MemCaps) {
        // SAFETY: forwarded caller contract
        unsafe { self.heap.free(ptr, layout, caps) }
    }

    fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }
}

impl<I, T, P> ThreadOps for BareMetalBackend<I, T, P>
where
    I: IrqControl,
    T: TickSource,
    P: PinDriver,
{
    fn thread_create(&self, spec: &ThreadSpec, entry: ThreadEntry) -> OsResult<RawHandle> {
        if spec.stack_size < MIN_STACK_SIZE {
            return Err(OsError::Invalid);
        }

        // Deferred entries run on the super-loop stack; only the control
        // block is charged.
        let cost = core::mem::size_of::<DeferredThread>();
        let handle = self.threads.insert_with(&self.heap, cost, || {
            Ok(DeferredThread {
                name: spec.name.clone(),
                entry: SpinLock::new(Some(entry)),
            })
        })?;
        self.run_list.lock().push_back(handle);
        debug!("bare-metal: deferred thread {}", spec.name);
        Ok(handle)
    }

    fn thread_delete(&self, thread: RawHandle) -> OsResult<()> {
        self.threads.remove(&self.heap, thread).map(drop)
    }

    fn sleep(&self, duration: Duration) {
        self.clock
            .delay_us(duration.as_micros().min(u64::MAX as u128) as u64);
    }

    fn uptime(&self) -> Duration {
        self.clock.now().saturating_sub(self.epoch)
    }
}

impl<I, T, P> TimerOps for BareMetalBackend<I, T, P>
where
    I: IrqControl,
    T: TickSource,
    P: PinDriver,
{
    fn timer_start(
        &self,
        period: Duration,
        mode: TimerMode,
        callback: TimerCallback,
    ) -> OsResult<RawHandle> {
        if period.is_zero() {
            return Err(OsError::Invalid);
        }

        // `None` if the first expiry is past the clock's range: never fires.
        let due = self.clock.now().checked_add(period);
        let cost = core::mem::size_of::<SoftTimer>();
        self.timers.insert_with(&self.heap, cost, || {
            Ok(SoftTimer {
                period,
                mode,
                callback,
                due: SpinLock::new(due),
            })
        })
    }

    fn timer_stop(&self, timer: RawHandle) -> OsResult<()> {
        self.timers.remove(&self.heap, timer).map(drop)
    }
}

impl<I, T, P> EventOps for BareMetalBackend<I, T, P>
where
    I: IrqControl,
    T: TickSource,
    P: PinDriver,
{
    fn event_subscribe(
        &self,
        base: EventBase,
        id: i32,
        handler: EventHandler,
    ) -> OsResult<RawHandle> {
        let cost = core::mem::size_of::<Subscriber>();
        self.subscribers
            .insert_with(&self.heap, cost, || Ok(Subscriber { base, id, handler }))
    }

    fn event_unsubscribe(&self, subscription: RawHandle) -> OsResult<()> {
        self.subscribers.remove(&self.heap, subscription).map(drop)
    }

    /// Delivered before returning; nothing is buffered, so `timeout` is
    /// never consulted.
    fn event_post(&self, base: EventBase, id: i32, data: &[u8], _timeout: Timeout) -> OsResult<()> {
        let event = Event { base, id, data };
        for subscriber in self.subscribers.snapshot() {
            if matches(subscriber.base, subscriber.id, &event) {
                (subscriber.handler)(&event);
            }
        }
        Ok(())
    }
}

impl<I, T, P> Backend for BareMetalBackend<I, T, P>
where
    I: IrqControl,
    T: TickSource + Send + Sync,
    P: PinDriver,
{
    fn name(&self) -> &'static str {
        "bare-metal"
    }

    fn gpio_delivery(&self) -> DeliveryContext {
        DeliveryContext::Interrupt
    }

    fn event_delivery(&self) -> DeliveryContext {
        DeliveryContext::Caller
    }

    /// Discards deferred threads that have not run yet.
    fn shutdown(&self) {
        let dropped = core::mem::take(&mut *self.run_list.lock());
        if !dropped.is_empty() {
            debug!("bare-metal: {} deferred threads never ran", dropped.len());
        }
    }
}
