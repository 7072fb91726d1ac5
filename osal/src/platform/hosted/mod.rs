//! Hosted backend
//!
//! Runs the adapter on top of `std`: threads are OS threads, blocking
//! objects wait on condition variables, timers and event delivery get worker
//! threads. GPIO is a simulated pin bank whose inputs test code drives with
//! [`HostedBackend::drive_input`].
//!
//! # Delivery context
//!
//! - GPIO handlers run synchronously on the thread that changed the line,
//!   and follow interrupt rules: they must not block.
//! - Event handlers run on a dedicated dispatcher thread (task context),
//!   started on the first post.

mod events;
mod gpio;
mod sync;
mod threads;
mod wait;

use core::alloc::Layout;
use core::ptr::NonNull;
use std::time::Instant;

use log::info;

use crate::hal::gpio::{GpioPin, GpioPortId, PinLevel};
use crate::hal::memory::{HeapStats, MemCaps, MemoryOps};
use crate::hal::{Backend, DeliveryContext};
use crate::mem::accounting::HeapAccounting;
use crate::status::OsResult;

use events::EventHub;
use gpio::GpioBank;
use sync::SyncObjects;
use threads::{ThreadTable, TimerTable};

/// Hosted backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedConfig {
    /// Heap budget shared by buffers and object control blocks.
    pub heap_size: usize,
    /// Events buffered between posters and the dispatcher.
    pub event_queue_len: usize,
    /// Numbered GPIO ports, in addition to [`GpioPortId::DEFAULT`].
    pub gpio_ports: u32,
    /// Pins in every port.
    pub pins_per_port: GpioPin,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            heap_size: 512 * 1024,
            event_queue_len: 32,
            gpio_ports: 2,
            pins_per_port: 40,
        }
    }
}

impl HostedConfig {
    pub fn heap_size(mut self, bytes: usize) -> Self {
        self.heap_size = bytes;
        self
    }

    pub fn event_queue_len(mut self, len: usize) -> Self {
        self.event_queue_len = len;
        self
    }

    pub fn gpio_ports(mut self, ports: u32) -> Self {
        self.gpio_ports = ports;
        self
    }

    pub fn pins_per_port(mut self, pins: GpioPin) -> Self {
        self.pins_per_port = pins;
        self
    }
}

/// `std` implementation of every primitive family.
pub struct HostedBackend {
    heap: HeapAccounting,
    epoch: Instant,
    threads: ThreadTable,
    timers: TimerTable,
    sync: SyncObjects,
    gpio: GpioBank,
    events: EventHub,
}

impl HostedBackend {
    pub fn new(config: HostedConfig) -> Self {
        info!(
            "hosted: heap {} bytes, {} gpio ports of {} pins",
            config.heap_size, config.gpio_ports, config.pins_per_port
        );

        Self {
            heap: HeapAccounting::new(config.heap_size),
            epoch: Instant::now(),
            threads: ThreadTable::new(),
            timers: TimerTable::new(),
            sync: SyncObjects::new(),
            gpio: GpioBank::new(config.gpio_ports, config.pins_per_port),
            events: EventHub::new(config.event_queue_len),
        }
    }

    /// Drive an input line from outside, as external hardware would.
    ///
    /// Fires the pin's handler on the calling thread if its trigger matches.
    ///
    /// # Errors
    ///
    /// - `Invalid`: unknown port or pin, or the pin is a push-pull output
    pub fn drive_input(&self, port: GpioPortId, pin: GpioPin, level: PinLevel) -> OsResult<()> {
        self.gpio.drive_input(port, pin, level)
    }
}

impl Default for HostedBackend {
    fn default() -> Self {
        Self::new(HostedConfig::default())
    }
}

impl MemoryOps for HostedBackend {
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

impl Backend for HostedBackend {
    fn name(&self) -> &'static str {
        "hosted"
    }

    fn gpio_delivery(&self) -> DeliveryContext {
        DeliveryContext::Interrupt
    }

    fn event_delivery(&self) -> DeliveryContext {
        DeliveryContext::Task
    }

    fn shutdown(&self) {
        self.events.shutdown();
    }
}

impl Drop for HostedBackend {
    fn drop(&mut self) {
        self.events.shutdown();
        self.timers.stop_all();
    }
}
