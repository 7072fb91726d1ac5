//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ::common::sync::NoIrq;
use hosted_osal::hal::gpio::{GpioMode, GpioPin, InterruptTrigger, PinDriver, PinLevel, PullMode};
use hosted_osal::hal::timer::TickSource;
use hosted_osal::platform::bare_metal::{BareMetalBackend, BareMetalConfig};
use hosted_osal::platform::hosted::{HostedBackend, HostedConfig};
use hosted_osal::{Adapter, OsError, OsResult};

/// Hosted backend with a small heap, plus an adapter over it.
pub fn hosted(heap_size: usize) -> (Arc<HostedBackend>, Adapter) {
    let backend = Arc::new(HostedBackend::new(
        HostedConfig::default().heap_size(heap_size),
    ));
    let adapter = Adapter::from_arc(backend.clone());
    (backend, adapter)
}

/// Shared counter for callbacks.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Microsecond clock under test control.
///
/// With a non-zero `step`, every read advances the clock, so spinning waits
/// make progress without a real timer.
#[derive(Clone)]
pub struct FakeClock {
    now: Arc<AtomicU64>,
    step: u64,
}

impl FakeClock {
    pub fn manual() -> Self {
        Self::stepping(0)
    }

    pub fn stepping(step_us: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(0)),
            step: step_us,
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now.fetch_add(ms * 1000, Ordering::SeqCst);
    }
}

impl TickSource for FakeClock {
    fn now_us(&self) -> u64 {
        self.now.fetch_add(self.step, Ordering::SeqCst)
    }
}

#[derive(Default)]
struct PinState {
    modes: Vec<GpioMode>,
    levels: Vec<PinLevel>,
    triggers: Vec<InterruptTrigger>,
    pending: Vec<bool>,
    refuse_triggers: bool,
    /// Remaining `configure` calls that succeed; unlimited if `None`.
    configure_budget: Option<usize>,
}

/// Pin controller whose inputs the test drives.
#[derive(Clone)]
pub struct FakePins {
    state: Arc<Mutex<PinState>>,
    count: GpioPin,
}

impl FakePins {
    pub fn new(count: GpioPin) -> Self {
        let n = count as usize;
        Self {
            state: Arc::new(Mutex::new(PinState {
                modes: vec![GpioMode::DISABLE; n],
                levels: vec![PinLevel::Low; n],
                triggers: vec![InterruptTrigger::Disable; n],
                pending: vec![false; n],
                refuse_triggers: false,
                configure_budget: None,
            })),
            count,
        }
    }

    /// Drive an input line, latching an event if its trigger matches.
    pub fn drive(&self, pin: GpioPin, level: PinLevel) {
        let mut state = self.state.lock().unwrap();
        let pin = pin as usize;
        let old = state.levels[pin];
        state.levels[pin] = level;
        if state.triggers[pin].fires(old, level) {
            state.pending[pin] = true;
        }
    }

    pub fn trigger(&self, pin: GpioPin) -> InterruptTrigger {
        self.state.lock().unwrap().triggers[pin as usize]
    }

    pub fn level(&self, pin: GpioPin) -> PinLevel {
        self.state.lock().unwrap().levels[pin as usize]
    }

    pub fn mode(&self, pin: GpioPin) -> GpioMode {
        self.state.lock().unwrap().modes[pin as usize]
    }

    /// Make `set_trigger` fail with `Fail`.
    pub fn refuse_triggers(&self) {
        self.state.lock().unwrap().refuse_triggers = true;
    }

    /// Let only the next `calls` calls to `configure` succeed.
    pub fn limit_configure(&self, calls: usize) {
        self.state.lock().unwrap().configure_budget = Some(calls);
    }
}

impl PinDriver for FakePins {
    fn pin_count(&self) -> GpioPin {
        self.count
    }

    fn configure(&mut self, pin: GpioPin, mode: GpioMode, _pull: PullMode) -> OsResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(budget) = state.configure_budget.as_mut() {
            if *budget == 0 {
                return Err(OsError::Fail);
            }
            *budget -= 1;
        }
        *state.modes.get_mut(pin as usize).ok_or(OsError::Invalid)? = mode;
        Ok(())
    }

    fn read(&self, pin: GpioPin) -> OsResult<PinLevel> {
        let state = self.state.lock().unwrap();
        state.levels.get(pin as usize).copied().ok_or(OsError::Invalid)
    }

    fn set_level(&mut self, pin: GpioPin, level: PinLevel) -> OsResult<()> {
        let mut state = self.state.lock().unwrap();
        *state.levels.get_mut(pin as usize).ok_or(OsError::Invalid)? = level;
        Ok(())
    }

    fn set_trigger(&mut self, pin: GpioPin, trigger: InterruptTrigger) -> OsResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_triggers {
            return Err(OsError::Fail);
        }
        *state.triggers.get_mut(pin as usize).ok_or(OsError::Invalid)? = trigger;
        Ok(())
    }

    fn event_pending(&self, pin: GpioPin) -> bool {
        self.state.lock().unwrap().pending[pin as usize]
    }

    fn clear_event(&mut self, pin: GpioPin) {
        self.state.lock().unwrap().pending[pin as usize] = false;
    }
}

pub type TestBareMetal = BareMetalBackend<NoIrq, FakeClock, FakePins>;

/// Bare-metal backend over fake hardware, plus handles to that hardware.
pub fn bare_metal(
    heap_size: usize,
    clock: FakeClock,
) -> (Arc<TestBareMetal>, Adapter, FakeClock, FakePins) {
    let pins = FakePins::new(8);
    let backend = Arc::new(BareMetalBackend::new(
        BareMetalConfig::default().heap_size(heap_size),
        clock.clone(),
        pins.clone(),
    ));
    let adapter = Adapter::from_arc(backend.clone());
    (backend, adapter, clock, pins)
}
