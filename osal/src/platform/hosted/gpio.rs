use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use super::HostedBackend;
use crate::hal::RawHandle;
use crate::hal::gpio::{
    GpioConfig, GpioIsr, GpioMode, GpioOps, GpioPin, GpioPortId, InterruptTrigger, PinLevel,
    PullMode, check_trigger,
};
use crate::platform::objects::HandleTable;
use crate::status::{OsError, OsResult};

#[derive(Clone, Default)]
struct SimPin {
    config: GpioConfig,
    level: PinLevel,
    isr: Option<GpioIsr>,
}

/// One simulated pin bank.
struct SimPort {
    id: GpioPortId,
    claimed: AtomicBool,
    pins: Mutex<Vec<SimPin>>,
}

impl SimPort {
    fn new(id: GpioPortId, pins: GpioPin) -> Self {
        Self {
            id,
            claimed: AtomicBool::new(false),
            pins: Mutex::new(vec![SimPin::default(); pins as usize]),
        }
    }

    fn pins(&self) -> MutexGuard<'_, Vec<SimPin>> {
        self.pins.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_pin<R>(&self, pin: GpioPin, f: impl FnOnce(&mut SimPin) -> OsResult<R>) -> OsResult<R> {
        let mut pins = self.pins();
        let pin = pins.get_mut(pin as usize).ok_or(OsError::Invalid)?;
        f(pin)
    }

    /// Move a line to `level` and run its handler if the trigger matches.
    ///
    /// The handler runs after the pin table is unlocked, so it may call back
    /// into the port.
    fn set_line(&self, pin: GpioPin, level: PinLevel) -> OsResult<()> {
        let isr = self.with_pin(pin, |state| {
            let old = state.level;
            state.level = level;
            let fires = state.config.mode.contains(GpioMode::INPUT)
                && state.config.trigger.fires(old, level);
            Ok(if fires { state.isr.clone() } else { None })
        })?;

        if let Some(isr) = isr {
            isr(pin);
        }
        Ok(())
    }
}

pub(super) struct GpioBank {
    ports: BTreeMap<GpioPortId, Arc<SimPort>>,
    open: HandleTable<Arc<SimPort>>,
}

impl GpioBank {
    pub(super) fn new(ports: u32, pins_per_port: GpioPin) -> Self {
        let ports = core::iter::once(GpioPortId::DEFAULT)
            .chain((0..ports).map(GpioPortId))
            .map(|id| (id, Arc::new(SimPort::new(id, pins_per_port))))
            .collect();

        Self {
            ports,
            open: HandleTable::new(),
        }
    }

    fn port(&self, id: GpioPortId) -> OsResult<&Arc<SimPort>> {
        self.ports.get(&id).ok_or(OsError::Invalid)
    }

    pub(super) fn drive_input(&self, id: GpioPortId, pin: GpioPin, level: PinLevel) -> OsResult<()> {
        let port = self.port(id)?;
        port.with_pin(pin, |state| {
            let mode = state.config.mode;
            if mode.contains(GpioMode::OUTPUT) && !mode.contains(GpioMode::OD) {
                return Err(OsError::Invalid);
            }
            Ok(())
        })?;
        port.set_line(pin, level)
    }
}

impl GpioOps for HostedBackend {
    fn gpio_port_open(&self, port: GpioPortId) -> OsResult<RawHandle> {
        let sim = self.gpio.port(port)?.clone();
        if sim.claimed.swap(true, Ordering::AcqRel) {
            warn!("hosted: gpio port {:?} already open", port);
            return Err(OsError::Invalid);
        }

        let cost = core::mem::size_of::<SimPort>();
        let opened = self
            .gpio
            .open
            .insert_with(&self.heap, cost, || Ok(sim.clone()));
        if opened.is_err() {
            sim.claimed.store(false, Ordering::Release);
        }
        opened
    }

    fn gpio_port_close(&self, port: RawHandle) -> OsResult<()> {
        let sim = self.gpio.open.remove(&self.heap, port)?;
        for pin in sim.pins().iter_mut() {
            pin.isr = None;
        }
        sim.claimed.store(false, Ordering::Release);
        debug!("hosted: gpio port {:?} closed", sim.id);
        Ok(())
    }

    fn gpio_config(&self, port: RawHandle, pin: GpioPin, config: &GpioConfig) -> OsResult<()> {
        if let Err(err) = config.validate() {
            warn!("hosted: rejected config for pin {}: {}", pin, err);
            return Err(err);
        }

        let sim = self.gpio.open.get(port)?;
        sim.with_pin(pin, |state| {
            state.config = *config;
            if !config.mode.contains(GpioMode::OUTPUT) {
                match config.pull {
                    PullMode::Up => state.level = PinLevel::High,
                    PullMode::Down => state.level = PinLevel::Low,
                    PullMode::None => {}
                }
            }
            Ok(())
        })
    }

    fn gpio_read(&self, port: RawHandle, pin: GpioPin) -> OsResult<PinLevel> {
        self.gpio.open.get(port)?.with_pin(pin, |state| {
            if !state.config.mode.contains(GpioMode::INPUT) {
                return Err(OsError::Invalid);
            }
            Ok(state.level)
        })
    }

    fn gpio_write(&self, port: RawHandle, pin: GpioPin, level: PinLevel) -> OsResult<()> {
        let sim = self.gpio.open.get(port)?;
        sim.with_pin(pin, |state| {
            if !state.config.mode.contains(GpioMode::OUTPUT) {
                return Err(OsError::Invalid);
            }
            Ok(())
        })?;
        sim.set_line(pin, level)
    }

    fn gpio_set_interrupt(
        &self,
        port: RawHandle,
        pin: GpioPin,
        trigger: InterruptTrigger,
        isr: Option<GpioIsr>,
    ) -> OsResult<()> {
        self.gpio.open.get(port)?.with_pin(pin, |state| {
            if let Err(err) = check_trigger(state.config.mode, trigger) {
                warn!("hosted: pin {} cannot arm {:?}", pin, trigger);
                return Err(err);
            }
            state.config.trigger = trigger;
            if let Some(isr) = isr {
                state.isr = Some(isr);
            }
            Ok(())
        })
    }
}
