use alloc::vec;
use alloc::vec::Vec;

use common::sync::{IrqControl, IrqSpinLock};
use log::{debug, warn};

use super::BareMetalBackend;
use crate::hal::RawHandle;
use crate::hal::gpio::{
    GpioConfig, GpioIsr, GpioMode, GpioOps, GpioPin, GpioPortId, InterruptTrigger, PinDriver,
    PinLevel, check_trigger,
};
use crate::hal::timer::TickSource;
use crate::status::{OsError, OsResult};

/// The only port handle: bare-metal hosts expose one flat pin space.
const PORT_TOKEN: usize = 1;

struct Pins<P> {
    driver: P,
    claimed: bool,
    configs: Vec<GpioConfig>,
    handlers: Vec<Option<GpioIsr>>,
}

impl<P: PinDriver> Pins<P> {
    fn index(&self, pin: GpioPin) -> OsResult<usize> {
        if pin < self.driver.pin_count() {
            Ok(pin as usize)
        } else {
            Err(OsError::Invalid)
        }
    }
}

pub(super) struct PinBank<P, I: IrqControl> {
    pins: IrqSpinLock<Pins<P>, I>,
}

impl<P: PinDriver, I: IrqControl> PinBank<P, I> {
    pub(super) fn new(driver: P) -> Self {
        let count = driver.pin_count() as usize;
        Self {
            pins: IrqSpinLock::new(Pins {
                driver,
                claimed: false,
                configs: vec![GpioConfig::default(); count],
                handlers: vec![None; count],
            }),
        }
    }

    fn check_port(&self, port: RawHandle) -> OsResult<()> {
        if port.as_raw() == PORT_TOKEN && self.pins.lock().claimed {
            Ok(())
        } else {
            Err(OsError::Invalid)
        }
    }

    /// Acknowledge pending pin events and run their handlers.
    ///
    /// Handlers run after the pin state is unlocked.
    pub(super) fn dispatch(&self) -> usize {
        let fired: Vec<(GpioPin, GpioIsr)> = {
            let mut pins = self.pins.lock();
            let mut fired = Vec::new();
            for pin in 0..pins.driver.pin_count() {
                if !pins.driver.event_pending(pin) {
                    continue;
                }
                pins.driver.clear_event(pin);
                if let Some(isr) = &pins.handlers[pin as usize] {
                    fired.push((pin, isr.clone()));
                }
            }
            fired
        };

        for (pin, isr) in &fired {
            isr(*pin);
        }
        fired.len()
    }
}

impl<I, T, P> GpioOps for BareMetalBackend<I, T, P>
where
    I: IrqControl,
    T: TickSource,
    P: PinDriver,
{
    fn gpio_port_open(&self, port: GpioPortId) -> OsResult<RawHandle> {
        if port != GpioPortId::DEFAULT {
            return Err(OsError::Invalid);
        }

        let mut pins = self.pins.pins.lock();
        if pins.claimed {
            return Err(OsError::Invalid);
        }
        pins.claimed = true;
        RawHandle::from_raw(PORT_TOKEN).ok_or(OsError::Fail)
    }

    fn gpio_port_close(&self, port: RawHandle) -> OsResult<()> {
        self.pins.check_port(port)?;
        let mut pins = self.pins.pins.lock();
        pins.claimed = false;
        pins.handlers.iter_mut().for_each(|isr| *isr = None);
        debug!("bare-metal: gpio port closed");
        Ok(())
    }

    fn gpio_config(&self, port: RawHandle, pin: GpioPin, config: &GpioConfig) -> OsResult<()> {
        self.pins.check_port(port)?;
        if let Err(err) = config.validate() {
            warn!("bare-metal: rejected config for pin {}: {}", pin, err);
            return Err(err);
        }

        let mut pins = self.pins.pins.lock();
        let index = pins.index(pin)?;
        let previous = pins.configs[index];

        pins.driver.configure(pin, config.mode, config.pull)?;
        if let Err(err) = pins.driver.set_trigger(pin, config.trigger) {
            // Put the line back the way it was.
            if let Err(rollback) = pins.driver.configure(pin, previous.mode, previous.pull) {
                warn!(
                    "bare-metal: pin {} left half-configured, rollback failed: {}",
                    pin, rollback
                );
            }
            return Err(err);
        }
        pins.configs[index] = *config;
        Ok(())
    }

    fn gpio_read(&self, port: RawHandle, pin: GpioPin) -> OsResult<PinLevel> {
        self.pins.check_port(port)?;
        let pins = self.pins.pins.lock();
        let index = pins.index(pin)?;
        if !pins.configs[index].mode.contains(GpioMode::INPUT) {
            return Err(OsError::Invalid);
        }
        pins.driver.read(pin)
    }

    fn gpio_write(&self, port: RawHandle, pin: GpioPin, level: PinLevel) -> OsResult<()> {
        self.pins.check_port(port)?;
        let mut pins = self.pins.pins.lock();
        let index = pins.index(pin)?;
        if !pins.configs[index].mode.contains(GpioMode::OUTPUT) {
            return Err(OsError::Invalid);
        }
        pins.driver.set_level(pin, level)
    }

    fn gpio_set_interrupt(
        &self,
        port: RawHandle,
        pin: GpioPin,
        trigger: InterruptTrigger,
        isr: Option<GpioIsr>,
    ) -> OsResult<()> {
        self.pins.check_port(port)?;
        let mut pins = self.pins.pins.lock();
        let index = pins.index(pin)?;
        if let Err(err) = check_trigger(pins.configs[index].mode, trigger) {
            warn!("bare-metal: pin {} cannot arm {:?}", pin, trigger);
            return Err(err);
        }

        pins.driver.set_trigger(pin, trigger)?;
        pins.configs[index].trigger = trigger;
        if let Some(isr) = isr {
            pins.handlers[index] = Some(isr);
        }
        Ok(())
    }
}
