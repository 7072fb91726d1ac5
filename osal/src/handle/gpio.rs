use alloc::sync::Arc;

use super::{Owned, kind::GpioPortKind};
use crate::adapter::Adapter;
use crate::hal::gpio::{
    GpioConfig, GpioIsr, GpioMode, GpioPin, GpioPortId, InterruptTrigger, PinLevel,
};
use crate::status::OsResult;

/// An open GPIO port. Closing it removes the interrupt handlers installed
/// through it.
pub type GpioPort = Owned<GpioPortKind>;

impl Adapter {
    /// Claim a GPIO port.
    pub fn gpio_port(&self, port: GpioPortId) -> OsResult<GpioPort> {
        GpioPort::create(self, |backend| backend.gpio_port_open(port))
    }
}

impl GpioPort {
    pub fn config(&self, pin: GpioPin, config: &GpioConfig) -> OsResult<()> {
        self.backend().gpio_config(self.raw()?, pin, config)
    }

    /// Configure with raw mode bits and default pull and trigger.
    pub fn set_mode_raw(&self, pin: GpioPin, mode: u32) -> OsResult<()> {
        self.config(pin, &GpioConfig::new(GpioMode::from_raw(mode)?))
    }

    pub fn read(&self, pin: GpioPin) -> OsResult<PinLevel> {
        self.backend().gpio_read(self.raw()?, pin)
    }

    pub fn write(&self, pin: GpioPin, level: PinLevel) -> OsResult<()> {
        self.backend().gpio_write(self.raw()?, pin, level)
    }

    /// Change the trigger of `pin`, replacing its handler if one is given.
    ///
    /// On failure the previous trigger and handler stay active.
    pub fn set_interrupt(
        &self,
        pin: GpioPin,
        trigger: InterruptTrigger,
        isr: Option<GpioIsr>,
    ) -> OsResult<()> {
        self.backend()
            .gpio_set_interrupt(self.raw()?, pin, trigger, isr)
    }

    /// Arm `trigger` on `pin` with `isr` as its handler.
    pub fn on_interrupt<F>(&self, pin: GpioPin, trigger: InterruptTrigger, isr: F) -> OsResult<()>
    where
        F: Fn(GpioPin) + Send + Sync + 'static,
    {
        self.set_interrupt(pin, trigger, Some(Arc::new(isr)))
    }

    /// [`set_interrupt`](Self::set_interrupt) with the control layer's raw
    /// trigger value; values at or past `InterruptTrigger::MAX` are `Invalid`.
    pub fn set_interrupt_raw(&self, pin: GpioPin, trigger: u32, isr: Option<GpioIsr>) -> OsResult<()> {
        self.set_interrupt(pin, InterruptTrigger::try_from(trigger)?, isr)
    }
}
