//! GPIO (General Purpose Input/Output) interface.
//!
//! A line's drive mode and its interrupt trigger are configured orthogonally:
//! [`GpioMode`] is a bit set, [`InterruptTrigger`] a separate enumeration.
//! Both keep the numeric values the co-processor protocol uses.

use alloc::sync::Arc;

use super::RawHandle;
use crate::status::{OsError, OsResult};

/// Pin number within a port.
pub type GpioPin = u8;

/// Interrupt handler, called with the pin that fired.
pub type GpioIsr = Arc<dyn Fn(GpioPin) + Send + Sync>;

/// Pin logic level.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PinLevel {
    /// Logic low (0V or ground).
    #[default]
    Low,
    /// Logic high (VDD).
    High,
}

impl From<bool> for PinLevel {
    fn from(value: bool) -> Self {
        if value { PinLevel::High } else { PinLevel::Low }
    }
}

impl From<PinLevel> for bool {
    fn from(level: PinLevel) -> bool {
        matches!(level, PinLevel::High)
    }
}

/// Internal pull resistor configuration.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PullMode {
    /// No pull resistor (high impedance).
    #[default]
    None,
    /// Enable internal pull-up resistor.
    Up,
    /// Enable internal pull-down resistor.
    Down,
}

bitflags::bitflags! {
    /// GPIO drive mode.
    ///
    /// `DISABLE` is the empty set. Composite modes are unions of the three
    /// independent bits.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct GpioMode: u32 {
        const INPUT = 1 << 0;
        const OUTPUT = 1 << 1;
        /// Open-drain output stage; only meaningful with `OUTPUT`.
        const OD = 1 << 2;

        const OUTPUT_OD = Self::OUTPUT.bits() | Self::OD.bits();
        const INPUT_OUTPUT = Self::INPUT.bits() | Self::OUTPUT.bits();
        const INPUT_OUTPUT_OD = Self::INPUT.bits() | Self::OUTPUT.bits() | Self::OD.bits();
    }
}

impl GpioMode {
    /// Input and output disabled.
    pub const DISABLE: GpioMode = GpioMode::empty();

    /// Decode raw mode bits, rejecting unknown bits and open-drain without
    /// output.
    pub fn from_raw(raw: u32) -> OsResult<Self> {
        let mode = GpioMode::from_bits(raw).ok_or(OsError::Invalid)?;
        mode.validate()?;
        Ok(mode)
    }

    fn validate(self) -> OsResult<()> {
        if self.contains(GpioMode::OD) && !self.contains(GpioMode::OUTPUT) {
            return Err(OsError::Invalid);
        }
        Ok(())
    }
}

impl Default for GpioMode {
    fn default() -> Self {
        GpioMode::DISABLE
    }
}

/// What makes a GPIO line raise an interrupt.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum InterruptTrigger {
    #[default]
    Disable = 0,
    /// Low-to-high transition.
    RisingEdge = 1,
    /// High-to-low transition.
    FallingEdge = 2,
    /// Any transition.
    AnyEdge = 3,
    /// While the line is low.
    LowLevel = 4,
    /// While the line is high.
    HighLevel = 5,
}

impl InterruptTrigger {
    /// First raw value that is not a trigger.
    pub const MAX: u32 = 6;

    /// Whether moving from `old` to `new` (or staying at `new`) fires.
    pub fn fires(self, old: PinLevel, new: PinLevel) -> bool {
        match self {
            InterruptTrigger::Disable => false,
            InterruptTrigger::RisingEdge => old == PinLevel::Low && new == PinLevel::High,
            InterruptTrigger::FallingEdge => old == PinLevel::High && new == PinLevel::Low,
            InterruptTrigger::AnyEdge => old != new,
            InterruptTrigger::LowLevel => new == PinLevel::Low,
            InterruptTrigger::HighLevel => new == PinLevel::High,
        }
    }
}

impl TryFrom<u32> for InterruptTrigger {
    type Error = OsError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(InterruptTrigger::Disable),
            1 => Ok(InterruptTrigger::RisingEdge),
            2 => Ok(InterruptTrigger::FallingEdge),
            3 => Ok(InterruptTrigger::AnyEdge),
            4 => Ok(InterruptTrigger::LowLevel),
            5 => Ok(InterruptTrigger::HighLevel),
            _ => Err(OsError::Invalid),
        }
    }
}

/// Full configuration of one GPIO line.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct GpioConfig {
    pub mode: GpioMode,
    pub pull: PullMode,
    pub trigger: InterruptTrigger,
}

impl GpioConfig {
    pub fn new(mode: GpioMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn pull(mut self, pull: PullMode) -> Self {
        self.pull = pull;
        self
    }

    pub fn trigger(mut self, trigger: InterruptTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Check that the mode is consistent and that an armed trigger has an
    /// input to watch.
    pub fn validate(&self) -> OsResult<()> {
        self.mode.validate()?;
        check_trigger(self.mode, self.trigger)
    }
}

/// An interrupt trigger other than `Disable` needs the input stage enabled.
pub fn check_trigger(mode: GpioMode, trigger: InterruptTrigger) -> OsResult<()> {
    if trigger != InterruptTrigger::Disable && !mode.contains(GpioMode::INPUT) {
        return Err(OsError::Invalid);
    }
    Ok(())
}

/// Identifies a GPIO port (bank) on the host.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GpioPortId(pub u32);

impl GpioPortId {
    /// The single flat port of hosts without GPIO banks
    /// (`H_GPIO_PORT_DEFAULT`, raw -1).
    pub const DEFAULT: GpioPortId = GpioPortId(u32::MAX);

    /// Decode the control layer's signed port number.
    pub fn from_raw(raw: i32) -> OsResult<Self> {
        match raw {
            -1 => Ok(GpioPortId::DEFAULT),
            port if port >= 0 => Ok(GpioPortId(port as u32)),
            _ => Err(OsError::Invalid),
        }
    }
}

/// GPIO entries of the dispatch table.
///
/// A failed configuration call leaves the line exactly as it was.
pub trait GpioOps {
    /// Claim a port. A port has one owner at a time.
    fn gpio_port_open(&self, port: GpioPortId) -> OsResult<RawHandle>;

    /// Release a port. Pin configuration stays in effect; handlers are
    /// removed.
    fn gpio_port_close(&self, port: RawHandle) -> OsResult<()>;

    /// Apply mode, pull and trigger to one pin.
    fn gpio_config(&self, port: RawHandle, pin: GpioPin, config: &GpioConfig) -> OsResult<()>;

    /// Read a pin configured with `INPUT`.
    fn gpio_read(&self, port: RawHandle, pin: GpioPin) -> OsResult<PinLevel>;

    /// Drive a pin configured with `OUTPUT`.
    fn gpio_write(&self, port: RawHandle, pin: GpioPin, level: PinLevel) -> OsResult<()>;

    /// Change a pin's trigger and install (or with `None`, keep) its handler.
    fn gpio_set_interrupt(
        &self,
        port: RawHandle,
        pin: GpioPin,
        trigger: InterruptTrigger,
        isr: Option<GpioIsr>,
    ) -> OsResult<()>;
}

/// Pin controller a bare-metal backend drives.
///
/// Implemented by the firmware on top of its GPIO registers.
pub trait PinDriver: Send {
    /// Number of pins; valid pins are `0..pin_count()`.
    fn pin_count(&self) -> GpioPin;

    /// Apply drive mode and pull resistor.
    fn configure(&mut self, pin: GpioPin, mode: GpioMode, pull: PullMode) -> OsResult<()>;

    /// Read the current logic level of a pin.
    fn read(&self, pin: GpioPin) -> OsResult<PinLevel>;

    /// Set the pin to a specific level.
    fn set_level(&mut self, pin: GpioPin, level: PinLevel) -> OsResult<()>;

    /// Program edge/level detection. `Disable` turns detection off.
    fn set_trigger(&mut self, pin: GpioPin, trigger: InterruptTrigger) -> OsResult<()>;

    /// Check if an event is pending for a pin.
    fn event_pending(&self, pin: GpioPin) -> bool;

    /// Clear a pending event for a pin.
    fn clear_event(&mut self, pin: GpioPin);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_composition() {
        assert_eq!(GpioMode::INPUT | GpioMode::OUTPUT, GpioMode::INPUT_OUTPUT);
        assert_eq!(GpioMode::OUTPUT | GpioMode::OD, GpioMode::OUTPUT_OD);
        assert_eq!(GpioMode::DISABLE.bits(), 0);
        assert_eq!(GpioMode::INPUT_OUTPUT_OD.bits(), 0b111);
    }

    #[test]
    fn test_mode_from_raw() {
        assert_eq!(GpioMode::from_raw(0b011), Ok(GpioMode::INPUT_OUTPUT));
        assert_eq!(GpioMode::from_raw(0b100), Err(OsError::Invalid));
        assert_eq!(GpioMode::from_raw(0b1000), Err(OsError::Invalid));
    }

    #[test]
    fn test_trigger_sentinel() {
        assert_eq!(InterruptTrigger::try_from(3), Ok(InterruptTrigger::AnyEdge));
        assert_eq!(
            InterruptTrigger::try_from(InterruptTrigger::MAX),
            Err(OsError::Invalid)
        );
        assert_eq!(InterruptTrigger::try_from(u32::MAX), Err(OsError::Invalid));
    }

    #[test]
    fn test_trigger_needs_input() {
        let cfg = GpioConfig::new(GpioMode::OUTPUT).trigger(InterruptTrigger::RisingEdge);
        assert_eq!(cfg.validate(), Err(OsError::Invalid));
        let cfg = GpioConfig::new(GpioMode::INPUT_OUTPUT).trigger(InterruptTrigger::RisingEdge);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_trigger_fires() {
        use PinLevel::*;
        assert!(InterruptTrigger::RisingEdge.fires(Low, High));
        assert!(!InterruptTrigger::RisingEdge.fires(High, High));
        assert!(InterruptTrigger::AnyEdge.fires(High, Low));
        assert!(InterruptTrigger::HighLevel.fires(High, High));
        assert!(!InterruptTrigger::Disable.fires(Low, High));
    }
}
