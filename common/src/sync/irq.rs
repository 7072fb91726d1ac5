use core::fmt::Debug;

/// Interrupt masking policy used by interrupt-safe locks.
///
/// Implemented by the firmware for its CPU (for example by toggling the
/// IRQ-disable bit of the status register).
pub trait IrqControl {
    /// Saved interrupt state
    type State: Copy + Debug + Send;

    /// Disable interrupts and return the previous state.
    fn disable() -> Self::State;

    /// Restore interrupts to a previous state.
    fn restore(state: Self::State);
}

/// Policy for contexts without maskable interrupts.
///
/// Hosted builds and unit tests run every "interrupt" handler on an ordinary
/// thread, so there is nothing to mask.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NoIrq;

impl IrqControl for NoIrq {
    type State = ();

    #[inline(always)]
    fn disable() {}

    #[inline(always)]
    fn restore(_state: ()) {}
}
