use core::{cell::UnsafeCell, marker::PhantomData};

use super::irq::IrqControl;
use super::spinlock::RawSpinLock;

/// IRQ-safe spinlock.
///
/// - Disables interrupts on lock
/// - Spins until acquired
/// - Restores interrupt state on drop
///
/// Safe to use from both interrupt and task context, which is what the
/// bare-metal adapter backend needs: a queue may be filled by a GPIO handler
/// and drained by the super-loop.
///
/// Not fair. Not reentrant.
pub struct IrqSpinLock<T, I: IrqControl> {
    raw: RawSpinLock,
    data: UnsafeCell<T>,
    _irq: PhantomData<I>,
}

unsafe impl<T: Send, I: IrqControl> Send for IrqSpinLock<T, I> {}
unsafe impl<T: Send, I: IrqControl> Sync for IrqSpinLock<T, I> {}

impl<T, I: IrqControl> IrqSpinLock<T, I> {
    /// Create a new IRQ-safe spinlock.
    pub const fn new(data: T) -> Self {
        Self {
            raw: RawSpinLock::new(),
            data: UnsafeCell::new(data),
            _irq: PhantomData,
        }
    }

    /// Acquire the lock with interrupts disabled.
    pub fn lock(&self) -> IrqSpinLockGuard<'_, T, I> {
        // Mask first so a handler on this CPU cannot spin on a lock we hold.
        let irq_state = I::disable();
        self.raw.lock();

        IrqSpinLockGuard {
            lock: self,
            irq_state,
        }
    }

    /// Acquire the lock only if it is free, restoring interrupts on failure.
    pub fn try_lock(&self) -> Option<IrqSpinLockGuard<'_, T, I>> {
        let irq_state = I::disable();
        if self.raw.try_lock() {
            Some(IrqSpinLockGuard {
                lock: self,
                irq_state,
            })
        } else {
            I::restore(irq_state);
            None
        }
    }
}

/// Guard returned by `IrqSpinLock::lock`.
///
/// Restores interrupt state on drop.
pub struct IrqSpinLockGuard<'a, T, I: IrqControl> {
    lock: &'a IrqSpinLock<T, I>,
    irq_state: I::State,
}

impl<T, I: IrqControl> core::ops::Deref for IrqSpinLockGuard<'_, T, I> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T, I: IrqControl> core::ops::DerefMut for IrqSpinLockGuard<'_, T, I> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T, I: IrqControl> Drop for IrqSpinLockGuard<'_, T, I> {
    fn drop(&mut self) {
        // Release lock first
        self.lock.raw.unlock();

        I::restore(self.irq_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static DEPTH: AtomicUsize = AtomicUsize::new(0);

    struct CountingIrq;

    impl IrqControl for CountingIrq {
        type State = usize;

        fn disable() -> usize {
            DEPTH.fetch_add(1, Ordering::SeqCst)
        }

        fn restore(state: usize) {
            DEPTH.store(state, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_masks_while_held() {
        let lock: IrqSpinLock<u8, CountingIrq> = IrqSpinLock::new(7);
        {
            let guard = lock.lock();
            assert_eq!(*guard, 7);
            assert_eq!(DEPTH.load(Ordering::SeqCst), 1);
            assert!(lock.try_lock().is_none());
            assert_eq!(DEPTH.load(Ordering::SeqCst), 1);
        }
        assert_eq!(DEPTH.load(Ordering::SeqCst), 0);
    }
}
