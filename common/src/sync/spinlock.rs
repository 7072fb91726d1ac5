use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

/// A lock flag without protected data.
///
/// `RawSpinLock` is what an adapter spinlock handle wraps: acquisition and
/// release are separate calls, so the critical section does not have to be a
/// lexical scope. [`SpinLock`] builds the usual guard-based API on top of it.
///
/// Not fair. Not reentrant.
#[derive(Debug)]
pub struct RawSpinLock {
    locked: AtomicBool,
}

impl RawSpinLock {
    /// Creates an unlocked lock.
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Spins until the lock is acquired.
    pub fn lock(&self) {
        while !self.try_lock() {
            // Wait on a plain load so contended CPUs don't hammer the line
            // with read-modify-write traffic.
            while self.locked.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
    }

    /// Acquires the lock if it is free, without spinning.
    pub fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Releases the lock.
    ///
    /// Returns `false` if the lock was not held.
    pub fn unlock(&self) -> bool {
        self.locked.swap(false, Ordering::Release)
    }

    /// Whether the lock is currently held by anyone.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

/// A simple spinlock for mutual exclusion in a `no_std` environment.
///
/// `SpinLock` allows exclusive access to data across threads or cores by
/// continuously spinning (busy-waiting) until the lock becomes available.
///
/// # Type Parameters
///
/// * `T` - The type of data protected by the spinlock.
pub struct SpinLock<T> {
    raw: RawSpinLock,
    data: UnsafeCell<T>,
}

// SAFETY: SpinLock can be shared between threads if T can be sent between threads
unsafe impl<T: Send> Sync for SpinLock<T> {}
unsafe impl<T: Send> Send for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Creates a new `SpinLock` wrapping the provided data.
    pub const fn new(data: T) -> Self {
        Self {
            raw: RawSpinLock::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires the lock, spinning until it is available.
    ///
    /// The lock is released when the returned guard is dropped.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        self.raw.lock();
        SpinLockGuard { lock: self }
    }

    /// Acquires the lock only if it is free right now.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.raw.try_lock().then(|| SpinLockGuard { lock: self })
    }

    /// Consumes the lock and returns the protected data.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

/// A guard that provides access to the data protected by a `SpinLock`.
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> core::ops::Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: The lock is held, so we have exclusive access
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> core::ops::DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: The lock is held, so we have exclusive access
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.raw.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_lock_unlock() {
        let lock = RawSpinLock::new();
        assert!(lock.try_lock());
        assert!(lock.is_locked());
        assert!(!lock.try_lock());
        assert!(lock.unlock());
        assert!(!lock.unlock());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = SpinLock::new(0u32);
        {
            let mut guard = lock.lock();
            *guard += 1;
            assert!(lock.try_lock().is_none());
        }
        assert_eq!(*lock.try_lock().unwrap(), 1);
    }

    #[test]
    fn test_contended_counter() {
        let lock = SpinLock::new(0usize);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        *lock.lock() += 1;
                    }
                });
            }
        });
        assert_eq!(lock.into_inner(), 4000);
    }
}
