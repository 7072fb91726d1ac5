use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A spinning read-write lock for `no_std` environments.
///
/// Many readers or one writer. Used for lookup tables that are read on every
/// adapter call and written only when objects are created or destroyed.
/// Writers are not prioritised; a steady stream of readers can starve them.
///
/// # Type Parameters
///
/// * `T` - The type of data protected by the read-write lock.
pub struct RwLock<T> {
    reader_count: AtomicUsize,
    writer_lock: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: readers get shared references, so T must also be Sync.
unsafe impl<T: Send + Sync> Sync for RwLock<T> {}
unsafe impl<T: Send> Send for RwLock<T> {}

impl<T> RwLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            reader_count: AtomicUsize::new(0),
            writer_lock: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        loop {
            while self.writer_lock.load(Ordering::Acquire) {
                core::hint::spin_loop();
            }

            // Register first, then re-check: a writer that slipped in between
            // will see our count and wait, or we back off here.
            self.reader_count.fetch_add(1, Ordering::AcqRel);
            if !self.writer_lock.load(Ordering::Acquire) {
                return RwLockReadGuard { lock: self };
            }
            self.reader_count.fetch_sub(1, Ordering::Release);
        }
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        while self
            .writer_lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }

        while self.reader_count.load(Ordering::Acquire) > 0 {
            core::hint::spin_loop();
        }

        RwLockWriteGuard { lock: self }
    }
}

/// Shared access to the data protected by a `RwLock`.
pub struct RwLockReadGuard<'a, T> {
    lock: &'a RwLock<T>,
}

impl<T> core::ops::Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: no writer holds the lock while a reader is registered
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for RwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.reader_count.fetch_sub(1, Ordering::Release);
    }
}

/// Exclusive access to the data protected by a `RwLock`.
pub struct RwLockWriteGuard<'a, T> {
    lock: &'a RwLock<T>,
}

impl<T> core::ops::Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: The writer flag is held and all readers have drained
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> core::ops::DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: The writer flag is held and all readers have drained
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for RwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.writer_lock.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readers_share_writer_excludes() {
        let lock = RwLock::new(5);
        {
            let a = lock.read();
            let b = lock.read();
            assert_eq!(*a + *b, 10);
        }
        *lock.write() += 1;
        assert_eq!(*lock.read(), 6);
    }

    #[test]
    fn test_concurrent_writers() {
        let lock = RwLock::new(0usize);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..500 {
                        *lock.write() += 1;
                        let _ = *lock.read();
                    }
                });
            }
        });
        assert_eq!(*lock.read(), 2000);
    }
}
