//! Synchronization primitives shared between process context and the
//! completion handler.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::Waker;

use critical_section::Mutex;

use crate::driver::error::{StreamError, StreamResult};

/// Cell providing interior mutability with critical section protection.
///
/// Combines `critical_section::Mutex` with `RefCell` so both normal code and
/// the completion handler can reach the value.
pub struct CriticalSectionCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Create a new cell (const, suitable for static initialization).
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Execute a closure with exclusive mutable access.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            let mut value = self.inner.borrow_ref_mut(cs);
            f(&mut value)
        })
    }
}

/// Waker slot registered from a future and woken from the completion handler.
pub struct AtomicWaker {
    waker: CriticalSectionCell<Option<Waker>>,
}

impl AtomicWaker {
    /// Create a new empty waker (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            waker: CriticalSectionCell::new(None),
        }
    }

    /// Register a waker to be woken later.
    pub fn register(&self, waker: &Waker) {
        self.waker.with(|slot| match slot {
            Some(existing) if existing.will_wake(waker) => {}
            _ => *slot = Some(waker.clone()),
        });
    }

    /// Wake the registered waker, if any (clears the stored waker).
    #[inline]
    pub fn wake(&self) {
        let waker = self.waker.with(Option::take);
        if let Some(w) = waker {
            w.wake();
        }
    }

    /// Check if a waker is currently registered.
    pub fn is_registered(&self) -> bool {
        self.waker.with(|slot| slot.is_some())
    }
}

impl Default for AtomicWaker {
    fn default() -> Self {
        Self::new()
    }
}

/// Acquire `mutex` from process context.
///
/// Spins until the lock is free. While it is contended, a raised `signal`
/// aborts the wait with `Interrupted` and is consumed.
pub(crate) fn lock_interruptible<'a, T>(
    mutex: &'a spin::Mutex<T>,
    signal: &AtomicBool,
) -> StreamResult<spin::MutexGuard<'a, T>> {
    loop {
        if let Some(guard) = mutex.try_lock() {
            return Ok(guard);
        }
        if signal.swap(false, Ordering::AcqRel) {
            return Err(StreamError::Interrupted);
        }
        core::hint::spin_loop();
    }
}

#[cfg(test)]
#[allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]
pub(crate) mod tests {
    extern crate std;

    use super::*;
    use core::task::{RawWaker, RawWakerVTable};
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    pub(crate) struct WakeCounter {
        count: AtomicUsize,
    }

    impl WakeCounter {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                count: AtomicUsize::new(0),
            })
        }

        pub(crate) fn count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }

    pub(crate) fn test_waker(counter: Arc<WakeCounter>) -> Waker {
        fn clone_fn(ptr: *const ()) -> RawWaker {
            // SAFETY: `ptr` originates from `Arc::into_raw` in this test helper.
            let arc = unsafe { Arc::from_raw(ptr as *const WakeCounter) };
            let cloned = arc.clone();
            core::mem::forget(arc);
            RawWaker::new(Arc::into_raw(cloned) as *const (), &VTABLE)
        }

        fn wake_fn(ptr: *const ()) {
            // SAFETY: `ptr` originates from `Arc::into_raw` in this test helper.
            let arc = unsafe { Arc::from_raw(ptr as *const WakeCounter) };
            arc.count.fetch_add(1, Ordering::SeqCst);
        }

        fn wake_by_ref_fn(ptr: *const ()) {
            // SAFETY: `ptr` originates from `Arc::into_raw` in this test helper.
            let arc = unsafe { Arc::from_raw(ptr as *const WakeCounter) };
            arc.count.fetch_add(1, Ordering::SeqCst);
            core::mem::forget(arc);
        }

        fn drop_fn(ptr: *const ()) {
            // SAFETY: `ptr` originates from `Arc::into_raw` in this test helper.
            unsafe {
                drop(Arc::from_raw(ptr as *const WakeCounter));
            }
        }

        static VTABLE: RawWakerVTable =
            RawWakerVTable::new(clone_fn, wake_fn, wake_by_ref_fn, drop_fn);

        let raw = RawWaker::new(Arc::into_raw(counter) as *const (), &VTABLE);
        // SAFETY: `raw` is built from a valid `RawWakerVTable` and pointer.
        unsafe { Waker::from_raw(raw) }
    }

    #[test]
    fn critical_section_cell_with_mutates() {
        let cell: CriticalSectionCell<u32> = CriticalSectionCell::new(0);
        cell.with(|v| *v += 10);
        assert_eq!(cell.with(|v| *v), 10);
    }

    #[test]
    fn critical_section_cell_static_usage() {
        static CELL: CriticalSectionCell<u32> = CriticalSectionCell::new(0);
        CELL.with(|v| *v = 100);
        assert_eq!(CELL.with(|v| *v), 100);
    }

    #[test]
    fn atomic_waker_register_and_wake() {
        let waker = AtomicWaker::new();
        let counter = WakeCounter::new();

        assert!(!waker.is_registered());
        waker.register(&test_waker(counter.clone()));
        assert!(waker.is_registered());

        waker.wake();
        assert_eq!(counter.count(), 1);
        assert!(!waker.is_registered());

        // Nothing registered: no-op
        waker.wake();
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn lock_interruptible_free_lock_ignores_signal() {
        let mutex = spin::Mutex::new(5u32);
        let signal = AtomicBool::new(true);

        let guard = lock_interruptible(&mutex, &signal).unwrap();
        assert_eq!(*guard, 5);
        assert!(signal.load(Ordering::SeqCst));
    }

    #[test]
    fn lock_interruptible_contended_lock_is_interrupted() {
        let mutex = spin::Mutex::new(5u32);
        let signal = AtomicBool::new(true);
        let _held = mutex.lock();

        assert!(matches!(
            lock_interruptible(&mutex, &signal),
            Err(StreamError::Interrupted)
        ));
        assert!(!signal.load(Ordering::SeqCst));
    }
}
