// SPDX-License-Identifier: MIT OR Apache-2.0

//! A test-and-test-and-set spinlock parameterized over an [`IrqLocking`]
//! policy, used to protect the page-table mutation path and each
//! [`Epoll`](crate::fs::epoll::Epoll) instance's internal state.

use core::cell::UnsafeCell;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use super::common::{IrqLocking, UnguardedLocking};

#[derive(Debug, Default)]
struct RawSpinLock {
    locked: AtomicBool,
}

impl RawSpinLock {
    const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    fn lock(&self) {
        loop {
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
            while self.locked.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

/// A mutual-exclusion cell. `L` chooses what, if anything, happens to
/// interrupt/preemption state across the critical section; it defaults to
/// [`UnguardedLocking`].
pub struct SpinLock<T: ?Sized, L: IrqLocking = UnguardedLocking> {
    raw: RawSpinLock,
    _locking: core::marker::PhantomData<L>,
    value: UnsafeCell<T>,
}

// SAFETY: `SpinLock` only ever hands out `&T`/`&mut T` to the thread
// currently holding `raw`, which serializes access exactly like `Mutex`.
unsafe impl<T: ?Sized + Send, L: IrqLocking> Send for SpinLock<T, L> {}
// SAFETY: see above; shared access is serialized by `raw`.
unsafe impl<T: ?Sized + Send, L: IrqLocking> Sync for SpinLock<T, L> {}

impl<T, L: IrqLocking> SpinLock<T, L> {
    pub const fn new(value: T) -> Self {
        Self {
            raw: RawSpinLock::new(),
            _locking: core::marker::PhantomData,
            value: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: ?Sized, L: IrqLocking> SpinLock<T, L> {
    pub fn lock(&self) -> SpinLockGuard<'_, T, L> {
        self.raw.lock();
        SpinLockGuard {
            lock: &self.raw,
            value: &self.value,
            _irq: L::acquire_lock(),
        }
    }

    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T, L>> {
        if self.raw.try_lock() {
            Some(SpinLockGuard {
                lock: &self.raw,
                value: &self.value,
                _irq: L::acquire_lock(),
            })
        } else {
            None
        }
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }
}

impl<T: ?Sized + fmt::Debug, L: IrqLocking> fmt::Debug for SpinLock<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("SpinLock").field("value", &*guard).finish(),
            None => f.pad("SpinLock(<locked>)"),
        }
    }
}

#[must_use = "the lock is released when the guard is dropped"]
pub struct SpinLockGuard<'a, T: ?Sized, L: IrqLocking> {
    lock: &'a RawSpinLock,
    value: &'a UnsafeCell<T>,
    _irq: L,
}

impl<T: ?Sized + fmt::Debug, L: IrqLocking> fmt::Debug for SpinLockGuard<'_, T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLockGuard").field("value", &**self).finish()
    }
}

impl<T: ?Sized, L: IrqLocking> Deref for SpinLockGuard<'_, T, L> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: holding the guard proves exclusive access to `value`.
        unsafe { &*self.value.get() }
    }
}

impl<T: ?Sized, L: IrqLocking> DerefMut for SpinLockGuard<'_, T, L> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: holding the guard proves exclusive access to `value`.
        unsafe { &mut *self.value.get() }
    }
}

impl<T: ?Sized, L: IrqLocking> Drop for SpinLockGuard<'_, T, L> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
