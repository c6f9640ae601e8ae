// SPDX-License-Identifier: MIT OR Apache-2.0

//! Abstracts whatever interrupt/preemption state handling a lock needs when
//! it is taken and released.
//!
//! This kernel runs on a single cooperative scheduler with preemption
//! points only at syscall boundaries, so only a no-op policy is needed
//! here; an IRQ-disabling or APIC-TPR-raising policy would be a second
//! implementation of this same trait, not a change to
//! [`super::spinlock::SpinLock`] itself.
pub trait IrqLocking {
    /// Called when a lock is acquired; the returned guard is held for the
    /// duration of the critical section and its `Drop` impl restores state.
    fn acquire_lock() -> Self;
}

/// Performs no interrupt/preemption state handling. The correct choice for
/// single-core cooperative code where callers never take a lock from an
/// interrupt handler.
#[derive(Debug, Default)]
pub struct UnguardedLocking {}

impl IrqLocking for UnguardedLocking {
    fn acquire_lock() -> Self {
        Self {}
    }
}
