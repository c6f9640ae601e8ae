// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod common;
pub mod spinlock;

pub use common::{IrqLocking, UnguardedLocking};
pub use spinlock::{SpinLock, SpinLockGuard};
