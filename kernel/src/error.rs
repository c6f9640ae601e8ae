// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crate-wide error type.
//!
//! Resource exhaustion and bad-argument conditions are returned by value;
//! there is no unwinding in a `no_std` kernel crate. Fatal conditions
//! (page-table heap exhaustion, a refcount invariant violated on release)
//! are not represented here at all — they are bugs, not conditions, and are
//! signaled with `panic!`/`debug_assert!` at the point of detection.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// A slab, heap, or fd table is exhausted.
    NoMemory,
    /// A per-process fd table could not accept another registration.
    TooManyFiles,
    /// An operation referenced an fd with no live registration.
    BadFd,
    /// Named but intentionally unimplemented (`select`, `pselect6`).
    Unimplemented,
}

/// Converts a [`KernelError`] into the conventional negative-errno `i64`
/// returned from the syscall dispatch table.
pub fn errno_of(err: KernelError) -> i64 {
    match err {
        KernelError::NoMemory => -12,      // -ENOMEM
        KernelError::TooManyFiles => -24,  // -EMFILE
        KernelError::BadFd => -9,          // -EBADF
        KernelError::Unimplemented => -38, // -ENOSYS
    }
}
