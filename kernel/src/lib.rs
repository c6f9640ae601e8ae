// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core memory-management and readiness-notification primitives for a
//! small unikernel: a dynamically extensible bitmap allocator, a 4-level
//! x86-style page-table engine, and an `epoll`-style readiness
//! multiplexor. Everything this crate needs from the rest of the kernel —
//! the heap, the thread scheduler, the timer wheel, file objects — is
//! captured only as a trait contract in [`collab`].

#![no_std]

extern crate alloc;

pub mod address;
pub mod collab;
pub mod cpu;
pub mod error;
pub mod fs;
pub mod locking;
pub mod mm;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
