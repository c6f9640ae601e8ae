// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory management: the bitmap allocator and the page-table engine.

pub mod bitmap;
pub mod pagetable;
