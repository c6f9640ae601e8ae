// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-adjacent kernel surface: the readiness multiplexor.

pub mod epoll;
