// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod control_regs;

pub use control_regs::HardwareTlb;
