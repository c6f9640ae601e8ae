// SPDX-License-Identifier: MIT OR Apache-2.0

//! Architecture-level control register and MSR bit definitions shared by
//! the page-table engine and its callers. Kept free of any kernel-specific
//! policy: this module only names hardware bits.

use bitflags::bitflags;

pub const MSR_EFER: u32 = 0xC000_0080;

bitflags! {
    #[derive(Clone, Copy, Debug)]
    pub struct EFERFlags: u64 {
        const SCE = 1 << 0;  // System Call Extensions
        const LME = 1 << 8;  // Long Mode Enable
        const LMA = 1 << 10; // Long Mode Active
        const NXE = 1 << 11; // No-Execute Enable
    }
}

impl From<u64> for EFERFlags {
    fn from(bits: u64) -> Self {
        EFERFlags::from_bits_truncate(bits)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy)]
    pub struct CR4Flags: u64 {
        const PSE  = 1 << 4;  // Page Size Extensions
        const PAE  = 1 << 5;  // Physical-Address Extension
        const PGE  = 1 << 7;  // Page-Global Enable
        const LA57 = 1 << 12; // 57-bit linear address
    }
}

impl From<u64> for CR4Flags {
    fn from(bits: u64) -> Self {
        CR4Flags::from_bits_truncate(bits)
    }
}

/// Raw architecture bits backing a page-table entry. Kept private to the
/// `pagetable` module boundary; nothing outside `cpuarch`/`pagetable` should
/// match on these directly.
pub mod pte_bits {
    pub const PRESENT: u64 = 1 << 0;
    pub const WRITABLE: u64 = 1 << 1;
    pub const USER: u64 = 1 << 2;
    pub const WRITETHROUGH: u64 = 1 << 3;
    pub const CACHE_DISABLE: u64 = 1 << 4;
    pub const ACCESSED: u64 = 1 << 5;
    pub const DIRTY: u64 = 1 << 6;
    pub const PAGE_SIZE: u64 = 1 << 7;
    pub const NO_MINPAGE: u64 = 1 << 9; // software-defined AVL bit: disallow large page
    pub const FRAME_MASK: u64 = 0x000f_ffff_ffff_f000;
    pub const NO_EXECUTE: u64 = 1 << 63;

    pub const FLAGS_MASK: u64 = NO_EXECUTE | 0xfff;
}
