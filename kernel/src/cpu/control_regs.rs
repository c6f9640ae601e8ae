// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw control-register and TLB-invalidation access. Trimmed to the
//! handful of registers the page-table engine actually touches; platform
//! bring-up (CR0/CR4 feature-bit negotiation) is out of scope here.

use crate::address::{Address, PhysAddr, VirtAddr};
use crate::mm::pagetable::TlbInvalidator;

/// # Safety
/// Must only be called with MMU and paging active; reads the current
/// fault address and is only meaningful immediately after a page fault.
#[inline]
pub unsafe fn read_cr2() -> VirtAddr {
    let ret: u64;
    // SAFETY: CR2 is always readable from ring 0; this performs no
    // side effect beyond the register read.
    unsafe {
        core::arch::asm!("mov %cr2, {}", out(reg) ret, options(att_syntax, nomem, nostack, preserves_flags));
    }
    VirtAddr::from(ret)
}

#[inline]
pub fn read_cr3() -> PhysAddr {
    let ret: u64;
    // SAFETY: CR3 is always readable from ring 0.
    unsafe {
        core::arch::asm!("mov %cr3, {}", out(reg) ret, options(att_syntax, nomem, nostack, preserves_flags));
    }
    PhysAddr::from(ret & 0x000f_ffff_ffff_f000)
}

/// # Safety
/// `root` must be the physical address of a live, fully-populated PML4
/// table; writing a bogus value here takes the whole CPU down immediately.
#[inline]
pub unsafe fn write_cr3(root: PhysAddr) {
    // SAFETY: caller guarantees `root` is a valid page-table root. A CR3
    // write is itself a full TLB flush of all non-global entries.
    unsafe {
        core::arch::asm!("mov {}, %cr3", in(reg) root.bits(), options(att_syntax, nostack, preserves_flags));
    }
}

#[inline]
pub fn read_cr4() -> u64 {
    let ret: u64;
    // SAFETY: CR4 is always readable from ring 0.
    unsafe {
        core::arch::asm!("mov %cr4, {}", out(reg) ret, options(att_syntax, nomem, nostack, preserves_flags));
    }
    ret
}

/// # Safety
/// Bits not already the firmware/loader's chosen configuration can
/// silently change addressing mode (e.g. toggling `LA57`) out from under
/// every live mapping.
#[inline]
pub unsafe fn write_cr4(value: u64) {
    // SAFETY: caller accepts responsibility for the bits being valid for
    // the running address-translation mode.
    unsafe {
        core::arch::asm!("mov {}, %cr4", in(reg) value, options(att_syntax, nostack, preserves_flags));
    }
}

#[inline]
fn invlpg(v: VirtAddr) {
    // SAFETY: `invlpg` only ever invalidates a TLB entry; it has no effect
    // observable beyond future translations of `v`.
    unsafe {
        core::arch::asm!("invlpg ({})", in(reg) v.bits(), options(att_syntax, nostack, preserves_flags));
    }
}

/// The real, single-CPU TLB invalidator: `invlpg` for single pages, a CR3
/// reload for a full flush. SMP shootdown beyond this core is out of
/// scope.
#[derive(Debug, Default)]
pub struct HardwareTlb;

impl TlbInvalidator for HardwareTlb {
    fn invalidate_page(&self, v: VirtAddr) {
        invlpg(v);
    }

    fn invalidate_all(&self) {
        let root = read_cr3();
        // SAFETY: reloading CR3 with the value it already holds; this
        // flushes every non-global TLB entry without changing the active
        // address space.
        unsafe { write_cr3(root) };
    }
}
