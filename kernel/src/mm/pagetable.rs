// SPDX-License-Identifier: MIT OR Apache-2.0

//! The 4-level, 48-bit-virtual x86-style page-table radix tree.
//!
//! Levels are numbered 1 (root) through 4 (leaf 4 KiB pages): level 2 can
//! be a 1 GiB block, level 3 a 2 MiB block, level 4 is always a 4 KiB
//! leaf, level 1 (the root) is never a leaf.
//!
//! Mutation serializes on [`PageTable::mutate_lock`]; [`PageTable::physical_from_virtual`]
//! takes no lock and tolerates concurrent single-word PTE writes.

extern crate alloc;

use alloc::boxed::Box;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use cpuarch::x86::pte_bits;
use log::trace;

use crate::address::{Address, PhysAddr, VirtAddr};
use crate::locking::SpinLock;
use crate::types::{PAGE_SIZE, PAGE_SIZE_1G, PAGE_SIZE_2M};

pub use crate::collab::PageTableAllocator;

const LEVEL_ROOT: u8 = 1;
const LEVEL_LEAF_4K: u8 = 4;
const ENTRIES: usize = 512;

/// One physical page's worth of page-table entries, as the hardware sees
/// them. Every entry is accessed with an atomic 64-bit load/store so that a
/// lock-free reader never observes a torn write.
#[repr(align(4096))]
pub struct RawTable(pub [AtomicU64; ENTRIES]);

impl fmt::Debug for RawTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawTable").finish_non_exhaustive()
    }
}

fn level_shift(level: u8) -> u32 {
    match level {
        1 => 39,
        2 => 30,
        3 => 21,
        4 => 12,
        _ => unreachable!("page-table levels run 1..=4"),
    }
}

fn level_index(vaddr: u64, level: u8) -> usize {
    ((vaddr >> level_shift(level)) & 0x1ff) as usize
}

fn leaf_size_at(level: u8) -> u64 {
    match level {
        2 => PAGE_SIZE_1G as u64,
        3 => PAGE_SIZE_2M as u64,
        4 => PAGE_SIZE as u64,
        _ => unreachable!("level {level} cannot be a leaf"),
    }
}

bitflags! {
    /// Hardware bits backing a [`PageFlags`] value. Private: nothing
    /// outside this module ever matches on these directly.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Raw: u64 {
        const WRITABLE      = pte_bits::WRITABLE;
        const USER          = pte_bits::USER;
        const WRITETHROUGH  = pte_bits::WRITETHROUGH;
        const CACHE_DISABLE = pte_bits::CACHE_DISABLE;
        const NO_MINPAGE    = pte_bits::NO_MINPAGE;
        const NO_EXECUTE    = pte_bits::NO_EXECUTE;
    }
}

/// Opaque page protection/caching flags. Composed only through the named
/// transformers below; raw architecture bits never cross this boundary, so
/// the same call sites port unchanged to an MMU with a different bit
/// layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageFlags(Raw);

impl PageFlags {
    /// Read-only, kernel-only, no-execute: the default minimum permission
    /// set.
    pub fn memory() -> Self {
        Self(Raw::NO_EXECUTE)
    }

    pub fn memory_writethrough() -> Self {
        Self(Raw::NO_EXECUTE | Raw::WRITETHROUGH)
    }

    pub fn device() -> Self {
        Self(Raw::NO_EXECUTE | Raw::CACHE_DISABLE)
    }

    /// No-execute, read-only, user-accessible, large pages disallowed —
    /// the default policy for user mappings.
    pub fn default_user() -> Self {
        Self::memory().user().minpage()
    }

    pub fn writable(self) -> Self {
        Self(self.0 | Raw::WRITABLE)
    }

    pub fn readonly(self) -> Self {
        Self(self.0 & !Raw::WRITABLE)
    }

    pub fn user(self) -> Self {
        Self(self.0 | Raw::USER)
    }

    pub fn noexec(self) -> Self {
        Self(self.0 | Raw::NO_EXECUTE)
    }

    pub fn exec(self) -> Self {
        Self(self.0 & !Raw::NO_EXECUTE)
    }

    /// Forbids large-page selection for a mapping created with these
    /// flags, forcing 4 KiB leaves regardless of alignment.
    pub fn minpage(self) -> Self {
        Self(self.0 | Raw::NO_MINPAGE)
    }

    pub fn no_minpage(self) -> Self {
        Self(self.0 & !Raw::NO_MINPAGE)
    }

    pub fn is_writable(self) -> bool {
        self.0.contains(Raw::WRITABLE)
    }

    pub fn is_readonly(self) -> bool {
        !self.is_writable()
    }

    pub fn is_noexec(self) -> bool {
        self.0.contains(Raw::NO_EXECUTE)
    }

    pub fn disallows_large_page(self) -> bool {
        self.0.contains(Raw::NO_MINPAGE)
    }

    /// Bits as they should be OR'd into a leaf PTE. `NO_MINPAGE` is
    /// metadata for `map`'s block-size decision, not a hardware bit worth
    /// persisting, so it is stripped here before the PTE is written.
    fn leaf_bits(self) -> u64 {
        (self.0 & !Raw::NO_MINPAGE).bits()
    }

    fn from_leaf_bits(bits: u64) -> Self {
        Self(Raw::from_bits_truncate(bits))
    }
}

impl Default for PageFlags {
    fn default() -> Self {
        Self::memory()
    }
}

fn is_present(entry: u64) -> bool {
    entry & pte_bits::PRESENT != 0
}

fn is_block(entry: u64) -> bool {
    entry & pte_bits::PAGE_SIZE != 0
}

fn frame_of(entry: u64) -> PhysAddr {
    PhysAddr::from(entry & pte_bits::FRAME_MASK)
}

fn flags_of(entry: u64) -> u64 {
    entry & pte_bits::FLAGS_MASK
}

fn leaf_pte(frame: PhysAddr, flags: PageFlags) -> u64 {
    frame.bits() | flags.leaf_bits() | pte_bits::PRESENT
}

fn block_pte(frame: PhysAddr, flags: PageFlags) -> u64 {
    leaf_pte(frame, flags) | pte_bits::PAGE_SIZE
}

/// A handle accumulating TLB invalidations to be issued as one batch, with
/// a completion signal once the shootdown has been performed.
#[derive(Debug, Default)]
pub struct FlushEntry {
    addrs: alloc::vec::Vec<VirtAddr>,
    full: bool,
}

impl FlushEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonicalizes `v` before queuing it — spec.md §4.2 Walk requires
    /// every address above the canonical boundary (bit 47) to be
    /// sign-extended before it reaches the hardware, and `invlpg` raises
    /// #GP on a non-canonical linear address.
    pub fn push(&mut self, v: VirtAddr) {
        let v = VirtAddr::canonicalize(v.bits());
        if self.addrs.len() >= 64 {
            // Beyond this many discrete invalidations a full flush is
            // cheaper than walking the list one address at a time.
            self.full = true;
        } else {
            self.addrs.push(v);
        }
    }
}

/// Hardware/SMP-coherence collaborator for a [`FlushEntry`]. Real shootdown
/// across CPUs beyond a single local flush is out of scope; this
/// trait exists so the engine's mutation paths stay testable without
/// executing privileged instructions.
pub trait TlbInvalidator {
    fn invalidate_page(&self, v: VirtAddr);
    fn invalidate_all(&self);
}

/// Drains `entry`, performs the invalidation through `tlb`, and invokes
/// `completion` once it has. Every mutating
/// operation that does not pass its own `FlushEntry` uses this as an
/// implicit single-entry batch.
pub fn page_invalidate_sync(
    entry: FlushEntry,
    tlb: &dyn TlbInvalidator,
    completion: Option<Box<dyn FnOnce()>>,
) {
    if entry.full {
        tlb.invalidate_all();
    } else {
        for v in &entry.addrs {
            tlb.invalidate_page(*v);
        }
    }
    if let Some(f) = completion {
        f();
    }
}

/// Owns the root of the radix tree and mediates every mapping.
pub struct PageTable<'a> {
    root: PhysAddr,
    allocator: &'a dyn PageTableAllocator,
    tlb: &'a dyn TlbInvalidator,
    mutate_lock: SpinLock<()>,
}

impl fmt::Debug for PageTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTable").field("root", &self.root).finish_non_exhaustive()
    }
}

impl<'a> PageTable<'a> {
    /// Attaches to an already-installed root (the single process-wide
    /// `pagebase`, installed exactly once at MMU initialization — spec
    /// §3). Does not allocate.
    pub fn new(root: PhysAddr, allocator: &'a dyn PageTableAllocator, tlb: &'a dyn TlbInvalidator) -> Self {
        Self {
            root,
            allocator,
            tlb,
            mutate_lock: SpinLock::new(()),
        }
    }

    /// Allocates and zeroes a fresh root table and attaches to it.
    pub fn bootstrap(allocator: &'a dyn PageTableAllocator, tlb: &'a dyn TlbInvalidator) -> Self {
        let root = allocator.alloc_zeroed().expect("page-table heap exhausted");
        Self::new(root, allocator, tlb)
    }

    pub fn root(&self) -> PhysAddr {
        self.root
    }

    fn table(&self, frame: PhysAddr) -> &RawTable {
        // SAFETY: `frame` was either the root (installed once at MMU init)
        // or returned by `allocator.alloc_zeroed`, both of which back a
        // full zeroed page that `allocator` guarantees remains valid and
        // exclusively owned by the page-table engine as a table frame.
        unsafe { &*self.allocator.map_frame(frame).as_ptr().cast::<RawTable>() }
    }

    fn load(&self, table: &RawTable, index: usize) -> u64 {
        table.0[index].load(Ordering::Acquire)
    }

    fn store(&self, table: &RawTable, index: usize, value: u64) {
        table.0[index].store(value, Ordering::Release);
    }

    /// Returns the next-level table for `table[index]`, allocating and
    /// installing a zeroed child if none is present yet. Intermediate
    /// levels always get the default "user + writable + present" control
    /// entry regardless of the final leaf's flags — per-page protection
    /// happens only at the leaf.
    fn ensure_child(&self, table: &RawTable, index: usize) -> PhysAddr {
        let entry = self.load(table, index);
        if is_present(entry) {
            return frame_of(entry);
        }
        let child = self
            .allocator
            .alloc_zeroed()
            .expect("page-table heap exhausted");
        let new_entry = child.bits() | pte_bits::PRESENT | pte_bits::WRITABLE | pte_bits::USER;
        self.store(table, index, new_entry);
        child
    }

    /// Walks from the root to `level`, creating intermediate tables. Never
    /// creates the final-level entry itself; returns the table that holds
    /// it and the index within it. `v` is canonicalized first, so an
    /// address above the canonical boundary (bit 47) sign-extends to the
    /// same table index a hardware walk would use.
    fn walk_create(&self, v: VirtAddr, level: u8) -> (PhysAddr, usize) {
        let v = VirtAddr::canonicalize(v.bits());
        let mut frame = self.root;
        let mut cur = LEVEL_ROOT;
        while cur < level {
            let table = self.table(frame);
            let index = level_index(v.bits(), cur);
            frame = self.ensure_child(table, index);
            cur += 1;
        }
        (frame, level_index(v.bits(), level))
    }

    /// Walks from the root following only present entries. Returns the
    /// level the walk resolved at (2, 3, or 4), the table, and the index,
    /// or `None` the moment it hits a non-present entry or a block mapping
    /// short of the deepest possible level. `v` is canonicalized first, same
    /// as [`PageTable::walk_create`].
    fn walk_find(&self, v: VirtAddr) -> Option<(u8, PhysAddr, usize)> {
        let v = VirtAddr::canonicalize(v.bits());
        let mut frame = self.root;
        let mut cur = LEVEL_ROOT;
        loop {
            let table = self.table(frame);
            let index = level_index(v.bits(), cur);
            let entry = self.load(table, index);
            if !is_present(entry) {
                return None;
            }
            if cur == LEVEL_LEAF_4K || (cur >= 2 && is_block(entry)) {
                return Some((cur, frame, index));
            }
            frame = frame_of(entry);
            cur += 1;
        }
    }

    /// Largest block size that can cover the next step of the mapping
    /// given virtual/physical alignment, remaining length, and the flags'
    /// large-page policy.
    fn choose_block_size(v: VirtAddr, p: PhysAddr, remaining: u64, flags: PageFlags) -> (u8, u64) {
        if !flags.disallows_large_page() {
            if cfg!(feature = "large-pages")
                && remaining >= PAGE_SIZE_1G as u64
                && v.is_aligned(PAGE_SIZE_1G as u64)
                && p.is_aligned(PAGE_SIZE_1G as u64)
            {
                return (2, PAGE_SIZE_1G as u64);
            }
            if cfg!(feature = "large-pages")
                && remaining >= PAGE_SIZE_2M as u64
                && v.is_aligned(PAGE_SIZE_2M as u64)
                && p.is_aligned(PAGE_SIZE_2M as u64)
            {
                return (3, PAGE_SIZE_2M as u64);
            }
        }
        (4, PAGE_SIZE as u64)
    }

    /// Installs mappings covering `[v, v + len)`, greedily using 2 MiB or
    /// 1 GiB blocks when alignment, remaining length, and `flags` permit.
    /// `flush` accumulates the invalidations; pass `None` for the implicit
    /// single-shot batch used by [`PageTable::map`].
    pub fn map_with_flush(
        &self,
        v: VirtAddr,
        p: PhysAddr,
        len: u64,
        flags: PageFlags,
        mut flush: Option<&mut FlushEntry>,
    ) {
        let _guard = self.mutate_lock.lock();
        let mut off = 0u64;
        while off < len {
            let cur_v = v + off;
            let cur_p = p + off;
            let (level, size) = Self::choose_block_size(cur_v, cur_p, len - off, flags);
            let (frame, index) = self.walk_create(cur_v, level);
            let table = self.table(frame);
            let entry = if level == LEVEL_LEAF_4K {
                leaf_pte(cur_p, flags)
            } else {
                block_pte(cur_p, flags)
            };
            self.store(table, index, entry);
            trace!("map: {cur_v:?} -> {cur_p:?} level={level} size={size:#x}");
            match flush.as_deref_mut() {
                Some(f) => f.push(cur_v),
                None => {
                    let mut local = FlushEntry::new();
                    local.push(cur_v);
                    page_invalidate_sync(local, self.tlb, None);
                }
            }
            off += size;
        }
    }

    /// `map` with an implicit, immediately-drained flush batch and no
    /// completion callback — the common case.
    pub fn map(&self, v: VirtAddr, p: PhysAddr, len: u64, flags: PageFlags) {
        self.map_with_flush(v, p, len, flags, None);
    }

    /// Clears the PTEs covering `[v, v + len)`. `handler` is invoked with
    /// each freed `(level, vaddr, phys, size)` before the entry is cleared,
    /// for callers that need to run reference-counted-frame bookkeeping
    /// (`unmap_pages_with_handler`); pass `None` to just clear the range
    /// (`unmap`).
    pub fn unmap_with_handler(&self, v: VirtAddr, len: u64, mut handler: Option<&mut dyn FnMut(u8, VirtAddr, PhysAddr, u64)>) {
        let _guard = self.mutate_lock.lock();
        let mut off = 0u64;
        while off < len {
            let cur_v = v + off;
            match self.walk_find(cur_v) {
                Some((level, frame, index)) => {
                    let table = self.table(frame);
                    let entry = self.load(table, index);
                    let size = leaf_size_at(level);
                    if let Some(h) = handler.as_deref_mut() {
                        h(level, cur_v, frame_of(entry), size);
                    }
                    self.store(table, index, 0);
                    trace!("unmap: {cur_v:?} level={level} size={size:#x}");
                    let mut local = FlushEntry::new();
                    local.push(cur_v);
                    page_invalidate_sync(local, self.tlb, None);
                    off += size;
                }
                None => off += PAGE_SIZE as u64,
            }
        }
    }

    pub fn unmap(&self, v: VirtAddr, len: u64) {
        self.unmap_with_handler(v, len, None);
    }

    /// Clears the range and hands each freed frame to `free_phys` (the
    /// source's `unmap_and_free_phys`).
    pub fn unmap_and_free_phys(&self, v: VirtAddr, len: u64, free_phys: &dyn Fn(PhysAddr, u64)) {
        self.unmap_with_handler(
            v,
            len,
            Some(&mut |_level, _vaddr, phys, size| free_phys(phys, size)),
        );
    }

    /// Rewrites only the flag bits of existing leaf entries covering
    /// `[v, v + len)`; physical addresses are untouched. Idempotent:
    /// applying the same flags twice leaves both flag and physical bits
    /// unchanged.
    pub fn update_map_flags(&self, v: VirtAddr, len: u64, flags: PageFlags) {
        let _guard = self.mutate_lock.lock();
        let mut off = 0u64;
        while off < len {
            let cur_v = v + off;
            if let Some((level, frame, index)) = self.walk_find(cur_v) {
                let table = self.table(frame);
                let entry = self.load(table, index);
                let new_bits = flags.leaf_bits() | (entry & pte_bits::PAGE_SIZE);
                let new_entry = frame_of(entry).bits() | new_bits | pte_bits::PRESENT;
                self.store(table, index, new_entry);
                let mut local = FlushEntry::new();
                local.push(cur_v);
                page_invalidate_sync(local, self.tlb, None);
                off += leaf_size_at(level);
            } else {
                off += PAGE_SIZE as u64;
            }
        }
    }

    /// Installs at `new_v`, unmaps at `old_v`, without disturbing the
    /// underlying physical frames or flags.
    pub fn remap(&self, new_v: VirtAddr, old_v: VirtAddr, len: u64) {
        let _guard = self.mutate_lock.lock();
        let mut off = 0u64;
        while off < len {
            let cur_old = old_v + off;
            match self.walk_find(cur_old) {
                Some((level, frame, index)) => {
                    let size = leaf_size_at(level);
                    let entry = self.load(self.table(frame), index);
                    let phys = frame_of(entry);
                    let flags = PageFlags::from_leaf_bits(flags_of(entry));
                    self.store(self.table(frame), index, 0);

                    let cur_new = new_v + off;
                    let (new_frame, new_index) = self.walk_create(cur_new, level);
                    let new_entry = if level == LEVEL_LEAF_4K {
                        leaf_pte(phys, flags)
                    } else {
                        block_pte(phys, flags)
                    };
                    self.store(self.table(new_frame), new_index, new_entry);

                    let mut local = FlushEntry::new();
                    local.push(cur_old);
                    local.push(cur_new);
                    page_invalidate_sync(local, self.tlb, None);
                    off += size;
                }
                None => off += PAGE_SIZE as u64,
            }
        }
    }

    /// Writes zero into an already-mapped range.
    pub fn zero_mapped_pages(&self, v: VirtAddr, len: u64) {
        self.traverse_ptes(v, len, &mut |_level, _vaddr, phys, size| {
            // SAFETY: `phys` was returned by `walk_find` for a present
            // leaf covering this range, so `allocator` guarantees
            // `map_frame` yields `size` valid, writable bytes.
            unsafe {
                let ptr = self.allocator.map_frame(phys).as_ptr();
                core::ptr::write_bytes(ptr, 0, size as usize);
            }
        });
    }

    /// Guarantees the caller sees zeros even when the final mapping is
    /// read-only: maps writable, zeros, then downgrades the flags under a
    /// single invalidation.
    pub fn map_and_zero(&self, v: VirtAddr, p: PhysAddr, len: u64, flags: PageFlags) {
        debug_assert!(v.is_page_aligned() && p.is_page_aligned());
        if flags.is_readonly() {
            self.map(v, p, len, flags.writable());
            self.zero_mapped_pages(v, len);
            self.update_map_flags(v, len, flags);
        } else {
            self.map(v, p, len, flags);
            self.zero_mapped_pages(v, len);
        }
    }

    /// Invokes `handler(level, vaddr, phys, size)` for every leaf PTE whose
    /// virtual span intersects `[v, v + len)`.
    pub fn traverse_ptes(&self, v: VirtAddr, len: u64, handler: &mut dyn FnMut(u8, VirtAddr, PhysAddr, u64)) {
        let mut off = 0u64;
        while off < len {
            let cur_v = v + off;
            match self.walk_find(cur_v) {
                Some((level, frame, index)) => {
                    let entry = self.load(self.table(frame), index);
                    let size = leaf_size_at(level);
                    handler(level, cur_v, frame_of(entry), size);
                    off += size;
                }
                None => off += PAGE_SIZE as u64,
            }
        }
    }

    /// Lock-free translation. Returns [`PhysAddr::INVALID`] the moment the
    /// walk hits a non-present entry, instead of raising an error.
    pub fn physical_from_virtual(&self, v: VirtAddr) -> PhysAddr {
        match self.walk_find(v) {
            Some((level, frame, index)) => {
                let entry = self.load(self.table(frame), index);
                let page_mask = leaf_size_at(level) - 1;
                PhysAddr::from(frame_of(entry).bits() | (v.bits() & page_mask))
            }
            None => PhysAddr::INVALID,
        }
    }

    /// A fresh TLB invalidation batch.
    pub fn get_page_flush_entry(&self) -> FlushEntry {
        FlushEntry::new()
    }

    /// Enqueues one virtual address into `entry` without performing the
    /// shootdown yet.
    pub fn page_invalidate(&self, entry: &mut FlushEntry, v: VirtAddr) {
        entry.push(v);
    }

    /// Drains `entry` and performs the architecture-dependent shootdown,
    /// signaling `completion` once done.
    pub fn page_invalidate_sync(&self, entry: FlushEntry, completion: Option<Box<dyn FnOnce()>>) {
        page_invalidate_sync(entry, self.tlb, completion);
    }

    pub fn flush_tlb(&self) {
        self.tlb.invalidate_all();
    }

    /// Logs every present leaf PTE covering `[v, v + len)` at
    /// [`log::Level::Trace`]. A no-op (not even the walk runs) when trace
    /// logging isn't enabled, since the recursive walk it performs is
    /// otherwise pure overhead.
    pub fn debug_dump(&self, v: VirtAddr, len: u64) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        self.traverse_ptes(v, len, &mut |level, vaddr, phys, size| {
            trace!("pte: level={level} {vaddr:?} -> {phys:?} size={size:#x}");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakePhysMem, NullTlb};

    #[test]
    fn map_then_translate_round_trips() {
        let mem = FakePhysMem::new(16 * 1024 * 1024);
        let tlb = NullTlb::default();
        let pt = PageTable::bootstrap(&mem, &tlb);

        let v = VirtAddr::from(0x4000_0000u64);
        let p = mem.alloc_data_frames(4);
        let len = 4 * PAGE_SIZE as u64;
        pt.map(v, p, len, PageFlags::memory().writable().minpage());

        for delta in [0u64, 1, 4095, PAGE_SIZE as u64, len - 1] {
            assert_eq!(pt.physical_from_virtual(v + delta).bits(), (p + delta).bits());
        }
    }

    #[test]
    fn update_map_flags_is_idempotent_and_preserves_physical() {
        let mem = FakePhysMem::new(4 * 1024 * 1024);
        let tlb = NullTlb::default();
        let pt = PageTable::bootstrap(&mem, &tlb);

        let v = VirtAddr::from(0x1000_0000u64);
        let p = mem.alloc_data_frames(1);
        pt.map(v, p, PAGE_SIZE as u64, PageFlags::memory().writable().minpage());

        let flags = PageFlags::memory().user().minpage();
        pt.update_map_flags(v, PAGE_SIZE as u64, flags);
        let phys_after_first = pt.physical_from_virtual(v);
        pt.update_map_flags(v, PAGE_SIZE as u64, flags);
        let phys_after_second = pt.physical_from_virtual(v);

        assert_eq!(phys_after_first.bits(), p.bits());
        assert_eq!(phys_after_second.bits(), p.bits());
    }

    #[test]
    fn map_and_zero_reads_back_zero_through_readonly_mapping() {
        let mem = FakePhysMem::new(4 * 1024 * 1024);
        let tlb = NullTlb::default();
        let pt = PageTable::bootstrap(&mem, &tlb);

        let v = VirtAddr::from(0x2000_0000u64);
        let p = mem.alloc_data_frames(1);
        mem.poison_frame(p);
        pt.map_and_zero(v, p, PAGE_SIZE as u64, PageFlags::memory().minpage());

        assert!(pt.physical_from_virtual(v).bits() != PhysAddr::INVALID.bits());
        assert!(mem.frame_is_zero(p));
        assert!(!pt.physical_from_virtual(v).eq(&PhysAddr::INVALID));
    }

    #[test]
    fn unmapped_virtual_address_is_invalid() {
        let mem = FakePhysMem::new(1024 * 1024);
        let tlb = NullTlb::default();
        let pt = PageTable::bootstrap(&mem, &tlb);
        assert!(pt.physical_from_virtual(VirtAddr::from(0x5555_0000u64)).is_invalid());
    }

    #[test]
    fn traverse_ptes_covers_exactly_the_intersecting_leaves() {
        let mem = FakePhysMem::new(8 * 1024 * 1024);
        let tlb = NullTlb::default();
        let pt = PageTable::bootstrap(&mem, &tlb);

        let v = VirtAddr::from(0x3000_0000u64);
        let p = mem.alloc_data_frames(3);
        pt.map(v, p, 3 * PAGE_SIZE as u64, PageFlags::memory().writable().minpage());

        let mut seen = alloc::vec::Vec::new();
        pt.traverse_ptes(v, 3 * PAGE_SIZE as u64, &mut |level, vaddr, phys, size| {
            seen.push((level, vaddr.bits(), phys.bits(), size));
        });
        assert_eq!(seen.len(), 3);
        for (i, (level, vaddr, phys, size)) in seen.into_iter().enumerate() {
            assert_eq!(level, 4);
            assert_eq!(size, PAGE_SIZE as u64);
            assert_eq!(vaddr, v.bits() + i as u64 * PAGE_SIZE as u64);
            assert_eq!(phys, p.bits() + i as u64 * PAGE_SIZE as u64);
        }
    }

    #[test]
    fn remap_preserves_flags_and_physical_and_clears_old() {
        let mem = FakePhysMem::new(4 * 1024 * 1024);
        let tlb = NullTlb::default();
        let pt = PageTable::bootstrap(&mem, &tlb);

        let old_v = VirtAddr::from(0x6000_0000u64);
        let new_v = VirtAddr::from(0x7000_0000u64);
        let p = mem.alloc_data_frames(1);
        let flags = PageFlags::memory().writable().user().minpage();
        pt.map(old_v, p, PAGE_SIZE as u64, flags);

        pt.remap(new_v, old_v, PAGE_SIZE as u64);

        assert!(pt.physical_from_virtual(old_v).is_invalid());
        assert_eq!(pt.physical_from_virtual(new_v).bits(), p.bits());
    }
}
