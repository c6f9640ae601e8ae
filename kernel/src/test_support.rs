// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for the external collaborators in [`crate::collab`].
//! Compiled for `#[cfg(test)]` only; none of this is reachable from a
//! release build.

extern crate alloc;

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::cell::RefCell;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;

use crate::address::{Address, PhysAddr, VirtAddr};
use crate::collab::{PageTableAllocator, Scheduler, ThreadId, TimerHandle, TimerService};
use crate::fs::epoll::{EdgeHandler, FileLike};
use crate::mm::pagetable::TlbInvalidator;
use crate::types::PAGE_SIZE;

/// A bump-allocated slab of host memory standing in for physical RAM, so
/// the page-table engine's tests can exercise real reads/writes through
/// [`PageTableAllocator::map_frame`] without a real MMU.
pub struct FakePhysMem {
    base: NonNull<u8>,
    layout: Layout,
    size: usize,
    next: AtomicU64,
}

// SAFETY: the only shared state is `next`, a bump cursor advanced with a
// single atomic fetch-add; every byte range handed out is disjoint.
unsafe impl Send for FakePhysMem {}
unsafe impl Sync for FakePhysMem {}

impl FakePhysMem {
    pub fn new(size: usize) -> Self {
        let layout = Layout::from_size_align(size, PAGE_SIZE).expect("valid test-harness layout");
        // SAFETY: `layout` has nonzero size and a power-of-two alignment.
        let base = unsafe { alloc::alloc::alloc_zeroed(layout) };
        let base = NonNull::new(base).expect("test-harness allocation failed");
        Self {
            base,
            layout,
            size,
            next: AtomicU64::new(0),
        }
    }

    fn bump(&self, bytes: u64) -> PhysAddr {
        let pages = (bytes + PAGE_SIZE as u64 - 1) / PAGE_SIZE as u64;
        let aligned = pages * PAGE_SIZE as u64;
        let offset = self.next.fetch_add(aligned, Ordering::Relaxed);
        assert!(
            offset + aligned <= self.size as u64,
            "fake physical memory exhausted in test"
        );
        PhysAddr::from(offset)
    }

    pub fn alloc_data_frames(&self, count: u64) -> PhysAddr {
        self.bump(count * PAGE_SIZE as u64)
    }

    pub fn poison_frame(&self, frame: PhysAddr) {
        // SAFETY: `frame` was handed out by this allocator and is within
        // `self.size` bytes of `self.base`.
        unsafe {
            core::ptr::write_bytes(self.base.as_ptr().add(frame.bits() as usize), 0xaa, PAGE_SIZE);
        }
    }

    pub fn frame_is_zero(&self, frame: PhysAddr) -> bool {
        // SAFETY: see `poison_frame`.
        let slice = unsafe {
            core::slice::from_raw_parts(self.base.as_ptr().add(frame.bits() as usize), PAGE_SIZE)
        };
        slice.iter().all(|&b| b == 0)
    }
}

impl PageTableAllocator for FakePhysMem {
    fn alloc_zeroed(&self) -> Option<PhysAddr> {
        Some(self.bump(PAGE_SIZE as u64))
    }

    fn free(&self, _frame: PhysAddr) {}

    fn map_frame(&self, frame: PhysAddr) -> NonNull<u8> {
        // SAFETY: every `frame` this is called with came from `bump`,
        // which only ever hands out disjoint, in-bounds ranges.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(frame.bits() as usize)) }
    }
}

impl Drop for FakePhysMem {
    fn drop(&mut self) {
        // SAFETY: `self.base`/`self.layout` are exactly what `new` used
        // to allocate, and nothing outlives `self`.
        unsafe { alloc::alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}

/// A [`TlbInvalidator`] that does nothing — correct for any test where
/// the backing "physical memory" isn't actually mapped by a real MMU.
#[derive(Default)]
pub struct NullTlb;

impl TlbInvalidator for NullTlb {
    fn invalidate_page(&self, _v: VirtAddr) {}
    fn invalidate_all(&self) {}
}

/// A single-thread [`Scheduler`]: `sleep` runs one queued action (standing
/// in for whatever would otherwise make progress on another CPU/thread)
/// and returns immediately, rather than actually blocking.
pub struct FakeScheduler {
    id: ThreadId,
    pending: RefCell<Option<Box<dyn FnOnce()>>>,
    woken: RefCell<Vec<ThreadId>>,
    last_return: RefCell<Option<i64>>,
}

impl FakeScheduler {
    pub fn new(id: ThreadId) -> Self {
        Self {
            id,
            pending: RefCell::new(None),
            woken: RefCell::new(Vec::new()),
            last_return: RefCell::new(None),
        }
    }

    /// Runs `action` the next time `sleep` is called, simulating whatever
    /// external event (a file becoming ready, a timer firing) would
    /// otherwise happen while this thread is blocked.
    pub fn on_next_sleep(&self, action: impl FnOnce() + 'static) {
        *self.pending.borrow_mut() = Some(Box::new(action));
    }

    pub fn was_woken(&self, thread: ThreadId) -> bool {
        self.woken.borrow().contains(&thread)
    }

    pub fn last_syscall_return(&self) -> Option<i64> {
        *self.last_return.borrow()
    }
}

impl Scheduler for FakeScheduler {
    fn set_syscall_return(&self, _thread: ThreadId, value: i64) {
        *self.last_return.borrow_mut() = Some(value);
    }

    fn sleep(&self, _thread: ThreadId) {
        if let Some(action) = self.pending.borrow_mut().take() {
            action();
        }
    }

    fn wakeup(&self, thread: ThreadId) {
        self.woken.borrow_mut().push(thread);
    }

    fn current(&self) -> ThreadId {
        self.id
    }
}

/// A [`TimerService`] that records registrations instead of scheduling
/// real delays, and fires them on demand via [`FakeTimerService::fire_all`].
pub struct FakeTimerService {
    next_id: RefCell<u64>,
    pending: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl Default for FakeTimerService {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTimerService {
    pub fn new() -> Self {
        Self {
            next_id: RefCell::new(0),
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Fires every registration made so far, in registration order, then
    /// clears them — there is no cancellation, so a registration already
    /// made obsolete by other progress still fires exactly like the real
    /// timer wheel would.
    pub fn fire_all(&self) {
        let callbacks = core::mem::take(&mut *self.pending.borrow_mut());
        for cb in callbacks {
            cb();
        }
    }
}

impl TimerService for FakeTimerService {
    fn register(&self, _after: Duration, callback: Box<dyn FnOnce() + Send>) -> TimerHandle {
        let mut id = self.next_id.borrow_mut();
        *id += 1;
        self.pending.borrow_mut().push(Box::new(move || callback()));
        TimerHandle(*id)
    }
}

#[derive(Default)]
struct FileState {
    readable: bool,
    hangup: bool,
    on_readable: Option<EdgeHandler>,
    on_hangup: Option<EdgeHandler>,
    checks: u32,
}

/// A [`FileLike`] whose readiness is driven entirely by test code calling
/// [`FakeFileLike::make_readable`]/[`FakeFileLike::make_hangup`]. Clones
/// share the same underlying state, matching how a real file object is
/// shared between its fd table entry and whatever holds a callback into
/// it.
#[derive(Clone, Default)]
pub struct FakeFileLike(Rc<RefCell<FileState>>);

impl FakeFileLike {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the file readable. If a caller is already armed, fires
    /// `on_readable` immediately; otherwise the next `check` fires
    /// synchronously.
    pub fn make_readable(&self) {
        let cb = {
            let mut state = self.0.borrow_mut();
            state.readable = true;
            state.on_readable.take()
        };
        if let Some(cb) = cb {
            self.0.borrow_mut().on_hangup.take();
            cb();
        }
    }

    /// Marks the file hung up. Same arming semantics as
    /// [`FakeFileLike::make_readable`], but for `on_hangup`.
    pub fn make_hangup(&self) {
        let cb = {
            let mut state = self.0.borrow_mut();
            state.hangup = true;
            state.on_hangup.take()
        };
        if let Some(cb) = cb {
            self.0.borrow_mut().on_readable.take();
            cb();
        }
    }

    /// Resets both readiness flags, simulating a real file whose
    /// condition was consumed and must be re-triggered for a future wait
    /// to observe it again.
    pub fn clear(&self) {
        let mut state = self.0.borrow_mut();
        state.readable = false;
        state.hangup = false;
    }

    /// How many times `check` has been called — used by tests to confirm
    /// a registration re-armed.
    pub fn check_count(&self) -> u32 {
        self.0.borrow().checks
    }
}

impl FileLike for FakeFileLike {
    fn check(&self, on_readable: EdgeHandler, on_hangup: EdgeHandler) {
        let mut state = self.0.borrow_mut();
        state.checks += 1;
        if state.readable {
            drop(state);
            on_readable();
            return;
        }
        if state.hangup {
            drop(state);
            on_hangup();
            return;
        }
        state.on_readable = Some(on_readable);
        state.on_hangup = Some(on_hangup);
    }
}
