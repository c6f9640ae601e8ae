// SPDX-License-Identifier: MIT OR Apache-2.0

//! The readiness multiplexor: `epoll`-style registration and
//! edge-triggered wakeup over [`FileLike`] collaborators, built on the
//! [`Scheduler`] and [`TimerService`] contracts in [`crate::collab`].
//!
//! A [`Bitmap`] tracks which fd slots currently hold a live (non-zombie)
//! registration, and [`Epoll::wait`] scans it to decide what to arm instead
//! of taking a caller-supplied fd list. `Waiter` is heap-allocated and
//! explicitly refcounted rather than stack-allocated, because
//! [`TimerService`] offers no cancellation: once [`Epoll::wait`] arms a
//! timeout, the timer's callback may still fire after the wait has already
//! resolved through a ready file, so the node it touches must outlive the
//! call that woke it first.

extern crate alloc;

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use core::time::Duration;

use bitflags::bitflags;
use intrusive_collections::{intrusive_adapter, LinkedList, LinkedListLink, UnsafeRef};
use log::trace;

use crate::collab::{Scheduler, ThreadId, TimerService};
use crate::error::KernelError;
use crate::locking::SpinLock;
use crate::mm::bitmap::Bitmap;

bitflags! {
    /// Wire-compatible readiness event mask. Only [`EpollEvents::IN`] and
    /// [`EpollEvents::HUP`] are ever produced by this engine — the rest
    /// exist so the type matches the shape callers expect, not because
    /// this crate generates them.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct EpollEvents: u32 {
        const IN  = 0x001;
        const PRI = 0x002;
        const OUT = 0x004;
        const ERR = 0x008;
        const HUP = 0x010;
        const ET  = 1 << 31;
    }
}

/// `EPOLL_CTL_*`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpollOp {
    Add,
    Mod,
    Del,
}

/// One delivered readiness event: the cookie supplied at `ADD` time and
/// the bits that fired. Mirrors the conventional `{u64 cookie; u32 events}`
/// wire layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpollEvent {
    pub cookie: u64,
    pub events: EpollEvents,
}

/// A watchable file-like object. `check` is the edge-triggered arming
/// call: it installs `on_readable`/`on_hangup` to be invoked the next time
/// the respective condition holds, and may invoke one of them
/// synchronously before returning if the condition already holds. Each
/// handler fires at most once per `check` call; only one of the two ever
/// fires for a given installation.
pub type EdgeHandler = Box<dyn FnOnce() + Send>;

pub trait FileLike {
    fn check(&self, on_readable: EdgeHandler, on_hangup: EdgeHandler);
}

/// One watched file descriptor. Refcount = 1 (held by the multiplexor's
/// table) + 1 per outstanding in-flight `check`. `zombie` is set by `DEL`;
/// any in-flight callback that observes it drops its event instead of
/// delivering it, releasing its reference without touching the waiter.
struct Registration {
    cookie: u64,
    interest: EpollEvents,
    file: Box<dyn FileLike>,
    refcount: AtomicU64,
    registered: AtomicBool,
    zombie: AtomicBool,
}

impl Registration {
    fn new_boxed(cookie: u64, interest: EpollEvents, file: Box<dyn FileLike>) -> *const Registration {
        Box::into_raw(Box::new(Registration {
            cookie,
            interest,
            file,
            refcount: AtomicU64::new(1),
            registered: AtomicBool::new(false),
            zombie: AtomicBool::new(false),
        }))
    }

    fn interest(&self) -> EpollEvents {
        self.interest
    }

    fn acquire(ptr: *const Registration) {
        // SAFETY: `ptr` is only released once every acquirer has called
        // `release`, so it stays live for this increment.
        unsafe { (*ptr).refcount.fetch_add(1, Ordering::Relaxed) };
    }

    /// Drops one reference, freeing the registration (and its `file`) the
    /// instant the count hits zero.
    ///
    /// # Safety
    /// `ptr` must have come from [`Registration::new_boxed`] and this call
    /// must account for exactly one reference acquired on it.
    unsafe fn release(ptr: *const Registration) {
        // SAFETY: see the function's `# Safety` section.
        let last = unsafe { (*ptr).refcount.fetch_sub(1, Ordering::AcqRel) == 1 };
        if last {
            // SAFETY: the refcount just hit zero, so no other acquirer can
            // still be holding or racing on `ptr`.
            drop(unsafe { Box::from_raw(ptr as *mut Registration) });
        }
    }
}

/// A table slot pointing at a live [`Registration`]. Wrapping the raw
/// pointer lets the slot vector live inside [`EpollInner`], which the
/// [`SpinLock`] guarding it makes safe to share across threads.
#[derive(Clone, Copy)]
struct RegPtr(*const Registration);

// SAFETY: every access to the pointee goes through `Epoll::inner`'s lock
// or through the atomics on `Registration` itself.
unsafe impl Send for RegPtr {}
unsafe impl Sync for RegPtr {}

/// One blocked caller inside `wait`. Refcount = 1 (for being on the
/// blocked list / owned by the suspended caller) + 1 per outstanding armed
/// check + 1 if a timer is still outstanding after the thread wakes.
///
/// The "+1 per armed check" share is not in the literal refcounting
/// formula; see `DESIGN.md` for why it's needed here.
struct Waiter {
    thread: ThreadId,
    refcount: AtomicU64,
    finished: AtomicBool,
    capacity: usize,
    results: SpinLock<Vec<EpollEvent>>,
    link: LinkedListLink,
}

intrusive_adapter!(WaiterAdapter = UnsafeRef<Waiter>: Waiter { link: LinkedListLink });

/// Carries a non-`Send` value across the `Send` boundary `Box<dyn FnOnce()
/// + Send>` callbacks require. Used here only for the `&'static dyn
/// Scheduler` reference, a kernel-global singleton callable from any
/// context by construction.
struct AssertSend<T>(T);
// SAFETY: only ever constructed around a `&'static dyn Scheduler`, which is
// callable from any thread/context by construction even though the `dyn`
// reference itself is not auto-`Send`.
unsafe impl<T> Send for AssertSend<T> {}

impl Waiter {
    /// Allocates a waiter with one reference — the one `wait()` itself
    /// holds for the duration of the call.
    fn new(thread: ThreadId, capacity: usize) -> *const Waiter {
        Box::into_raw(Box::new(Waiter {
            thread,
            refcount: AtomicU64::new(1),
            finished: AtomicBool::new(false),
            capacity,
            results: SpinLock::new(Vec::new()),
            link: LinkedListLink::new(),
        }))
    }

    fn acquire(ptr: *const Waiter) {
        // SAFETY: see `Registration::acquire`.
        unsafe { (*ptr).refcount.fetch_add(1, Ordering::Relaxed) };
    }

    /// # Safety
    /// `ptr` must have come from [`Waiter::new`] and this call must account
    /// for exactly one reference acquired on it.
    unsafe fn release(ptr: *const Waiter) {
        // SAFETY: see the function's `# Safety` section.
        let last = unsafe { (*ptr).refcount.fetch_sub(1, Ordering::AcqRel) == 1 };
        if last {
            // SAFETY: the refcount just hit zero, so no other acquirer can
            // still be holding or racing on `ptr`.
            drop(unsafe { Box::from_raw(ptr as *mut Waiter) });
        }
    }

    /// Appends `event` if the caller's event buffer has remaining
    /// capacity, then resolves the wait the first time any acquirer
    /// reports readiness or a timeout. Always releases its own reference
    /// before returning.
    fn append_and_maybe_wake(ptr: *const Waiter, event: EpollEvent, scheduler: &dyn Scheduler) {
        // SAFETY: the caller holds one of the acquired references.
        let node = unsafe { &*ptr };
        {
            let mut results = node.results.lock();
            if results.len() < node.capacity {
                results.push(event);
            }
        }
        Self::finish(ptr, scheduler);
        // SAFETY: releases exactly the reference this call was given.
        unsafe { Self::release(ptr) };
    }

    /// The timeout path. No cancellation exists for an armed
    /// [`TimerService`] registration, so this may run after a check has
    /// already resolved the wait; `finish`'s `finished` gate makes the
    /// wakeup idempotent, and this call's own `release` is what frees the
    /// node when the timer turns out to hold the last reference.
    fn time_out(ptr: *const Waiter, scheduler: &dyn Scheduler) {
        Self::finish(ptr, scheduler);
        // SAFETY: releases exactly the reference this call was given.
        unsafe { Self::release(ptr) };
    }

    /// spec.md §4.3 "Finish": the first acquirer to resolve this waiter —
    /// a callback firing or a timeout racing it — records the event count
    /// produced so far as the syscall return value `scheduler.current()`'s
    /// thread will observe once woken, then wakes it. Later
    /// acquirers observe `finished` already set and do nothing beyond
    /// their own release.
    fn finish(ptr: *const Waiter, scheduler: &dyn Scheduler) {
        // SAFETY: the caller holds one of the acquired references.
        let node = unsafe { &*ptr };
        if !node.finished.swap(true, Ordering::AcqRel) {
            let count = node.results.lock().len() as i64;
            scheduler.set_syscall_return(node.thread, count);
            scheduler.wakeup(node.thread);
        }
    }
}

/// The shared state behind one armed `check()` call: exactly one
/// `Registration` reference and one `Waiter` reference, consumed by
/// whichever of `on_readable`/`on_hangup` fires first (the `FileLike`
/// contract guarantees at most one of them ever does), or released by
/// `Drop` if neither does.
struct Arming {
    reg: *const Registration,
    waiter: *const Waiter,
    scheduler: &'static dyn Scheduler,
    spent: AtomicBool,
}

// SAFETY: `reg`/`waiter` are touched only through their own atomics and
// locks; `scheduler` is a `&'static dyn Scheduler` kernel singleton.
unsafe impl Send for Arming {}
unsafe impl Sync for Arming {}

impl Arming {
    fn fire(&self, kind: EpollEvents) {
        if self.spent.swap(true, Ordering::AcqRel) {
            return;
        }
        // SAFETY: this call owns the one reg/waiter reference pair
        // acquired for this arming, proven live by `spent` gating every
        // other path from touching them again.
        let reg = unsafe { &*self.reg };
        reg.registered.store(false, Ordering::Release);
        if reg.zombie.load(Ordering::Acquire) {
            // Logically deleted: drop the event and release our own
            // waiter reference without touching its finished/wakeup
            // state — whatever resolved the wait already did so without
            // our help.
            // SAFETY: `self.waiter` is the one reference this arming owns,
            // gated by `spent` above so no other path releases it too.
            unsafe { Waiter::release(self.waiter) };
        } else {
            let event = EpollEvent { cookie: reg.cookie, events: kind };
            Waiter::append_and_maybe_wake(self.waiter, event, self.scheduler);
        }
        // SAFETY: `self.reg` is the one reference this arming owns, gated
        // by `spent` above so no other path releases it too.
        unsafe { Registration::release(self.reg) };
    }
}

impl Drop for Arming {
    fn drop(&mut self) {
        if !self.spent.swap(true, Ordering::AcqRel) {
            // Neither edge ever fired — the file dropped both callbacks
            // without the condition holding.
            // SAFETY: `spent` was false, so this arming's reg/waiter
            // references haven't been released by `fire` yet.
            unsafe {
                Waiter::release(self.waiter);
                Registration::release(self.reg);
            }
        }
    }
}

const INITIAL_TABLE_CAPACITY: usize = 8;

/// How long `wait` is willing to suspend: `-1` is infinite, `0` polls
/// without ever sleeping, `>0` bounds the sleep with a timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitTimeout {
    Infinite,
    Poll,
    Bounded(Duration),
}

impl WaitTimeout {
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            ms if ms < 0 => WaitTimeout::Infinite,
            0 => WaitTimeout::Poll,
            ms => WaitTimeout::Bounded(Duration::from_millis(ms as u64)),
        }
    }
}

struct EpollInner {
    table: alloc::vec::Vec<Option<RegPtr>>,
    watched: Bitmap,
    blocked: LinkedList<WaiterAdapter>,
}

impl EpollInner {
    fn ensure_slot(&mut self, fd: u64) {
        let idx = fd as usize;
        if idx >= self.table.len() {
            self.table.resize(idx + 1, None);
        }
    }
}

/// One multiplexor instance (one `epoll_create`d descriptor).
pub struct Epoll {
    inner: SpinLock<EpollInner>,
}

impl fmt::Debug for Epoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Epoll").finish_non_exhaustive()
    }
}

impl Default for Epoll {
    fn default() -> Self {
        Self::create()
    }
}

impl Epoll {
    /// Allocates a fresh instance with an empty blocked list and an empty
    /// registration table pre-sized to [`INITIAL_TABLE_CAPACITY`], growing
    /// on demand as fds are added.
    pub fn create() -> Self {
        Self {
            inner: SpinLock::new(EpollInner {
                table: alloc::vec::Vec::with_capacity(INITIAL_TABLE_CAPACITY),
                watched: Bitmap::new(u64::MAX),
                blocked: LinkedList::new(WaiterAdapter::new()),
            }),
        }
    }

    /// `EPOLL_CTL_ADD`. Allocates a registration with refcount 1, stores
    /// it at slot `fd`, and sets bit `fd`. Calling this on an `fd` that
    /// already has a live registration is a programming error.
    pub fn add(&self, fd: u64, cookie: u64, interest: EpollEvents, file: Box<dyn FileLike>) {
        let ptr = Registration::new_boxed(cookie, interest, file);
        let mut inner = self.inner.lock();
        inner.ensure_slot(fd);
        debug_assert!(
            inner.table[fd as usize].is_none(),
            "ADD on an fd with a live registration is a programming error"
        );
        inner.table[fd as usize] = Some(RegPtr(ptr));
        inner.watched.set(fd, true).expect("watch-set bitmap exhausted");
        trace!("epoll: ADD fd={fd} cookie={cookie:#x}");
    }

    /// `EPOLL_CTL_MOD`. Not implemented: the event mask and cookie of an
    /// existing registration cannot currently be updated.
    pub fn modify(&self, fd: u64, _cookie: u64, _interest: EpollEvents) {
        log::warn!("epoll: MOD is unimplemented; ignoring request for fd={fd}");
    }

    /// `EPOLL_CTL_DEL`. Marks the registration zombie, clears the table
    /// slot and the bitmap bit, and releases the table's reference. Any
    /// in-flight callback still sees the object and observes `zombie`.
    pub fn del(&self, fd: u64) -> Result<(), KernelError> {
        let mut inner = self.inner.lock();
        let slot = inner.table.get_mut(fd as usize).and_then(Option::take);
        match slot {
            Some(RegPtr(ptr)) => {
                let _ = inner.watched.set(fd, false);
                // SAFETY: `ptr` came from a live table slot.
                unsafe { (*ptr).zombie.store(true, Ordering::Release) };
                trace!("epoll: DEL fd={fd}");
                unsafe { Registration::release(ptr) };
                Ok(())
            }
            None => Err(KernelError::BadFd),
        }
    }

    /// Closes the multiplexor: releases every registration as if by `DEL`
    /// and wakes every outstanding waiter so its suspended `wait()` call
    /// returns with whatever events it already collected, without waiting
    /// for any outstanding timer to drain first — a timer that fires after
    /// close finds `finished` already set and becomes a no-op, same as a
    /// timer racing a callback during a live `wait`. See `DESIGN.md` for
    /// why this crate resolves the open "draining timers" question this way.
    pub fn close(&self, scheduler: &'static dyn Scheduler) {
        let mut inner = self.inner.lock();
        for slot in inner.table.iter_mut() {
            if let Some(RegPtr(ptr)) = slot.take() {
                // SAFETY: `ptr` came from a live table slot.
                unsafe {
                    (*ptr).zombie.store(true, Ordering::Release);
                    Registration::release(ptr);
                }
            }
        }
        inner.watched = Bitmap::new(u64::MAX);

        let mut cursor = inner.blocked.front_mut();
        while let Some(waiter) = cursor.get() {
            Waiter::finish(waiter, scheduler);
            cursor.move_next();
        }
        trace!("epoll: close");
    }

    /// Blocks the calling thread until at least one registered fd becomes
    /// ready or `timeout` elapses, returning every event observed (up to
    /// `maxevents`). `scheduler` and `timer` are assumed to be long-lived
    /// kernel singletons.
    pub fn wait(
        &self,
        maxevents: usize,
        timeout: WaitTimeout,
        scheduler: &'static dyn Scheduler,
        timer: &'static dyn TimerService,
    ) -> Vec<EpollEvent> {
        let waiter_ptr = Waiter::new(scheduler.current(), maxevents);
        let send_scheduler = AssertSend(scheduler);

        // Publish before arming anything, so a callback that fires while
        // we're still walking the table has somewhere to deliver into.
        {
            let mut inner = self.inner.lock();
            // SAFETY: `waiter_ptr` is valid and not yet linked anywhere.
            inner.blocked.push_back(unsafe { UnsafeRef::from_raw(waiter_ptr) });
        }

        {
            let inner = self.inner.lock();
            for fd in inner.watched.iter_set() {
                let Some(RegPtr(reg_ptr)) = inner.table.get(fd as usize).copied().flatten() else {
                    continue;
                };
                // SAFETY: `reg_ptr` came from a live table slot under
                // `inner`'s lock, which we're still holding.
                let reg = unsafe { &*reg_ptr };
                if reg.registered.swap(true, Ordering::AcqRel) {
                    continue; // already armed from an earlier wait
                }
                Registration::acquire(reg_ptr);
                Waiter::acquire(waiter_ptr);
                trace!("epoll: arming fd={fd} cookie={:#x} interest={:?}", reg.cookie, reg.interest());

                let arming = Arc::new(Arming {
                    reg: reg_ptr,
                    waiter: waiter_ptr,
                    scheduler: send_scheduler.0,
                    spent: AtomicBool::new(false),
                });
                let on_readable: EdgeHandler = {
                    let arming = arming.clone();
                    Box::new(move || arming.fire(EpollEvents::IN))
                };
                let on_hangup: EdgeHandler = Box::new(move || arming.fire(EpollEvents::HUP));
                reg.file.check(on_readable, on_hangup);
            }
        }

        // SAFETY: `waiter_ptr` is still linked; nothing frees it before
        // we remove it below.
        let node = unsafe { &*waiter_ptr };

        if !node.finished.load(Ordering::Acquire) {
            match timeout {
                WaitTimeout::Poll => {}
                WaitTimeout::Bounded(after) => {
                    Waiter::acquire(waiter_ptr);
                    let send_ptr = AssertSend(waiter_ptr);
                    timer.register(
                        after,
                        Box::new(move || Waiter::time_out(send_ptr.0, send_scheduler.0)),
                    );
                    while !node.finished.load(Ordering::Acquire) {
                        scheduler.sleep(node.thread);
                    }
                }
                WaitTimeout::Infinite => {
                    while !node.finished.load(Ordering::Acquire) {
                        scheduler.sleep(node.thread);
                    }
                }
            }
        }

        {
            let mut inner = self.inner.lock();
            // SAFETY: `waiter_ptr` was pushed above and nothing else
            // removes it.
            let mut cursor = unsafe { inner.blocked.cursor_mut_from_ptr(waiter_ptr) };
            cursor.remove();
        }

        let results = core::mem::take(&mut *node.results.lock());
        trace!("epoll: wait resolved with {} event(s)", results.len());
        // SAFETY: drops the reference `wait` acquired for itself at entry.
        unsafe { Waiter::release(waiter_ptr) };
        results
    }
}

/// Documented stand-in for `select`. Returns [`KernelError::Unimplemented`]
/// immediately — inventing `select`'s readiness-delta-over-three-fd-sets
/// semantics is out of scope, but the entry point exists so the design
/// obligation stays visible in the type signature.
pub fn select_stub(_fds: &[u64], _timeout: Option<Duration>) -> Result<(), KernelError> {
    Err(KernelError::Unimplemented)
}

/// `pselect6`, same status as [`select_stub`].
pub fn pselect6_stub(_fds: &[u64], _timeout: Option<Duration>, _sigmask: Option<u64>) -> Result<(), KernelError> {
    Err(KernelError::Unimplemented)
}

/// The syscall-facing shim: converts between the errno-free core above and
/// the conventional negative-errno return convention, through a process's
/// fd table treated as an external collaborator.
pub mod syscall {
    use alloc::boxed::Box;
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use core::time::Duration;

    use crate::collab::{Scheduler, TimerService};
    use crate::error::{errno_of, KernelError};

    use super::{pselect6_stub, select_stub, Epoll, EpollEvent, EpollEvents, EpollOp, FileLike, WaitTimeout};

    /// A process's table of open `epoll` descriptors, treated as an
    /// external collaborator: this shim only ever sees fd-sized integers.
    pub trait EpollTable {
        fn insert(&self, epoll: Arc<Epoll>) -> i32;
        fn lookup(&self, epfd: i32) -> Option<Arc<Epoll>>;
        fn remove(&self, epfd: i32);
    }

    /// `epoll_create1`. `flags` (e.g. `EPOLL_CLOEXEC`) is accepted but not
    /// interpreted here.
    pub fn epoll_create1(table: &dyn EpollTable, _flags: i32) -> i64 {
        table.insert(Arc::new(Epoll::create())) as i64
    }

    /// `epoll_create`. `size_hint` is a legacy sizing hint with no effect
    /// on the table's actual growth policy.
    pub fn epoll_create(table: &dyn EpollTable, _size_hint: i32) -> i64 {
        epoll_create1(table, 0)
    }

    /// The generic `close(2)` path for an `epoll` fd: releases every
    /// registration and wakes every outstanding waiter before dropping the
    /// table's own `Arc`, matching `Epoll::close`'s contract.
    pub fn epoll_close(table: &dyn EpollTable, epfd: i32, scheduler: &'static dyn Scheduler) -> i64 {
        let Some(epoll) = table.lookup(epfd) else {
            return errno_of(KernelError::BadFd);
        };
        epoll.close(scheduler);
        table.remove(epfd);
        0
    }

    #[allow(clippy::too_many_arguments)]
    pub fn epoll_ctl(
        table: &dyn EpollTable,
        epfd: i32,
        op: EpollOp,
        fd: u64,
        cookie: u64,
        interest: EpollEvents,
        file: Option<Box<dyn FileLike>>,
    ) -> i64 {
        let Some(epoll) = table.lookup(epfd) else {
            return errno_of(KernelError::BadFd);
        };
        match op {
            EpollOp::Add => match file {
                Some(f) => {
                    epoll.add(fd, cookie, interest, f);
                    0
                }
                None => errno_of(KernelError::BadFd),
            },
            EpollOp::Mod => {
                epoll.modify(fd, cookie, interest);
                0
            }
            EpollOp::Del => match epoll.del(fd) {
                Ok(()) => 0,
                Err(e) => errno_of(e),
            },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn do_wait(
        table: &dyn EpollTable,
        epfd: i32,
        events: &mut Vec<EpollEvent>,
        maxevents: usize,
        timeout_ms: i64,
        scheduler: &'static dyn Scheduler,
        timer: &'static dyn TimerService,
    ) -> i64 {
        let Some(epoll) = table.lookup(epfd) else {
            return errno_of(KernelError::BadFd);
        };
        let results = epoll.wait(maxevents, WaitTimeout::from_millis(timeout_ms), scheduler, timer);
        let count = results.len() as i64;
        *events = results;
        count
    }

    #[allow(clippy::too_many_arguments)]
    pub fn epoll_wait(
        table: &dyn EpollTable,
        epfd: i32,
        events: &mut Vec<EpollEvent>,
        maxevents: usize,
        timeout_ms: i64,
        scheduler: &'static dyn Scheduler,
        timer: &'static dyn TimerService,
    ) -> i64 {
        do_wait(table, epfd, events, maxevents, timeout_ms, scheduler, timer)
    }

    /// `epoll_pwait`; the signal mask argument is accepted but ignored.
    #[allow(clippy::too_many_arguments)]
    pub fn epoll_pwait(
        table: &dyn EpollTable,
        epfd: i32,
        events: &mut Vec<EpollEvent>,
        maxevents: usize,
        timeout_ms: i64,
        _sigmask: Option<u64>,
        scheduler: &'static dyn Scheduler,
        timer: &'static dyn TimerService,
    ) -> i64 {
        do_wait(table, epfd, events, maxevents, timeout_ms, scheduler, timer)
    }

    pub fn select(fds: &[u64], timeout: Option<Duration>) -> i64 {
        match select_stub(fds, timeout) {
            Ok(()) => 0,
            Err(e) => errno_of(e),
        }
    }

    pub fn pselect6(fds: &[u64], timeout: Option<Duration>, sigmask: Option<u64>) -> i64 {
        match pselect6_stub(fds, timeout, sigmask) {
            Ok(()) => 0,
            Err(e) => errno_of(e),
        }
    }
}
