// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contracts for the collaborators this crate treats as external: the heap/object-cache allocators, the thread scheduler, the timer
//! wheel, and file-like objects. Only their contract is captured here —
//! none of these traits is implemented by this crate outside of
//! [`crate::test_support`].

extern crate alloc;

use core::time::Duration;

use crate::address::PhysAddr;

/// A provider of zeroed, page-sized physical frames for intermediate
/// page-table levels (the "dedicated page-table heap").
pub trait PageTableAllocator {
    /// Allocates one zeroed, page-aligned frame, or `None` on exhaustion.
    /// Exhaustion of this allocator is fatal to the page-table engine;
    /// callers of [`crate::mm::pagetable::PageTable`] are not
    /// expected to recover from `None` here, only to choose when to panic.
    fn alloc_zeroed(&self) -> Option<PhysAddr>;

    /// Returns a frame previously handed out by `alloc_zeroed`.
    fn free(&self, frame: PhysAddr);

    /// A pointer through which the `PAGE_SIZE` bytes at physical address
    /// `frame` can be read and written — the direct-map lookup the engine
    /// uses both to walk/mutate table frames and to zero freshly mapped
    /// data pages. Implementations
    /// back every frame returned by `alloc_zeroed` and every data frame
    /// passed to `map`/`map_and_zero` with memory reachable this way.
    fn map_frame(&self, frame: PhysAddr) -> core::ptr::NonNull<u8>;
}

/// A provider of fixed-size object slots, for callers that want fixed-rate
/// allocation of a single repeated type instead of going through the
/// general-purpose heap. Captured here as a contract only — this crate's
/// own readiness multiplexor allocates its registrations directly through
/// the global allocator, since nothing in its design depends on a slab's
/// fixed-rate behavior.
pub trait ObjectSlab<T> {
    fn alloc(&self) -> Option<alloc::boxed::Box<T>>;
    fn free(&self, object: alloc::boxed::Box<T>);
}

/// An opaque handle to the thread that is allowed to be suspended and
/// resumed by a [`Scheduler`].
pub type ThreadId = u64;

/// The thread scheduler, treated as an external actor that can
/// suspend the calling thread and later resume it with a prearranged
/// return value.
pub trait Scheduler {
    /// Records `value` as the return value `thread` will observe from its
    /// suspended syscall once woken.
    fn set_syscall_return(&self, thread: ThreadId, value: i64);

    /// Suspends the calling thread. Does not return until some other
    /// context calls [`Scheduler::wakeup`] for this thread.
    fn sleep(&self, thread: ThreadId);

    /// Marks `thread` runnable again.
    fn wakeup(&self, thread: ThreadId);

    /// The identity of the calling thread, used to bind a
    /// [`Waiter`](crate::fs::epoll::Waiter) to its caller.
    fn current(&self) -> ThreadId;
}

/// An opaque handle to an outstanding timer registration. No cancel API is
/// assumed — the only way to observe a timer again is for it to
/// fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerHandle(pub u64);

/// The timer wheel, treated as a service that invokes a callback after a
/// duration, at most once, with no cancellation.
pub trait TimerService {
    fn register(&self, after: Duration, callback: alloc::boxed::Box<dyn FnOnce() + Send>) -> TimerHandle;
}
