//! The uniform scheduler surface.
//!
//! Every backend exposes the same two submit operations plus a compile-time
//! [`AVAILABLE`](Scheduler::AVAILABLE) flag, so client code can pick a
//! backend with type-level conditionals instead of `cfg` at every call site.

use crate::alloc::{AllocError, TaskAlloc};
use crate::pool::ThreadPool;

/// A value that accepts zero-argument callables for later execution.
///
/// Submission is non-blocking in the common case; it may block briefly on a
/// contended queue. Once accepted, a callable either runs or is dropped at
/// the backend's tear-down, nothing else.
pub trait Scheduler {
    /// Whether this backend can exist on the current build target. A type
    /// with `AVAILABLE == false` can still be named, but no value of it can
    /// ever be submitted to.
    const AVAILABLE: bool;

    /// Schedules `f`, allocating any payload storage from the global
    /// allocator.
    fn submit<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static;

    /// Schedules `f`, allocating any payload storage from `alloc`.
    ///
    /// Fails only if the allocator does; in that case nothing was enqueued.
    fn submit_with<A, F>(&self, alloc: A, f: F) -> Result<(), AllocError>
    where
        A: TaskAlloc,
        F: FnOnce() + Send + 'static;
}

impl<S: Scheduler> Scheduler for &S {
    const AVAILABLE: bool = S::AVAILABLE;

    fn submit<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        (**self).submit(f)
    }

    fn submit_with<A, F>(&self, alloc: A, f: F) -> Result<(), AllocError>
    where
        A: TaskAlloc,
        F: FnOnce() + Send + 'static,
    {
        (**self).submit_with(alloc, f)
    }
}

/// Building block for backends that do not exist on the current target.
///
/// The enum is uninhabited: its type can be referenced, stored in type-level
/// conditionals and asked for [`Scheduler::AVAILABLE`], but a value, and
/// therefore a submission, can never be produced.
#[derive(Debug, Clone, Copy)]
pub enum Unavailable {}

impl Scheduler for Unavailable {
    const AVAILABLE: bool = false;

    fn submit<F>(&self, _f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match *self {}
    }

    fn submit_with<A, F>(&self, _alloc: A, _f: F) -> Result<(), AllocError>
    where
        A: TaskAlloc,
        F: FnOnce() + Send + 'static,
    {
        match *self {}
    }
}

/// The best general-purpose backend for the current build target.
///
/// Platform wrappers over system pools plug in here per target; on every
/// current target this is the crate's own [`ThreadPool`].
pub type DefaultScheduler = ThreadPool;
