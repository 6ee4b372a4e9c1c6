//! Scheduling onto an external main/UI event loop.
//!
//! The main thread already has an event loop, so nothing here may ever block
//! it. Producers push a task into the process-wide [`MainThreadQueue`] and
//! then post a [`MainThreadSignal`] once per push; the event loop answers
//! each signal by calling the trampoline on the main thread, which pops at
//! most one task and runs it.
//!
//! The queue is a lazily-initialized global that is never destroyed: the
//! event loop may still hold signals referencing it after every scheduler
//! object is gone.

use std::collections::VecDeque;
use std::ffi::c_void;
use std::mem;
use std::sync::Mutex;

use lazy_static::lazy_static;

use crate::alloc::{AllocError, Global, TaskAlloc};
use crate::scheduler::Scheduler;
use crate::task::Task;

lazy_static! {
    static ref MAIN_THREAD_QUEUE: MainThreadQueue = MainThreadQueue {
        queue: Mutex::new(VecDeque::new()),
    };
}

/// The process-wide main-thread task queue.
pub fn main_thread_queue() -> &'static MainThreadQueue {
    &MAIN_THREAD_QUEUE
}

/// A FIFO read only from the main thread, in cooperation with an external
/// event loop. No operation blocks on emptiness.
pub struct MainThreadQueue {
    queue: Mutex<VecDeque<Task>>,
}

impl MainThreadQueue {
    pub fn push(&self, task: Task) {
        self.queue.lock().unwrap().push_back(task);
    }

    pub fn try_pop(&self) -> Option<Task> {
        self.queue.lock().unwrap().pop_front()
    }

    /// Drops every pending task. Called from main-thread scheduler
    /// destructors to cover signals the event loop will never deliver.
    pub fn clear(&self) {
        let drained = mem::take(&mut *self.queue.lock().unwrap());
        // Payload destructors run outside the lock.
        drop(drained);
    }
}

/// The platform primitive that wakes the external event loop.
///
/// Each [`post`](MainThreadSignal::post) must cause the event loop to later
/// call [`main_thread_trampoline`] (or [`run_pending_task`]) exactly once on
/// the main thread. An implementation that cannot deliver the wakeup (a full
/// signal pipe, say) must treat that as fatal rather than drop it silently,
/// because a lost signal strands a queued task until the next push.
pub trait MainThreadSignal {
    fn post(&self);
}

/// Runs at most one pending main-thread task.
///
/// This is the trampoline body the event loop drives, once per delivered
/// signal; calling it more often is harmless. Returns whether a task ran.
pub fn run_pending_task() -> bool {
    match main_thread_queue().try_pop() {
        Some(task) => {
            task.run();
            true
        }
        None => false,
    }
}

/// C-linkage trampoline for event loops that register raw callbacks. The
/// argument is ignored.
pub extern "C-unwind" fn main_thread_trampoline(_data: *mut c_void) {
    run_pending_task();
}

/// Submits tasks to the main thread through a [`MainThreadSignal`].
///
/// On drop the scheduler clears the global queue; tasks the event loop never
/// got around to are destroyed without running. Unregistering the signal from
/// the loop is the signal's own drop responsibility.
pub struct MainThreadScheduler<S: MainThreadSignal> {
    signal: S,
}

impl<S: MainThreadSignal> MainThreadScheduler<S> {
    pub fn new(signal: S) -> Self {
        MainThreadScheduler { signal }
    }
}

impl<S: MainThreadSignal> Scheduler for MainThreadScheduler<S> {
    const AVAILABLE: bool = true;

    fn submit<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_with(Global, f)
            .expect("global allocator failed");
    }

    fn submit_with<A, F>(&self, alloc: A, f: F) -> Result<(), AllocError>
    where
        A: TaskAlloc,
        F: FnOnce() + Send + 'static,
    {
        main_thread_queue().push(Task::new(alloc, f)?);
        self.signal.post();
        Ok(())
    }
}

impl<S: MainThreadSignal> Drop for MainThreadScheduler<S> {
    fn drop(&mut self) {
        main_thread_queue().clear();
    }
}
