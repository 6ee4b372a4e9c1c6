//! The per-worker work queue.
//!
//! A plain mutex-protected FIFO with a condition variable and a terminal
//! `done` flag. The non-blocking operations use try-lock so that submitters
//! and stealing workers can skip a contended queue instead of waiting on it.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, TryLockError};

use crate::task::Task;

struct Inner {
    queue: VecDeque<Task>,
    done: bool,
}

/// An unbounded FIFO of [`Task`]s with blocking and non-blocking endpoints.
///
/// Once [`done`](TaskQueue::done) has been called the flag never clears:
/// blocked poppers drain whatever is left and then observe the end of the
/// queue.
pub struct TaskQueue {
    inner: Mutex<Inner>,
    ready: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        TaskQueue {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                done: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Appends `task`, blocking until the queue lock is available, and wakes
    /// one waiter.
    pub fn push(&self, task: Task) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.queue.push_back(task);
        }
        self.ready.notify_one();
    }

    /// Appends `task` only if the queue lock can be taken without blocking.
    ///
    /// On contention the payload is handed back untouched so the caller can
    /// retry it against another queue.
    pub fn try_push(&self, task: Task) -> Result<(), Task> {
        match self.inner.try_lock() {
            Ok(mut inner) => {
                inner.queue.push_back(task);
                drop(inner);
                self.ready.notify_one();
                Ok(())
            }
            Err(TryLockError::WouldBlock) => Err(task),
            Err(TryLockError::Poisoned(err)) => panic!("task queue poisoned: {err}"),
        }
    }

    /// Waits until a task is available or the queue is drained and done.
    ///
    /// Returns `None` only in the latter case; this is the worker's exit
    /// signal.
    pub fn pop(&self) -> Option<Task> {
        let mut inner = self.inner.lock().unwrap();
        while inner.queue.is_empty() && !inner.done {
            inner = self.ready.wait(inner).unwrap();
        }
        inner.queue.pop_front()
    }

    /// Pops the front task only if the queue lock can be taken without
    /// blocking. Items enqueued before [`done`](TaskQueue::done) may still be
    /// returned afterwards.
    pub fn try_pop(&self) -> Option<Task> {
        match self.inner.try_lock() {
            Ok(mut inner) => inner.queue.pop_front(),
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(err)) => panic!("task queue poisoned: {err}"),
        }
    }

    /// Marks the queue as finished and wakes every waiter. Irreversible.
    pub fn done(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.done = true;
        }
        self.ready.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        TaskQueue::new()
    }
}
