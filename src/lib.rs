//! # taskring - Composable Task Schedulers
//!
//! A small library of task schedulers: objects that accept zero-argument
//! callables and arrange for their later execution, either on a pool of
//! background worker threads or on an external main/UI event loop.
//!
//! ## Architecture
//!
//! The centerpiece is a work-stealing [`ThreadPool`] built from per-worker
//! [`TaskQueue`]s and a small-buffer-optimized [`Task`] payload. Around it:
//!
//! - **Tasks**: move-only, one-shot containers for `FnOnce()` callables;
//!   small callables are stored inline, large ones in allocator-aware nodes
//! - **Queues**: mutex/condvar FIFOs whose non-blocking endpoints let
//!   submitters and stealing workers skip past contention
//! - **Main-thread queue**: a process-wide FIFO drained one task per signal
//!   by an external event loop
//! - **C callbacks**: packaging of owned callables into `(fn, void*)` pairs
//!   for legacy callback APIs
//!
//! Every backend implements the [`Scheduler`] trait and carries a
//! compile-time [`AVAILABLE`](Scheduler::AVAILABLE) flag so client code can
//! select a backend per build target without scattering `cfg` branches.
//!
//! ## Example
//!
//! ```
//! use taskring::{Scheduler, ThreadPool};
//!
//! let pool = ThreadPool::new(4);
//! pool.submit(|| {
//!     println!("hello from a worker thread");
//! });
//! ```

pub mod alloc;
pub mod callback;
pub mod error;
pub mod main_thread;
pub mod metrics;
pub mod pool;
pub mod queue;
pub mod scheduler;
pub mod task;

pub use alloc::{AllocError, Global, TaskAlloc};
pub use callback::{
    CCallback, CallbackPair, RawCallback, package_as_c_callback, package_as_c_callback_with,
    package_inline_c_callback, package_ref_c_callback,
};
pub use error::SpawnError;
pub use main_thread::{
    MainThreadQueue, MainThreadScheduler, MainThreadSignal, main_thread_queue,
    main_thread_trampoline, run_pending_task,
};
#[cfg(feature = "metrics")]
pub use metrics::MetricsSnapshot;
pub use pool::{FactoryFn, PinnedThreadFactory, StdThreadFactory, ThreadFactory, ThreadPool, Worker};
pub use queue::TaskQueue;
pub use scheduler::{DefaultScheduler, Scheduler, Unavailable};
pub use task::Task;
