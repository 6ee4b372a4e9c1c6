//! The work-stealing thread pool.
//!
//! The pool owns `n` worker threads and `n` queues. Submissions pick a
//! starting queue round-robin and try a non-blocking push on each queue once
//! before falling back to a blocking push, so a contended queue never stalls
//! a submitter that has an alternative. Workers sweep all queues with
//! non-blocking pops before parking on their own, which keeps them fed under
//! bursty load without thundering on shared state.
//!
//! Thread creation goes through a [`ThreadFactory`], the seam hosts use to
//! adapt worker threads (naming, pinning, attaching a language runtime)
//! before the worker loop starts.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_utils::CachePadded;
use tracing::{debug, warn};

use crate::alloc::{AllocError, Global, TaskAlloc};
use crate::error::SpawnError;
#[cfg(feature = "metrics")]
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::queue::TaskQueue;
use crate::scheduler::Scheduler;
use crate::task::Task;

/// How many sweeps over all queues a worker makes before it blocks on its
/// own, so momentary emptiness does not flap it between stealing and parking.
const STEAL_ROUNDS: usize = 8;

struct PoolShared {
    queues: Box<[CachePadded<TaskQueue>]>,
    /// Round-robin submission cursor. A hint only: relaxed ordering and
    /// wrap-around are fine.
    next: AtomicUsize,
    #[cfg(feature = "metrics")]
    metrics: Metrics,
}

/// One worker's view of the pool, handed to the [`ThreadFactory`].
///
/// The factory must arrange for [`run`](Worker::run) to be called on a newly
/// created OS thread and return a joinable handle for it.
pub struct Worker {
    shared: Arc<PoolShared>,
    index: usize,
}

impl Worker {
    /// Zero-based index of this worker within the pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// This worker's own queue.
    pub fn queue(&self) -> &TaskQueue {
        &self.shared.queues[self.index]
    }

    /// The worker loop: steal-sweep, then block on the own queue, run the
    /// task, repeat until the own queue reports drained-and-done.
    ///
    /// Task panics are not caught here; workers are not panic firewalls. A
    /// panicking task unwinds the worker thread and surfaces as a join error
    /// when the pool is dropped.
    pub fn run(self) {
        let queues = &self.shared.queues;
        let n = queues.len();
        loop {
            let mut task = None;
            for j in 0..n * STEAL_ROUNDS {
                let target = (self.index + j) % n;
                if let Some(t) = queues[target].try_pop() {
                    #[cfg(feature = "metrics")]
                    if target != self.index {
                        self.shared.metrics.queue_steals.fetch_add(1, Ordering::Relaxed);
                    }
                    task = Some(t);
                    break;
                }
            }
            let Some(task) = task.or_else(|| queues[self.index].pop()) else {
                break;
            };
            task.run();
            #[cfg(feature = "metrics")]
            self.shared.metrics.tasks_executed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Creates and launches the pool's worker threads.
///
/// Called once per worker during pool construction. The returned handle must
/// own a newly created OS thread that calls [`Worker::run`] and exits in a
/// timely fashion once it returns.
pub trait ThreadFactory {
    fn spawn(&mut self, worker: Worker) -> io::Result<JoinHandle<()>>;
}

/// Adapts a closure into a [`ThreadFactory`].
pub struct FactoryFn<F>(pub F);

impl<F> ThreadFactory for FactoryFn<F>
where
    F: FnMut(Worker) -> io::Result<JoinHandle<()>>,
{
    fn spawn(&mut self, worker: Worker) -> io::Result<JoinHandle<()>> {
        (self.0)(worker)
    }
}

/// The default factory: named threads, no further adaptation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdThreadFactory;

impl ThreadFactory for StdThreadFactory {
    fn spawn(&mut self, worker: Worker) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("taskring-worker-{}", worker.index()))
            .spawn(move || worker.run())
    }
}

/// A factory that pins each worker to a CPU core, round-robin over the cores
/// the OS reports. Falls back to unpinned threads when the core list is
/// unavailable.
#[derive(Debug, Clone)]
pub struct PinnedThreadFactory {
    cores: Vec<core_affinity::CoreId>,
}

impl Default for PinnedThreadFactory {
    fn default() -> Self {
        PinnedThreadFactory {
            cores: core_affinity::get_core_ids().unwrap_or_default(),
        }
    }
}

impl ThreadFactory for PinnedThreadFactory {
    fn spawn(&mut self, worker: Worker) -> io::Result<JoinHandle<()>> {
        let core = if self.cores.is_empty() {
            None
        } else {
            Some(self.cores[worker.index() % self.cores.len()])
        };
        thread::Builder::new()
            .name(format!("taskring-worker-{}", worker.index()))
            .spawn(move || {
                if let Some(core) = core {
                    core_affinity::set_for_current(core);
                }
                worker.run()
            })
    }
}

/// A fixed-size pool of worker threads fed by per-worker stealing queues.
///
/// Dropping the pool signals every queue, joins every worker, and destroys
/// whatever tasks were still queued without running them.
///
/// # Example
///
/// ```
/// use taskring::{Scheduler, ThreadPool};
///
/// let pool = ThreadPool::new(2);
/// pool.submit(|| {
///     // runs on a worker thread
/// });
/// ```
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    threads: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_workers", &self.threads.len())
            .finish()
    }
}

impl ThreadPool {
    /// Creates a pool of `num_threads` workers (clamped to at least one)
    /// using [`StdThreadFactory`].
    ///
    /// # Panics
    ///
    /// Panics if a worker thread cannot be spawned, like `thread::spawn`.
    pub fn new(num_threads: usize) -> Self {
        ThreadPool::with_factory(StdThreadFactory, num_threads)
            .expect("failed to spawn pool worker thread")
    }

    /// Creates a pool with one worker per available CPU.
    pub fn with_default_threads() -> Self {
        let num_cpus = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        ThreadPool::new(num_cpus)
    }

    /// Creates a pool whose threads are produced by `factory`.
    ///
    /// If the factory fails partway, the workers it already started are
    /// signalled and joined before the error is returned.
    pub fn with_factory<F>(mut factory: F, num_threads: usize) -> Result<Self, SpawnError>
    where
        F: ThreadFactory,
    {
        let num_threads = num_threads.max(1);
        let queues: Box<[CachePadded<TaskQueue>]> = (0..num_threads)
            .map(|_| CachePadded::new(TaskQueue::new()))
            .collect();
        let shared = Arc::new(PoolShared {
            queues,
            next: AtomicUsize::new(0),
            #[cfg(feature = "metrics")]
            metrics: Metrics::default(),
        });

        let mut threads = Vec::with_capacity(num_threads);
        for index in 0..num_threads {
            let worker = Worker {
                shared: Arc::clone(&shared),
                index,
            };
            match factory.spawn(worker) {
                Ok(handle) => threads.push(handle),
                Err(source) => {
                    for queue in shared.queues.iter() {
                        queue.done();
                    }
                    for handle in threads {
                        let _ = handle.join();
                    }
                    return Err(SpawnError { index, source });
                }
            }
        }
        debug!(num_threads, "thread pool started");
        Ok(ThreadPool { shared, threads })
    }

    /// The number of worker threads, fixed at construction.
    pub fn num_workers(&self) -> usize {
        self.shared.queues.len()
    }

    /// A snapshot of the pool's counters.
    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    fn schedule(&self, mut task: Task) {
        #[cfg(feature = "metrics")]
        self.shared.metrics.tasks_submitted.fetch_add(1, Ordering::Relaxed);

        let queues = &self.shared.queues;
        let n = queues.len();
        let start = self.shared.next.fetch_add(1, Ordering::Relaxed);
        for k in 0..n {
            match queues[start.wrapping_add(k) % n].try_push(task) {
                Ok(()) => return,
                Err(returned) => task = returned,
            }
        }
        #[cfg(feature = "metrics")]
        self.shared.metrics.blocking_pushes.fetch_add(1, Ordering::Relaxed);
        queues[start % n].push(task);
    }
}

impl Scheduler for ThreadPool {
    const AVAILABLE: bool = true;

    fn submit<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // Global reports failure by diverging, so this cannot return Err.
        self.submit_with(Global, f)
            .expect("global allocator failed");
    }

    fn submit_with<A, F>(&self, alloc: A, f: F) -> Result<(), AllocError>
    where
        A: TaskAlloc,
        F: FnOnce() + Send + 'static,
    {
        self.schedule(Task::new(alloc, f)?);
        Ok(())
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        ThreadPool::with_default_threads()
    }
}

impl Drop for ThreadPool {
    /// Blocks until every worker has exited.
    ///
    /// Must not run on a thread owned by this pool, or it deadlocks joining
    /// itself.
    fn drop(&mut self) {
        for queue in self.shared.queues.iter() {
            queue.done();
        }
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().map(str::to_owned);
            if handle.join().is_err() {
                warn!(
                    thread = name.as_deref().unwrap_or("<unnamed>"),
                    "worker thread panicked"
                );
            }
        }
        debug!("thread pool stopped");
    }
}
