mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use common::{ConsumeProbe, TrackingAlloc};
use taskring::{Scheduler, ThreadPool};

#[test]
fn teardown_under_sustained_load_joins_everything() {
    let workers = thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(3)
        .max(1);
    let probe = ConsumeProbe::new();

    let pool = ThreadPool::new(workers);
    for _ in 0..100_000 {
        pool.submit(probe.task());
    }
    // Tear down immediately; the drop must still join every worker.
    drop(pool);

    assert_eq!(probe.consumed(), 100_000);
    assert!(probe.invoked() <= 100_000);
}

#[test]
fn shutdown_waits_for_tasks_in_flight() {
    let probe = ConsumeProbe::new();
    {
        let pool = ThreadPool::new(2);
        for _ in 0..10 {
            let task = probe.task();
            pool.submit(move || {
                thread::sleep(Duration::from_millis(10));
                task();
            });
        }
    }
    assert_eq!(probe.invoked(), 10);
    assert_eq!(probe.consumed(), 10);
}

#[test]
fn no_tracked_bytes_survive_teardown() {
    let alloc = TrackingAlloc::new();
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let pool = ThreadPool::new(2);
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            // A wide capture forces every one of these through the allocator.
            let ballast = [0u8; 128];
            pool.submit_with(alloc.clone(), move || {
                counter.fetch_add(ballast.len(), Ordering::SeqCst);
            })
            .unwrap();
        }
    }
    assert_eq!(counter.load(Ordering::SeqCst), 100 * 128);
    assert_eq!(alloc.bytes_outstanding(), 0);
}

#[test]
fn repeated_pools_start_and_stop_cleanly() {
    for _ in 0..20 {
        let probe = ConsumeProbe::new();
        let pool = ThreadPool::new(3);
        for _ in 0..50 {
            pool.submit(probe.task());
        }
        drop(pool);
        assert_eq!(probe.consumed(), 50);
    }
}
