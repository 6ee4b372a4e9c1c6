mod common;

use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::ConsumeProbe;
use taskring::{
    Global, MainThreadScheduler, MainThreadSignal, Scheduler, Task, main_thread_queue,
    main_thread_trampoline, run_pending_task,
};

#[derive(Clone, Default)]
struct CountingSignal {
    posts: Arc<AtomicUsize>,
}

impl MainThreadSignal for CountingSignal {
    fn post(&self) {
        self.posts.fetch_add(1, Ordering::SeqCst);
    }
}

// The queue is process-wide state, so the whole flow lives in one test:
// parallel test threads would otherwise pop each other's tasks.
#[test]
fn main_thread_queue_end_to_end() {
    // Idle loop: a drive with nothing queued is a no-op.
    assert!(!run_pending_task());

    // Three pushes while the loop is idle, then three drives: FIFO order,
    // one task per drive.
    let order = Arc::new(Mutex::new(Vec::new()));
    for id in 0..3 {
        let order = Arc::clone(&order);
        main_thread_queue().push(Task::new(Global, move || order.lock().unwrap().push(id)).unwrap());
    }
    main_thread_trampoline(ptr::null_mut());
    assert!(run_pending_task());
    assert!(run_pending_task());
    assert!(!run_pending_task());
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);

    // A scheduler posts its signal exactly once per push.
    let signal = CountingSignal::default();
    let posts = Arc::clone(&signal.posts);
    let scheduler = MainThreadScheduler::new(signal);

    let ran = Arc::new(AtomicUsize::new(0));
    for _ in 0..2 {
        let ran = Arc::clone(&ran);
        scheduler.submit(move || {
            ran.fetch_add(1, Ordering::SeqCst);
        });
    }
    assert_eq!(posts.load(Ordering::SeqCst), 2);
    assert!(run_pending_task());
    assert_eq!(ran.load(Ordering::SeqCst), 1);

    // Dropping the scheduler clears what the loop never delivered: the
    // remaining task and this fresh one are destroyed without running.
    let probe = ConsumeProbe::new();
    scheduler.submit(probe.task());
    drop(scheduler);

    assert!(!run_pending_task());
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(probe.consumed(), 1);
    assert_eq!(probe.invoked(), 0);
}
