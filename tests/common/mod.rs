//! Shared test instrumentation: allocators that count, and a probe that
//! distinguishes tasks that ran from tasks that were merely destroyed.
#![allow(dead_code)]

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use taskring::{AllocError, Global, TaskAlloc};

/// Counts bytes and allocations in flight; both must return to zero when
/// every payload built from it is gone.
#[derive(Clone, Default)]
pub struct TrackingAlloc {
    bytes: Arc<AtomicUsize>,
    allocations: Arc<AtomicUsize>,
}

impl TrackingAlloc {
    pub fn new() -> Self {
        TrackingAlloc::default()
    }

    pub fn bytes_outstanding(&self) -> usize {
        self.bytes.load(Ordering::SeqCst)
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }
}

impl TaskAlloc for TrackingAlloc {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let ptr = Global.allocate(layout)?;
        self.bytes.fetch_add(layout.size(), Ordering::SeqCst);
        self.allocations.fetch_add(1, Ordering::SeqCst);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.bytes.fetch_sub(layout.size(), Ordering::SeqCst);
        unsafe { Global.deallocate(ptr, layout) }
    }
}

/// Refuses every request, so allocation failure paths can be observed.
#[derive(Clone, Copy, Default)]
pub struct FailingAlloc;

impl TaskAlloc for FailingAlloc {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        Err(AllocError {
            size: layout.size(),
            align: layout.align(),
        })
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        panic!("deallocate on an allocator that never allocates");
    }
}

struct ConsumeGuard(Arc<AtomicUsize>);

impl Drop for ConsumeGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out closures that report both invocation and consumption.
///
/// `consumed` counts every closure that no longer exists, whether it ran or
/// was dropped unrun; `invoked` counts only the ones that ran. After a pool
/// is torn down, `consumed` must equal the number of closures handed out.
#[derive(Clone, Default)]
pub struct ConsumeProbe {
    invoked: Arc<AtomicUsize>,
    consumed: Arc<AtomicUsize>,
}

impl ConsumeProbe {
    pub fn new() -> Self {
        ConsumeProbe::default()
    }

    pub fn task(&self) -> impl FnOnce() + Send + 'static {
        let guard = ConsumeGuard(Arc::clone(&self.consumed));
        let invoked = Arc::clone(&self.invoked);
        move || {
            let _guard = guard;
            invoked.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// A task that panics after being counted as consumed.
    pub fn panicking_task(&self) -> impl FnOnce() + Send + 'static {
        let guard = ConsumeGuard(Arc::clone(&self.consumed));
        move || {
            let _guard = guard;
            panic!("probe task failure");
        }
    }

    pub fn invoked(&self) -> usize {
        self.invoked.load(Ordering::SeqCst)
    }

    pub fn consumed(&self) -> usize {
        self.consumed.load(Ordering::SeqCst)
    }
}
