//! The one-shot task payload.
//!
//! [`Task`] is a move-only container for a single `FnOnce()` callable, sized
//! at three pointer widths: one word of virtual dispatch plus a two-word
//! inline buffer. Callables that fit the buffer are stored in place and never
//! touch an allocator; everything else goes into a heap node that embeds a
//! copy of the allocator used to create it, so the node frees itself when the
//! task is consumed or dropped.
//!
//! The lifecycle is strict: a task is created on submission, moved through a
//! queue, and consumed exactly once by [`Task::run`] or by being dropped.

use std::alloc::Layout;
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

use crate::alloc::{AllocError, TaskAlloc};

/// Payload words available beside the dispatch word.
const INLINE_WORDS: usize = 2;

type InlineBuf = [MaybeUninit<*mut ()>; INLINE_WORDS];

/// Per-strategy dispatch table, monomorphized at construction.
struct TaskVTable {
    /// Consume the payload behind `buf` and invoke the callable.
    invoke: unsafe fn(buf: *mut InlineBuf),
    /// Destroy the payload behind `buf` without invoking it.
    drop: unsafe fn(buf: *mut InlineBuf),
}

/// Heap storage for callables that do not fit the inline buffer. The
/// allocator travels with the callable so any thread can release the node.
struct HeapNode<A, F> {
    alloc: A,
    f: F,
}

const fn fits_inline<F>() -> bool {
    size_of::<F>() <= size_of::<InlineBuf>() && align_of::<F>() <= align_of::<InlineBuf>()
}

/// A move-only, one-shot container for a `void()`-style callable.
///
/// Invocation consumes the task; dropping a task that was never run destroys
/// the callable without calling it. Both paths release heap storage exactly
/// once.
///
/// # Example
///
/// ```
/// use taskring::{Global, Task};
///
/// let task = Task::new(Global, || println!("later")).unwrap();
/// assert!(!task.is_empty());
/// task.run();
/// ```
pub struct Task {
    /// Null iff the task is empty.
    vtable: *const TaskVTable,
    buf: InlineBuf,
}

// The constructor requires `F: Send` and `TaskAlloc: Send`, which is the only
// data the buffer can hold.
unsafe impl Send for Task {}

impl Task {
    /// Wraps `f` for later execution, storing it inline when it fits and in a
    /// node allocated from `alloc` otherwise.
    ///
    /// Only the heap strategy can fail, and only if `alloc` reports an
    /// allocation failure.
    pub fn new<A, F>(alloc: A, f: F) -> Result<Self, AllocError>
    where
        A: TaskAlloc,
        F: FnOnce() + Send + 'static,
    {
        let mut buf: InlineBuf = [MaybeUninit::uninit(); INLINE_WORDS];
        let vtable = if fits_inline::<F>() {
            // SAFETY: size and alignment were just checked against the buffer
            unsafe { ptr::write(&mut buf as *mut InlineBuf as *mut F, f) };
            inline_vtable::<F>()
        } else {
            let layout = Layout::new::<HeapNode<A, F>>();
            let node = alloc.allocate(layout)?.cast::<HeapNode<A, F>>();
            // SAFETY: node is valid for writes of HeapNode<A, F>
            unsafe { ptr::write(node.as_ptr(), HeapNode { alloc, f }) };
            // SAFETY: a pointer always fits the buffer
            unsafe { ptr::write(&mut buf as *mut InlineBuf as *mut *mut HeapNode<A, F>, node.as_ptr()) };
            heap_vtable::<A, F>()
        };
        Ok(Task { vtable, buf })
    }

    /// Returns `true` iff the task holds no callable.
    pub fn is_empty(&self) -> bool {
        self.vtable.is_null()
    }

    /// Invokes the callable, consuming the task.
    ///
    /// Running an empty task is a programmer error: it is caught by a debug
    /// assertion and undefined in release builds.
    pub fn run(mut self) {
        debug_assert!(!self.is_empty(), "ran an empty task");
        let vtable = self.vtable;
        // Clear before invoking so Drop does not double-release if the
        // callable panics.
        self.vtable = ptr::null();
        // SAFETY: vtable and buffer were initialized together by `new`
        unsafe { ((*vtable).invoke)(&mut self.buf) }
    }
}

impl Default for Task {
    /// Creates an empty task.
    fn default() -> Self {
        Task {
            vtable: ptr::null(),
            buf: [MaybeUninit::uninit(); INLINE_WORDS],
        }
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        if !self.vtable.is_null() {
            let vtable = self.vtable;
            self.vtable = ptr::null();
            // SAFETY: vtable and buffer were initialized together by `new`
            unsafe { ((*vtable).drop)(&mut self.buf) }
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("empty", &self.is_empty())
            .finish()
    }
}

fn inline_vtable<F: FnOnce()>() -> &'static TaskVTable {
    &TaskVTable {
        invoke: invoke_inline::<F>,
        drop: drop_inline::<F>,
    }
}

fn heap_vtable<A: TaskAlloc, F: FnOnce()>() -> &'static TaskVTable {
    &TaskVTable {
        invoke: invoke_heap::<A, F>,
        drop: drop_heap::<A, F>,
    }
}

unsafe fn invoke_inline<F: FnOnce()>(buf: *mut InlineBuf) {
    // SAFETY: the buffer holds an initialized F; reading it out makes this a
    // destructive move, after which the buffer is dead
    let f = unsafe { ptr::read(buf as *mut F) };
    f();
}

unsafe fn drop_inline<F>(buf: *mut InlineBuf) {
    // SAFETY: the buffer holds an initialized F
    unsafe { ptr::drop_in_place(buf as *mut F) }
}

unsafe fn invoke_heap<A: TaskAlloc, F: FnOnce()>(buf: *mut InlineBuf) {
    // SAFETY: the buffer holds the node pointer written by `new`
    let node = unsafe { ptr::read(buf as *mut *mut HeapNode<A, F>) };
    // Move the contents out and release the node before the call, so the
    // storage is not leaked if the callable panics.
    let HeapNode { alloc, f } = unsafe { ptr::read(node) };
    let layout = Layout::new::<HeapNode<A, F>>();
    // SAFETY: node came from this allocator with this layout
    unsafe { alloc.deallocate(NonNull::new_unchecked(node).cast(), layout) };
    f();
}

unsafe fn drop_heap<A: TaskAlloc, F>(buf: *mut InlineBuf) {
    // SAFETY: as in invoke_heap
    let node = unsafe { ptr::read(buf as *mut *mut HeapNode<A, F>) };
    let HeapNode { alloc, f } = unsafe { ptr::read(node) };
    let layout = Layout::new::<HeapNode<A, F>>();
    unsafe { alloc.deallocate(NonNull::new_unchecked(node).cast(), layout) };
    drop(f);
}
