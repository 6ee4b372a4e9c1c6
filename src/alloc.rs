//! Allocation hooks for task storage.
//!
//! Payloads that do not fit their container's inline buffer are stored in a
//! heap node allocated through a [`TaskAlloc`]. The allocator is cloned into
//! the node itself so the node can free its own storage on destruction, no
//! matter which thread drops it.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use thiserror::Error;

/// An allocation request could not be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("allocation of {size} bytes (align {align}) failed")]
pub struct AllocError {
    pub size: usize,
    pub align: usize,
}

/// Raw memory provider for task and callback nodes.
///
/// Implementations are cheap to clone; a copy is embedded in every heap node
/// so deallocation needs no external context. Zero-sized layouts must be
/// supported by returning a dangling pointer aligned to `layout.align()`, and
/// `deallocate` must accept that pointer back.
pub trait TaskAlloc: Clone + Send + 'static {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// # Safety
    ///
    /// `ptr` must have been returned by [`allocate`](TaskAlloc::allocate) on
    /// an equal allocator with the same `layout`, and not deallocated since.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process-wide allocator.
///
/// Failure is reported through [`std::alloc::handle_alloc_error`] like every
/// other global allocation in the program, so [`allocate`](TaskAlloc::allocate)
/// never actually returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Global;

impl TaskAlloc for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            // SAFETY: alignments are non-zero powers of two
            return Ok(unsafe { NonNull::new_unchecked(layout.align() as *mut u8) });
        }
        // SAFETY: layout has non-zero size
        let ptr = unsafe { alloc::alloc(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => Ok(ptr),
            None => alloc::handle_alloc_error(layout),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            // SAFETY: ptr came from alloc::alloc with this layout
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
        }
    }
}
