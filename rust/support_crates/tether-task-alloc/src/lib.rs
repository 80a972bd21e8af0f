//! The foreign task allocator: the one allocator whose blocks may change owners across
//! the component boundary.
//!
//! Memory handed to foreign code must come from the allocator that foreign code will
//! eventually free it with, and memory received from foreign code must be released the
//! same way. On Windows this is the COM task allocator (`CoTaskMemAlloc`/`CoTaskMemFree`),
//! on Unix the C heap; other targets (and the `std-heap` feature) use a size-prefixed
//! block from `std::alloc`.

use std::ffi::c_void;

#[cfg_attr(all(windows, not(feature = "std-heap")), path = "task_mem_win.rs")]
#[cfg_attr(all(unix, not(feature = "std-heap")), path = "task_mem_unix.rs")]
#[cfg_attr(
    any(feature = "std-heap", not(any(unix, windows))),
    path = "task_mem_fallback.rs"
)]
pub mod task_mem;

#[cfg(test)]
mod tests;

/// An allocator whose blocks can be exchanged with foreign code.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - `allocate` returns either null or a block of at least `size` bytes aligned to
///   at least [`TaskAllocator::ALIGNMENT`].
/// - `free` accepts every non-null pointer returned by `allocate` on any instance of
///   the same allocator type, and also accepts null.
/// - Blocks are not tied to the allocating thread.
pub unsafe trait TaskAllocator {
    /// Minimum alignment of every block returned by `allocate`.
    const ALIGNMENT: usize;

    /// Allocates `size` bytes. Returns null when the request cannot be satisfied.
    ///
    /// `size` is never zero when called from this workspace; the result of a zero-sized
    /// request is allocator specific.
    fn allocate(&self, size: usize) -> *mut c_void;

    /// Releases a block obtained from `allocate`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from this allocator type.
    unsafe fn free(&self, ptr: *mut c_void);
}

unsafe impl<A: TaskAllocator> TaskAllocator for &A {
    const ALIGNMENT: usize = A::ALIGNMENT;

    #[inline]
    fn allocate(&self, size: usize) -> *mut c_void {
        (**self).allocate(size)
    }

    #[inline]
    unsafe fn free(&self, ptr: *mut c_void) {
        unsafe { (**self).free(ptr) }
    }
}

/// The platform task allocator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskMem;

unsafe impl TaskAllocator for TaskMem {
    const ALIGNMENT: usize = task_mem::ALIGNMENT;

    #[inline]
    fn allocate(&self, size: usize) -> *mut c_void {
        task_mem::allocate(size)
    }

    #[inline]
    unsafe fn free(&self, ptr: *mut c_void) {
        unsafe { task_mem::free(ptr) }
    }
}
