use std::alloc::{Layout, alloc, dealloc};
use std::ffi::c_void;

/// Alignment of the returned blocks; also the size of the hidden length prefix.
pub const ALIGNMENT: usize = 16;

/// Allocates `size` bytes from the global allocator (emulated task allocator).
///
/// The block is prefixed with its total size so that [`free`] can rebuild the layout
/// from the pointer alone, as the real task allocators do.
pub fn allocate(size: usize) -> *mut c_void {
    let Some(total) = size.checked_add(ALIGNMENT) else {
        return std::ptr::null_mut();
    };
    let Ok(layout) = Layout::from_size_align(total, ALIGNMENT) else {
        return std::ptr::null_mut();
    };
    unsafe {
        let base = alloc(layout);
        if base.is_null() {
            return std::ptr::null_mut();
        }
        (base as *mut usize).write(total);
        base.add(ALIGNMENT) as *mut c_void
    }
}

/// Frees memory that was allocated with [`allocate`]. Null is accepted.
///
/// # Safety
///
/// `ptr` must be null or a live block from [`allocate`].
pub unsafe fn free(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let base = (ptr as *mut u8).sub(ALIGNMENT);
        let total = (base as *const usize).read();
        dealloc(base, Layout::from_size_align_unchecked(total, ALIGNMENT));
    }
}
