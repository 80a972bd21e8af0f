use std::ffi::c_void;

/// `malloc` guarantees alignment suitable for any fundamental type, which is two words
/// on every libc we run on.
pub const ALIGNMENT: usize = 2 * std::mem::size_of::<usize>();

/// Allocates `size` bytes from the C heap; null on failure.
pub fn allocate(size: usize) -> *mut c_void {
    unsafe { libc::malloc(size) }
}

/// Returns a block to the C heap. Null is accepted.
///
/// # Safety
///
/// `ptr` must be null or a live block from [`allocate`].
pub unsafe fn free(ptr: *mut c_void) {
    unsafe { libc::free(ptr) }
}
