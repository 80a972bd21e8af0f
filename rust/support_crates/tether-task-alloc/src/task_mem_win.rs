use std::ffi::c_void;

use windows_sys::Win32::System::Com::{CoTaskMemAlloc, CoTaskMemFree};

/// `CoTaskMemAlloc` aligns to `MEMORY_ALLOCATION_ALIGNMENT`: 16 bytes on 64-bit, 8 on 32-bit.
pub const ALIGNMENT: usize = 2 * std::mem::size_of::<usize>();

/// Allocates `size` bytes from the COM task allocator; null on failure.
///
/// # References
///
/// <https://learn.microsoft.com/en-us/windows/win32/api/combaseapi/nf-combaseapi-cotaskmemalloc>
pub fn allocate(size: usize) -> *mut c_void {
    unsafe { CoTaskMemAlloc(size) }
}

/// Returns a block to the COM task allocator. Null is accepted.
///
/// # Safety
///
/// `ptr` must be null or a live block from [`allocate`] (or from any foreign
/// `CoTaskMemAlloc` call).
pub unsafe fn free(ptr: *mut c_void) {
    unsafe { CoTaskMemFree(ptr) }
}
