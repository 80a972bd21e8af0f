use std::ffi::c_void;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tether_task_alloc::{TaskAllocator, TaskMem};

/// Header in front of every block, holding the requested size.
const HEADER: usize = TaskMem::ALIGNMENT;

const _: () = assert!(HEADER >= std::mem::size_of::<usize>());

/// A [`TaskAllocator`] over [`TaskMem`] that keeps count of what is outstanding.
///
/// Clones share their counters, so a test can hand one clone to an array and keep
/// another to inspect. Blocks freed through a different `CountingAllocator` are
/// counted against that allocator's counters.
#[derive(Clone, Debug, Default)]
pub struct CountingAllocator {
    stats: Arc<Stats>,
}

#[derive(Debug)]
struct Stats {
    live_blocks: AtomicUsize,
    live_bytes: AtomicUsize,
    total_blocks: AtomicUsize,
    failed: AtomicUsize,
    /// Allocations left before requests start failing; `usize::MAX` is unlimited.
    budget: AtomicUsize,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            live_blocks: AtomicUsize::new(0),
            live_bytes: AtomicUsize::new(0),
            total_blocks: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            budget: AtomicUsize::new(usize::MAX),
        }
    }
}

impl CountingAllocator {
    pub fn new() -> CountingAllocator {
        CountingAllocator::default()
    }

    /// An allocator whose every request fails.
    pub fn failing() -> CountingAllocator {
        let alloc = CountingAllocator::new();
        alloc.fail_after(0);
        alloc
    }

    /// Lets `count` more allocations through, then fails every later one.
    pub fn fail_after(&self, count: usize) {
        self.stats.budget.store(count, Ordering::SeqCst);
    }

    /// Removes any failure budget.
    pub fn never_fail(&self) {
        self.stats.budget.store(usize::MAX, Ordering::SeqCst);
    }

    /// Blocks allocated and not yet freed.
    pub fn live_blocks(&self) -> usize {
        self.stats.live_blocks.load(Ordering::SeqCst)
    }

    /// Bytes requested by the blocks still live.
    pub fn live_bytes(&self) -> usize {
        self.stats.live_bytes.load(Ordering::SeqCst)
    }

    /// Successful allocations over the allocator's lifetime.
    pub fn total_blocks(&self) -> usize {
        self.stats.total_blocks.load(Ordering::SeqCst)
    }

    /// Requests refused because the failure budget ran out.
    pub fn failed_requests(&self) -> usize {
        self.stats.failed.load(Ordering::SeqCst)
    }

    fn take_budget(&self) -> bool {
        self.stats
            .budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                usize::MAX => Some(usize::MAX),
                0 => None,
                n => Some(n - 1),
            })
            .is_ok()
    }
}

unsafe impl TaskAllocator for CountingAllocator {
    const ALIGNMENT: usize = TaskMem::ALIGNMENT;

    fn allocate(&self, size: usize) -> *mut c_void {
        if !self.take_budget() {
            self.stats.failed.fetch_add(1, Ordering::SeqCst);
            return std::ptr::null_mut();
        }
        let Some(total) = size.checked_add(HEADER) else {
            return std::ptr::null_mut();
        };
        let base = TaskMem.allocate(total) as *mut u8;
        if base.is_null() {
            return std::ptr::null_mut();
        }
        unsafe { (base as *mut usize).write(size) };
        self.stats.live_blocks.fetch_add(1, Ordering::SeqCst);
        self.stats.live_bytes.fetch_add(size, Ordering::SeqCst);
        self.stats.total_blocks.fetch_add(1, Ordering::SeqCst);
        unsafe { base.add(HEADER) as *mut c_void }
    }

    unsafe fn free(&self, ptr: *mut c_void) {
        if ptr.is_null() {
            return;
        }
        let base = unsafe { (ptr as *mut u8).sub(HEADER) };
        let size = unsafe { (base as *const usize).read() };
        self.stats.live_blocks.fetch_sub(1, Ordering::SeqCst);
        self.stats.live_bytes.fetch_sub(size, Ordering::SeqCst);
        unsafe { TaskMem.free(base as *mut c_void) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_live_blocks() {
        let alloc = CountingAllocator::new();
        let a = alloc.allocate(24);
        let b = alloc.clone().allocate(8);
        assert_eq!(alloc.live_blocks(), 2);
        assert_eq!(alloc.live_bytes(), 32);
        assert_eq!(a as usize % CountingAllocator::ALIGNMENT, 0);
        unsafe {
            alloc.free(a);
            alloc.free(b);
            alloc.free(std::ptr::null_mut());
        }
        assert_eq!(alloc.live_blocks(), 0);
        assert_eq!(alloc.live_bytes(), 0);
        assert_eq!(alloc.total_blocks(), 2);
    }

    #[test]
    fn test_failure_budget() {
        let alloc = CountingAllocator::new();
        alloc.fail_after(1);
        let a = alloc.allocate(4);
        assert!(!a.is_null());
        assert!(alloc.allocate(4).is_null());
        assert_eq!(alloc.failed_requests(), 1);
        alloc.never_fail();
        let b = alloc.allocate(4);
        assert!(!b.is_null());
        unsafe {
            alloc.free(a);
            alloc.free(b);
        }
        assert!(CountingAllocator::failing().allocate(1).is_null());
    }
}
