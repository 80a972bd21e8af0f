use crate::{TaskAllocator, TaskMem, task_mem};

#[test]
fn test_allocate_and_free() {
    let p = TaskMem.allocate(100);
    assert!(!p.is_null());
    assert_eq!(p as usize % TaskMem::ALIGNMENT, 0);
    unsafe {
        std::ptr::write_bytes(p as *mut u8, 0xab, 100);
        assert_eq!(*(p as *const u8).add(99), 0xab);
        TaskMem.free(p);
    }
}

#[test]
fn test_free_null_is_noop() {
    unsafe { TaskMem.free(std::ptr::null_mut()) };
}

#[test]
fn test_alignment_holds_for_many_sizes() {
    let blocks: Vec<_> = (1..64).map(|i| TaskMem.allocate(i * 7)).collect();
    for &p in &blocks {
        assert!(!p.is_null());
        assert_eq!(p as usize % task_mem::ALIGNMENT, 0);
    }
    for p in blocks {
        unsafe { TaskMem.free(p) };
    }
}

#[test]
fn test_borrowed_allocator_forwards() {
    fn roundtrip<A: TaskAllocator>(a: A) {
        let p = a.allocate(8);
        assert!(!p.is_null());
        unsafe { a.free(p) };
    }
    roundtrip(&TaskMem);
    assert_eq!(<&TaskMem as TaskAllocator>::ALIGNMENT, TaskMem::ALIGNMENT);
}

#[test]
fn test_blocks_cross_threads() {
    let p = TaskMem.allocate(32) as usize;
    std::thread::spawn(move || unsafe { TaskMem.free(p as *mut _) })
        .join()
        .unwrap();
}
