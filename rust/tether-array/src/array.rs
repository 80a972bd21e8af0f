use std::borrow::{Borrow, BorrowMut};
use std::cmp::Ordering;
use std::ffi::c_void;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr;

use tether_common::error::StdErrorBoxed;
use tether_common::{Error, Result, verify_contract};
use tether_task_alloc::{TaskAllocator, TaskMem};

/// An array that owns a block from the foreign task allocator.
///
/// The block and the element count travel together as the `(u32, *mut T)` pair used by
/// boundary calls. `ComArray` owns both until [`detach`](ComArray::detach) hands them to
/// someone else; dropping it drops every element in index order and returns the block
/// to `A`.
///
/// There is no `Clone`: a block from the task allocator has exactly one owner. Moves
/// (`std::mem::take`, plain assignment) are O(1) and leave an empty array behind.
///
/// An empty array never holds a block: zero-length construction does not call the
/// allocator at all, and the data pointer stays null.
pub struct ComArray<T, A: TaskAllocator = TaskMem> {
    pub(crate) data: *mut T,
    pub(crate) len: u32,
    alloc: A,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, A: TaskAllocator + Send> Send for ComArray<T, A> {}
unsafe impl<T: Sync, A: TaskAllocator + Sync> Sync for ComArray<T, A> {}

impl<T> ComArray<T> {
    /// Creates an empty array. Does not allocate.
    pub fn new() -> ComArray<T> {
        ComArray::new_in(TaskMem)
    }

    /// Creates an array of `len` default values.
    pub fn with_len(len: usize) -> Result<ComArray<T>>
    where
        T: Default,
    {
        ComArray::with_len_in(len, TaskMem)
    }

    /// Creates an array of `len` clones of `value`.
    pub fn from_value(len: usize, value: &T) -> Result<ComArray<T>>
    where
        T: Clone,
    {
        ComArray::from_value_in(len, value, TaskMem)
    }

    /// Creates an array holding clones of the elements of `values`.
    pub fn from_slice(values: &[T]) -> Result<ComArray<T>>
    where
        T: Clone,
    {
        ComArray::from_slice_in(values, TaskMem)
    }

    /// Creates an array from an iterator whose length is known up front.
    pub fn from_exact_iter<I>(iter: I) -> Result<ComArray<T>>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        ComArray::from_exact_iter_in(iter, TaskMem)
    }

    /// Creates an array of `len` elements produced by a fallible generator.
    pub fn try_from_fn<F, E>(len: usize, f: F) -> Result<ComArray<T>>
    where
        F: FnMut(usize) -> std::result::Result<T, E>,
        E: Into<StdErrorBoxed>,
    {
        ComArray::try_from_fn_in(len, f, TaskMem)
    }

    /// Takes ownership of a block received from foreign code.
    ///
    /// # Safety
    ///
    /// `data` must be null (with `len == 0`) or a block from the platform task allocator
    /// holding `len` initialized elements. The caller must not use `data` afterwards.
    pub unsafe fn from_raw_parts(data: *mut T, len: u32) -> ComArray<T> {
        unsafe { ComArray::from_raw_parts_in(data, len, TaskMem) }
    }
}

impl<T, A: TaskAllocator> ComArray<T, A> {
    const LAYOUT_CHECK: () = {
        assert!(
            std::mem::size_of::<T>() != 0,
            "zero-sized elements cannot cross the boundary"
        );
        assert!(
            std::mem::align_of::<T>() <= A::ALIGNMENT,
            "element alignment exceeds the task allocator's guarantee"
        );
    };

    /// Creates an empty array bound to `alloc`. Does not allocate.
    pub fn new_in(alloc: A) -> ComArray<T, A> {
        ComArray {
            data: ptr::null_mut(),
            len: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Creates an array of `len` default values, allocated from `alloc`.
    ///
    /// # Errors
    ///
    /// `AllocationFailure` if the allocator returns null; `ContractViolation` if `len`
    /// does not fit in `u32`. A length of exactly `u32::MAX` is accepted.
    pub fn with_len_in(len: usize, alloc: A) -> Result<ComArray<T, A>>
    where
        T: Default,
    {
        let mut init = InitGuard::allocate(len, alloc)?;
        for _ in 0..len {
            init.push(T::default());
        }
        Ok(init.finish())
    }

    /// Creates an array of `len` clones of `value`, allocated from `alloc`.
    ///
    /// If a clone panics, the elements cloned so far are dropped and the block is freed
    /// before the panic continues.
    pub fn from_value_in(len: usize, value: &T, alloc: A) -> Result<ComArray<T, A>>
    where
        T: Clone,
    {
        let mut init = InitGuard::allocate(len, alloc)?;
        for _ in 0..len {
            init.push(value.clone());
        }
        Ok(init.finish())
    }

    /// Creates an array holding clones of `values`, allocated from `alloc`.
    pub fn from_slice_in(values: &[T], alloc: A) -> Result<ComArray<T, A>>
    where
        T: Clone,
    {
        ComArray::from_exact_iter_in(values.iter().cloned(), alloc)
    }

    /// Creates an array from an iterator whose length is known up front.
    ///
    /// Exactly `iter.len()` elements are allocated. Items past that count are not
    /// consumed; if the iterator ends early the array is shorter than the allocation.
    pub fn from_exact_iter_in<I>(iter: I, alloc: A) -> Result<ComArray<T, A>>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let iter = iter.into_iter();
        let mut init = InitGuard::allocate(iter.len(), alloc)?;
        let capacity = init.capacity();
        for item in iter.take(capacity) {
            init.push(item);
        }
        Ok(init.finish())
    }

    /// Creates an array of `len` elements produced by `f(0), f(1), ...`.
    ///
    /// # Errors
    ///
    /// The first `Err` from `f` stops construction: the elements built so far are
    /// dropped, the block is freed, and `ElementConstruction` is returned with the index
    /// of the failing element.
    pub fn try_from_fn_in<F, E>(len: usize, mut f: F, alloc: A) -> Result<ComArray<T, A>>
    where
        F: FnMut(usize) -> std::result::Result<T, E>,
        E: Into<StdErrorBoxed>,
    {
        let mut init = InitGuard::allocate(len, alloc)?;
        for index in 0..len {
            match f(index) {
                Ok(value) => init.push(value),
                Err(e) => {
                    log::debug!("element {index} of {len} failed to construct, rolling back");
                    return Err(Error::element_construction(index, e));
                }
            }
        }
        Ok(init.finish())
    }

    /// Takes ownership of a block allocated by `alloc`'s allocator type.
    ///
    /// # Safety
    ///
    /// `data` must be null (with `len == 0`) or a live block from an allocator of type
    /// `A` holding `len` initialized elements. The caller must not use `data`
    /// afterwards except through the returned array.
    pub unsafe fn from_raw_parts_in(data: *mut T, len: u32, alloc: A) -> ComArray<T, A> {
        let () = Self::LAYOUT_CHECK;
        debug_assert!(!data.is_null() || len == 0);
        ComArray {
            data,
            len,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns the number of elements as the `u32` used by boundary calls.
    #[inline]
    pub fn abi_len(&self) -> u32 {
        self.len
    }

    /// Returns `true` if the array contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the data pointer; null for an array that holds no block.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.data
    }

    /// Returns the mutable data pointer; null for an array that holds no block.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        if self.data.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.data, self.len as usize) }
        }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.data.is_null() {
            &mut []
        } else {
            unsafe { std::slice::from_raw_parts_mut(self.data, self.len as usize) }
        }
    }

    /// Returns the allocator that will free the block.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Gives up ownership of the block, returning `(len, data)` and leaving the array
    /// empty.
    ///
    /// The caller becomes responsible for dropping the elements and freeing the block
    /// with the same allocator type. Detaching an empty array returns `(0, null)`.
    #[must_use = "the detached block leaks unless it is handed to a new owner"]
    pub fn detach(&mut self) -> (u32, *mut T) {
        let parts = (self.len, self.data);
        self.data = ptr::null_mut();
        self.len = 0;
        parts
    }

    /// Consumes the array, returning `(len, data)` without freeing anything.
    #[must_use = "the detached block leaks unless it is handed to a new owner"]
    pub fn into_raw_parts(mut self) -> (u32, *mut T) {
        self.detach()
    }

    /// Detaches the array into a pair of out-parameters supplied by foreign code.
    ///
    /// # Safety
    ///
    /// Both pointers must be valid for writes.
    pub unsafe fn detach_into(self, len_out: *mut u32, data_out: *mut *mut T) {
        let (len, data) = self.into_raw_parts();
        unsafe {
            len_out.write(len);
            data_out.write(data);
        }
    }

    /// Drops every element and frees the block, leaving the array empty.
    pub fn clear(&mut self) {
        let (len, data) = self.detach();
        if data.is_null() {
            return;
        }
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(data, len as usize));
            self.alloc.free(data as *mut c_void);
        }
    }

    /// Shortens the array to `new_len`, dropping the trailing elements. The block is kept.
    ///
    /// # Errors
    ///
    /// `ContractViolation` if `new_len` is greater than the current length.
    pub fn truncate(&mut self, new_len: usize) -> Result<()> {
        verify_contract!(new_len, new_len <= self.len());
        let old_len = self.len();
        if new_len == old_len {
            return Ok(());
        }
        unsafe {
            let tail = ptr::slice_from_raw_parts_mut(self.data.add(new_len), old_len - new_len);
            self.len = new_len as u32;
            ptr::drop_in_place(tail);
        }
        Ok(())
    }

    /// Sets the visible length without dropping or initializing anything.
    ///
    /// This is the length half of an out-parameter fill: foreign code wrote the data
    /// pointer and reports how many elements it produced.
    ///
    /// # Safety
    ///
    /// The block must hold at least `new_len` initialized elements, and elements past
    /// `new_len` are no longer dropped by this array.
    pub unsafe fn set_len(&mut self, new_len: u32) {
        debug_assert!(!self.data.is_null() || new_len == 0);
        self.len = new_len;
    }

    /// Moves the elements into a `Vec` and frees the block.
    pub fn into_vec(mut self) -> Vec<T> {
        let (len, data) = self.detach();
        let mut vec = Vec::with_capacity(len as usize);
        if !data.is_null() {
            unsafe {
                ptr::copy_nonoverlapping(data, vec.as_mut_ptr(), len as usize);
                vec.set_len(len as usize);
                self.alloc.free(data as *mut c_void);
            }
        }
        vec
    }
}

impl<T, A: TaskAllocator> Drop for ComArray<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, A: TaskAllocator + Default> Default for ComArray<T, A> {
    fn default() -> Self {
        ComArray::new_in(A::default())
    }
}

impl<T, A: TaskAllocator> Deref for ComArray<T, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: TaskAllocator> DerefMut for ComArray<T, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: TaskAllocator> AsRef<[T]> for ComArray<T, A> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: TaskAllocator> AsMut<[T]> for ComArray<T, A> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: TaskAllocator> Borrow<[T]> for ComArray<T, A> {
    fn borrow(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: TaskAllocator> BorrowMut<[T]> for ComArray<T, A> {
    fn borrow_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug, A: TaskAllocator> fmt::Debug for ComArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComArray").field(&self.as_slice()).finish()
    }
}

impl<T, A, B> PartialEq<ComArray<T, B>> for ComArray<T, A>
where
    T: PartialEq,
    A: TaskAllocator,
    B: TaskAllocator,
{
    fn eq(&self, other: &ComArray<T, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: TaskAllocator> Eq for ComArray<T, A> {}

impl<T: PartialEq, A: TaskAllocator> PartialEq<[T]> for ComArray<T, A> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq, A: TaskAllocator, const N: usize> PartialEq<[T; N]> for ComArray<T, A> {
    fn eq(&self, other: &[T; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: PartialEq, A: TaskAllocator> PartialEq<Vec<T>> for ComArray<T, A> {
    fn eq(&self, other: &Vec<T>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T, A, B> PartialOrd<ComArray<T, B>> for ComArray<T, A>
where
    T: PartialOrd,
    A: TaskAllocator,
    B: TaskAllocator,
{
    fn partial_cmp(&self, other: &ComArray<T, B>) -> Option<Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T: Ord, A: TaskAllocator> Ord for ComArray<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T: Hash, A: TaskAllocator> Hash for ComArray<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl<'a, T, A: TaskAllocator> IntoIterator for &'a ComArray<T, A> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T, A: TaskAllocator> IntoIterator for &'a mut ComArray<T, A> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

impl<T> TryFrom<Vec<T>> for ComArray<T> {
    type Error = Error;

    /// Moves the elements of `vec` into a task-allocated block.
    fn try_from(vec: Vec<T>) -> Result<Self> {
        ComArray::from_exact_iter(vec)
    }
}

impl<T, const N: usize> TryFrom<[T; N]> for ComArray<T> {
    type Error = Error;

    fn try_from(values: [T; N]) -> Result<Self> {
        ComArray::from_exact_iter(values)
    }
}

impl<T: Clone> TryFrom<&[T]> for ComArray<T> {
    type Error = Error;

    fn try_from(values: &[T]) -> Result<Self> {
        ComArray::from_slice(values)
    }
}

/// A block under construction: owns the allocation and the first `init` elements, and
/// rolls both back unless [`InitGuard::finish`] is reached.
struct InitGuard<T, A: TaskAllocator> {
    data: *mut T,
    capacity: u32,
    init: u32,
    alloc: A,
}

impl<T, A: TaskAllocator> InitGuard<T, A> {
    fn allocate(len: usize, alloc: A) -> Result<InitGuard<T, A>> {
        let () = ComArray::<T, A>::LAYOUT_CHECK;
        verify_contract!(len, len <= u32::MAX as usize);

        if len == 0 {
            return Ok(InitGuard {
                data: ptr::null_mut(),
                capacity: 0,
                init: 0,
                alloc,
            });
        }

        let Some(bytes) = len.checked_mul(std::mem::size_of::<T>()) else {
            return Err(Error::allocation_failure(usize::MAX));
        };
        let data = alloc.allocate(bytes) as *mut T;
        if data.is_null() {
            log::debug!("task allocator returned null for {bytes} bytes ({len} elements)");
            return Err(Error::allocation_failure(bytes));
        }

        Ok(InitGuard {
            data,
            capacity: len as u32,
            init: 0,
            alloc,
        })
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.capacity as usize
    }

    #[inline]
    fn push(&mut self, value: T) {
        assert!(self.init < self.capacity);
        unsafe { self.data.add(self.init as usize).write(value) };
        self.init += 1;
    }

    fn finish(self) -> ComArray<T, A> {
        let this = ManuallyDrop::new(self);
        let alloc = unsafe { ptr::read(&this.alloc) };
        if this.init == 0 && !this.data.is_null() {
            unsafe { alloc.free(this.data as *mut c_void) };
            return ComArray::new_in(alloc);
        }
        ComArray {
            data: this.data,
            len: this.init,
            alloc,
            _marker: PhantomData,
        }
    }
}

impl<T, A: TaskAllocator> Drop for InitGuard<T, A> {
    fn drop(&mut self) {
        if self.data.is_null() {
            return;
        }
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.data, self.init as usize));
            self.alloc.free(self.data as *mut c_void);
        }
    }
}
