//! Laying arrays out as boundary-call arguments.
//!
//! Boundary calls pass arrays as a `u32` element count plus an element pointer. Three
//! shapes occur:
//!
//! - *pass*: the caller lends a slice for the duration of the call ([`slice_abi`]);
//! - *fill*: the caller lends a slice the callee overwrites ([`fill_slice_abi`]);
//! - *receive*: the callee allocates from the task allocator and hands ownership of the
//!   block to the caller ([`ComArray::put_abi`] on the caller side,
//!   [`ComArray::detach_into`] on the callee side).

use std::cell::Cell;
use std::ptr::{self, NonNull};

use tether_common::{Result, verify_contract};
use tether_task_alloc::TaskAllocator;

use crate::ComArray;

/// Converts a slice length to the `u32` count used by boundary calls.
///
/// `u32::MAX` itself is refused, since callees may read an all-ones count as "unknown".
/// Owned arrays may still hold exactly `u32::MAX` elements.
///
/// # Errors
///
/// `ContractViolation` for `u32::MAX` elements or more.
#[inline]
pub fn abi_len(len: usize) -> Result<u32> {
    verify_contract!(len, len < u32::MAX as usize);
    Ok(len as u32)
}

/// Returns the `(count, pointer)` pair for passing `values` into a boundary call.
///
/// The pointer is never null: an empty slice yields a dangling, well-aligned pointer,
/// since callees are entitled to reject null array arguments.
pub fn slice_abi<T>(values: &[T]) -> Result<(u32, *const T)> {
    let len = abi_len(values.len())?;
    let data = if values.is_empty() {
        NonNull::<T>::dangling().as_ptr() as *const T
    } else {
        values.as_ptr()
    };
    Ok((len, data))
}

/// Returns the `(count, pointer)` pair for a caller-allocated array that the callee fills.
///
/// Elements that own resources are reset to their default value first, so that the
/// callee overwrites empty values rather than leaking live ones.
pub fn fill_slice_abi<T: Default>(values: &mut [T]) -> Result<(u32, *mut T)> {
    let len = abi_len(values.len())?;
    if std::mem::needs_drop::<T>() {
        values.iter_mut().for_each(|v| *v = T::default());
    }
    let data = if values.is_empty() {
        NonNull::<T>::dangling().as_ptr()
    } else {
        values.as_mut_ptr()
    };
    Ok((len, data))
}

/// Out-parameters through which a callee hands a task-allocated array to the caller.
///
/// Created by [`ComArray::put_abi`]. Pass [`len_ptr`](ArrayOut::len_ptr) and
/// [`data_ptr`](ArrayOut::data_ptr) to the boundary call; when the `ArrayOut` is dropped,
/// whatever the callee wrote becomes the array's contents. A callee that fails leaves
/// both outputs untouched (null and zero), which yields an empty array.
pub struct ArrayOut<'a, T, A: TaskAllocator> {
    array: &'a mut ComArray<T, A>,
    len: Cell<u32>,
    data: Cell<*mut T>,
}

impl<T, A: TaskAllocator> ArrayOut<'_, T, A> {
    /// Pointer to the element-count out-parameter.
    pub fn len_ptr(&self) -> *mut u32 {
        self.len.as_ptr()
    }

    /// Pointer to the data out-parameter.
    pub fn data_ptr(&self) -> *mut *mut T {
        self.data.as_ptr()
    }
}

impl<T, A: TaskAllocator> Drop for ArrayOut<'_, T, A> {
    fn drop(&mut self) {
        let data = self.data.get();
        let len = self.len.get();
        self.array.data = data;
        // The callee may report fewer elements than its block holds.
        unsafe { self.array.set_len(if data.is_null() { 0 } else { len }) };
    }
}

impl<T, A: TaskAllocator> ComArray<T, A> {
    /// Clears the array and returns out-parameters for a boundary call that produces a
    /// new array.
    ///
    /// The callee must either leave the outputs as null/zero or write a block from an
    /// allocator of type `A` holding the reported number of initialized elements.
    pub fn put_abi(&mut self) -> ArrayOut<'_, T, A> {
        self.clear();
        ArrayOut {
            array: self,
            len: Cell::new(0),
            data: Cell::new(ptr::null_mut()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn produce(len_out: *mut u32, data_out: *mut *mut u16) {
        let array = ComArray::from_slice(&[7u16, 8, 9]).unwrap();
        unsafe { array.detach_into(len_out, data_out) };
    }

    #[test]
    fn test_receive_round_trip() {
        let mut received = ComArray::<u16>::from_value(2, &1).unwrap();
        {
            let out = received.put_abi();
            unsafe { produce(out.len_ptr(), out.data_ptr()) };
        }
        assert_eq!(received, [7, 8, 9]);
    }

    #[test]
    fn test_callee_reports_fewer_elements_than_allocated() {
        unsafe fn produce_two(len_out: *mut u32, data_out: *mut *mut u64) {
            let mut array = ComArray::from_slice(&[10u64, 20, 30, 40]).unwrap();
            let (_, data) = array.detach();
            unsafe {
                *len_out = 2;
                *data_out = data;
            }
        }

        let mut received = ComArray::<u64>::new();
        {
            let out = received.put_abi();
            unsafe { produce_two(out.len_ptr(), out.data_ptr()) };
        }
        assert_eq!(received.len(), 2);
        assert_eq!(received, [10, 20]);
        assert_eq!(received.into_vec(), [10, 20]);
    }

    #[test]
    fn test_untouched_out_params_give_empty_array() {
        let mut received = ComArray::<u16>::from_value(2, &1).unwrap();
        drop(received.put_abi());
        assert!(received.is_empty());
        assert!(received.as_ptr().is_null());
    }

    #[test]
    fn test_slice_abi_never_null() {
        let empty: [u64; 0] = [];
        let (len, data) = slice_abi(&empty).unwrap();
        assert_eq!(len, 0);
        assert!(!data.is_null());
        assert_eq!(data as usize % std::mem::align_of::<u64>(), 0);

        let values = [1u64, 2];
        let (len, data) = slice_abi(&values).unwrap();
        assert_eq!(len, 2);
        assert_eq!(data, values.as_ptr());
    }

    #[test]
    fn test_fill_slice_resets_owning_elements() {
        let mut names = vec![String::from("stale"), String::from("old")];
        let (len, data) = fill_slice_abi(&mut names).unwrap();
        assert_eq!(len, 2);
        assert_eq!(data, names.as_mut_ptr());
        assert!(names.iter().all(String::is_empty));

        let mut plain = [5u8, 6];
        fill_slice_abi(&mut plain).unwrap();
        assert_eq!(plain, [5, 6]);
    }

    #[test]
    fn test_abi_len_limit() {
        assert_eq!(abi_len(3).unwrap(), 3);
        assert!(abi_len(u32::MAX as usize).is_err());
    }
}
