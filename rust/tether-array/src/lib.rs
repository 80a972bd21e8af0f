//! Arrays whose storage belongs to the foreign task allocator.
//!
//! [`ComArray`] is the owning side of an array that crosses the component boundary:
//! the block comes from (or goes back to) a [`TaskAllocator`], and ownership of it moves
//! exactly once in each direction, through [`ComArray::from_raw_parts`] on the way in and
//! [`ComArray::detach`] on the way out. The [`abi`] module holds the helpers that lay
//! arrays out as `(u32, *mut T)` argument pairs.

pub mod abi;
mod array;

pub use array::ComArray;
pub use tether_task_alloc::{TaskAllocator, TaskMem};
