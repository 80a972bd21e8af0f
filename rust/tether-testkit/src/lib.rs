//! Test utilities shared by the tether crates.
//!
//! - [`alloc`]: a task allocator that counts live blocks and can be told to fail
//! - [`elements`]: element types that record drops or panic while cloning
//! - [`object`]: a heap-allocated component object with a configurable interface list

pub mod alloc;
pub mod elements;
pub mod object;

pub use alloc::CountingAllocator;
pub use elements::{CloneBomb, DropCounter, DropTracker};
pub use object::{IAlpha, IBeta, IGamma, IMissing, ObjectProbe, TestObject};
