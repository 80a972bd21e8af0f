//! # Tether: ownership and interfaces across a binary-stable boundary
//!
//! Tether is the Rust side of a component boundary that follows the COM binary contract.
//! Two things cross such a boundary often enough to deserve dedicated machinery:
//!
//! * **Arrays.** The block holding the elements is allocated by one side and freed by the
//!   other, so both must use the shared task allocator, and ownership must move exactly
//!   once. [`array::ComArray`] owns such a block, rolls back cleanly when constructing
//!   its elements fails part way, and hands the block over (or takes it back) as the
//!   `(u32, *mut T)` pair that boundary calls use.
//! * **Interfaces.** Objects are discovered at run time through `QueryInterface`, which
//!   is expensive enough that layered code should not repeat it.
//!   [`iface_cache::InterfaceCache`] remembers the answer for a static set of interfaces
//!   in lock-free, write-once slots.
//!
//! ## Module Organization
//!
//! * [`array`] - the owning array and its argument-passing helpers
//! * [`common`] - errors, `Result`, and `HResult` status codes
//! * [`iface_cache`] - the lock-free interface cache
//! * [`interface`] - reference-counted interface handles and the `interface!` macro
//!
//! ### Support Modules
//!
//! * [`support::guid`] - interface identifiers
//! * [`support::task_alloc`] - the platform task allocator
//!
//! ## Getting Started
//!
//! ```ignore
//! use tether::array::ComArray;
//! use tether::iface_cache::InterfaceCache;
//! use tether::interface::{Inspectable, get_interfaces};
//!
//! let ids = get_interfaces(&object)?;
//! let cache = InterfaceCache::<(Inspectable, IMap)>::new(&object);
//! let map = cache.get::<IMap, _>()?;
//! ```

pub use tether_array as array;
pub use tether_common as common;
pub use tether_iface_cache as iface_cache;
pub use tether_interface as interface;

pub mod support {
    pub use tether_guid as guid;
    pub use tether_task_alloc as task_alloc;
}
