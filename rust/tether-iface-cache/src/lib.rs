//! Lock-free caching of the interfaces queried from one object.
//!
//! Heavily layered objects are often asked for the same handful of interfaces over and
//! over. [`InterfaceCache`] keeps one atomic slot per interface of a statically declared
//! set, fills each slot the first time the interface is asked for, and answers every
//! later request with a single atomic load.
//!
//! ```ignore
//! type Cached = InterfaceCache<(Inspectable, IMap, IIterable)>;
//!
//! let cache = Cached::new(&object);
//! let map = cache.get::<IMap, _>()?;
//! ```

mod cache;
mod set;

pub use cache::InterfaceCache;
pub use set::{At, InterfaceSet, Slot};
