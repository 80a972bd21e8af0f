//! Reference-counted interface pointers for objects on the far side of the boundary.
//!
//! Objects follow the COM binary contract: the object pointer points at a vtable whose
//! first three slots are `QueryInterface`, `AddRef` and `Release`. [`Unknown`] is the
//! owning handle for such a pointer, [`Interface`] is implemented by every typed handle
//! (declare new ones with [`interface!`]), and [`InterfaceRef`] is a borrowed handle whose
//! reference is owned by someone else.

mod inspectable;
mod unknown;

pub use inspectable::{Inspectable, InspectableVtbl, TrustLevel, get_interfaces, get_trust_level};
pub use tether_common::{Error, ErrorKind, HResult, Result};
pub use tether_guid::Guid;
pub use unknown::{Interface, InterfaceRef, Unknown, UnknownVtbl, add_ref, release};
