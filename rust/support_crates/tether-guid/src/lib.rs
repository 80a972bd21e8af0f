//! 16-byte interface identifiers with the Windows `GUID` field layout.
//!
//! Every interface that crosses the component boundary is identified by one of these.
//! The first three fields are stored little-endian, the trailing eight bytes as-is,
//! so a `Guid` can be handed to foreign code as a `*const GUID` without conversion.

mod guid;

pub use guid::Guid;
