//! Core definitions relied upon by all tether-* crates: the error type, the `Result`
//! alias, and the `HResult` status code that foreign calls report.

pub mod error;
pub mod hresult;
pub mod result;

pub use error::{Error, ErrorKind};
pub use hresult::HResult;
pub use result::Result;
