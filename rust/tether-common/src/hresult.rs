//! Status codes returned by functions on the far side of the component boundary.

use crate::{Error, Result};

/// A 32-bit COM status code. Negative values are failures.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct HResult(pub i32);

impl HResult {
    pub const S_OK: HResult = HResult(0);
    pub const S_FALSE: HResult = HResult(1);
    pub const E_NOTIMPL: HResult = HResult(0x8000_4001_u32 as i32);
    pub const E_NOINTERFACE: HResult = HResult(0x8000_4002_u32 as i32);
    pub const E_POINTER: HResult = HResult(0x8000_4003_u32 as i32);
    pub const E_FAIL: HResult = HResult(0x8000_4005_u32 as i32);
    pub const E_OUTOFMEMORY: HResult = HResult(0x8007_000E_u32 as i32);
    pub const E_INVALIDARG: HResult = HResult(0x8007_0057_u32 as i32);

    #[inline]
    pub const fn is_ok(self) -> bool {
        self.0 >= 0
    }

    #[inline]
    pub const fn is_err(self) -> bool {
        !self.is_ok()
    }

    /// Converts the status into a `Result`, attaching `context` to generic failures.
    ///
    /// `E_OUTOFMEMORY` keeps its identity through [`Error::is_out_of_memory`];
    /// `E_NOINTERFACE` is left to the caller, which knows which interface was asked for.
    #[inline]
    pub fn ok(self, context: &str) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self.into_error(context))
        }
    }

    #[cold]
    fn into_error(self, context: &str) -> Error {
        Error::abi(context, self)
    }
}

impl std::fmt::Debug for HResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HResult({:#010x})", self.0 as u32)
    }
}

impl std::fmt::Display for HResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0 as u32)
    }
}

impl From<&Error> for HResult {
    fn from(e: &Error) -> Self {
        e.hresult()
    }
}

impl From<Result<()>> for HResult {
    fn from(r: Result<()>) -> Self {
        match r {
            Ok(()) => HResult::S_OK,
            Err(e) => e.hresult(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HResult;

    #[test]
    fn test_success_and_failure() {
        assert!(HResult::S_OK.ok("noop").is_ok());
        assert!(HResult::S_FALSE.is_ok());
        assert!(HResult::E_NOINTERFACE.is_err());

        let e = HResult::E_POINTER.ok("GetIids").unwrap_err();
        assert_eq!(e.hresult(), HResult::E_POINTER);
        assert_eq!(e.to_string(), "GetIids failed with 0x80004003");
    }

    #[test]
    fn test_result_round_trips_to_status() {
        assert_eq!(HResult::from(Ok(())), HResult::S_OK);
        let status: HResult = HResult::E_OUTOFMEMORY.ok("alloc").into();
        assert_eq!(status, HResult::E_OUTOFMEMORY);
    }
}
