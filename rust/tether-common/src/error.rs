use tether_guid::Guid;
use thiserror::Error;

use crate::hresult::HResult;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn allocation_failure(bytes: usize) -> Error {
        Error(ErrorKind::AllocationFailure { bytes }.into())
    }

    pub fn element_construction<E>(index: usize, source: E) -> Error
    where
        E: Into<StdErrorBoxed>,
    {
        Error(
            ErrorKind::ElementConstruction {
                index,
                source: source.into(),
            }
            .into(),
        )
    }

    pub fn not_supported(iid: Guid) -> Error {
        Error(ErrorKind::InterfaceNotSupported { iid }.into())
    }

    pub fn contract_violation(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::ContractViolation {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn abi(context: impl Into<String>, hresult: HResult) -> Error {
        Error(
            ErrorKind::Abi {
                context: context.into(),
                hresult,
            }
            .into(),
        )
    }

    /// Returns `true` for the out-of-memory condition, whether it was detected locally
    /// or reported by foreign code as `E_OUTOFMEMORY`.
    pub fn is_out_of_memory(&self) -> bool {
        match self.kind() {
            ErrorKind::AllocationFailure { .. } => true,
            ErrorKind::Abi { hresult, .. } => *hresult == HResult::E_OUTOFMEMORY,
            _ => false,
        }
    }

    /// Returns `true` when the queried object does not implement the interface.
    pub fn is_not_supported(&self) -> bool {
        matches!(self.kind(), ErrorKind::InterfaceNotSupported { .. })
    }

    /// The status code this error would be reported as when crossing back over
    /// the component boundary.
    pub fn hresult(&self) -> HResult {
        match self.kind() {
            ErrorKind::AllocationFailure { .. } => HResult::E_OUTOFMEMORY,
            ErrorKind::InterfaceNotSupported { .. } => HResult::E_NOINTERFACE,
            ErrorKind::ElementConstruction { .. } | ErrorKind::ContractViolation { .. } => {
                HResult::E_FAIL
            }
            ErrorKind::Abi { hresult, .. } => *hresult,
        }
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("task allocator failed to provide {bytes} bytes")]
    AllocationFailure { bytes: usize },

    #[error("failed to construct array element {index}: {source}")]
    ElementConstruction { index: usize, source: StdErrorBoxed },

    #[error("interface {iid} is not supported")]
    InterfaceNotSupported { iid: Guid },

    #[error("contract violation in {name}: {message}")]
    ContractViolation { name: String, message: String },

    #[error("{context} failed with {hresult}")]
    Abi { context: String, hresult: HResult },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}
