use std::fmt;

use ash::vk;

use crate::operation::Operation;

pub type DriverResult<T> = Result<T, DriverError>;

/// Which kind of caller-visible handle failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Instance,
    Surface,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleKind::Instance => f.write_str("instance"),
            HandleKind::Surface => f.write_str("surface"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("out of host memory")]
    OutOfHostMemory,

    #[error("incompatible driver: child window presentation is not supported")]
    IncompatibleDriver,

    #[error("layer-scoped enumeration is not supported by a driver")]
    LayerNotPresent,

    #[error("invalid {kind} handle: {raw:#x}")]
    InvalidHandle { kind: HandleKind, raw: u64 },

    #[error("not implemented: {}", .0.entry_point())]
    NotImplemented(Operation),

    #[error("native driver returned {0:?}")]
    Native(vk::Result),

    #[error("native library unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("native symbol missing: {0}")]
    MissingSymbol(String),

    #[error("version mismatch: host wants {actual} but driver has {expected}")]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("configuration error: {0}")]
    Config(String),
}

impl DriverError {
    /// The result code reported across the C ABI.
    ///
    /// Declared stubs share `ERROR_OUT_OF_HOST_MEMORY` with real allocation
    /// failures there; callers of the Rust API can still tell them apart.
    pub fn to_vk_result(&self) -> vk::Result {
        match self {
            DriverError::OutOfHostMemory | DriverError::NotImplemented(_) => {
                vk::Result::ERROR_OUT_OF_HOST_MEMORY
            }
            DriverError::IncompatibleDriver => vk::Result::ERROR_INCOMPATIBLE_DRIVER,
            DriverError::LayerNotPresent => vk::Result::ERROR_LAYER_NOT_PRESENT,
            DriverError::Native(res) => *res,
            DriverError::InvalidHandle { .. }
            | DriverError::LibraryUnavailable(_)
            | DriverError::MissingSymbol(_)
            | DriverError::VersionMismatch { .. }
            | DriverError::Config(_) => vk::Result::ERROR_INITIALIZATION_FAILED,
        }
    }
}

impl From<vk::Result> for DriverError {
    fn from(res: vk::Result) -> Self {
        DriverError::Native(res)
    }
}

impl From<std::collections::TryReserveError> for DriverError {
    fn from(_: std::collections::TryReserveError) -> Self {
        DriverError::OutOfHostMemory
    }
}
