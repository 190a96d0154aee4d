//! Error types for naga-core.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Mutation or commit attempted while the device is not claimed.
    #[error("device busy: not claimed")]
    Busy,

    /// Unknown or unsupported LED, frequency, axis, profile or mapping.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Control transfer failed or moved the wrong number of bytes.
    #[error("USB I/O error on request 0x{request:02X} value 0x{value:04X}: {reason}")]
    Io {
        request: u8,
        value: u16,
        reason: String,
    },

    /// Device never answered the firmware probe.
    #[error("device not ready: {0}")]
    NotReady(String),

    /// Could not allocate storage for a returned list.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// No supported device matched during enumeration or attach.
    #[error("device not found: {0}")]
    DeviceNotFound(String),
}

impl Error {
    /// Whether the failed operation may succeed if simply issued again.
    ///
    /// A failed commit leaves its changes pending, so re-issuing `commit`
    /// after an I/O error is the expected recovery.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(e: std::collections::TryReserveError) -> Self {
        Self::ResourceExhausted(e.to_string())
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
