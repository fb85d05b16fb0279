//! Error types for hashlog
//!
//! Provides a unified error type for all read-path and build-path operations.
//! A key that is missing or deleted is NOT an error; lookups report misses
//! through the iterator state.

use thiserror::Error;

/// Result type alias using HashlogError
pub type Result<T> = std::result::Result<T, HashlogError>;

/// Unified error type for hashlog operations
#[derive(Debug, Error)]
pub enum HashlogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Malformed file: {0}")]
    Malformed(String),

    #[error("Wrong file type: {path} is not a {expected}")]
    WrongFileType {
        expected: &'static str,
        path: String,
    },

    #[error("Unsupported version: {found} (supported up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Index does not match log: {0}")]
    IndexLogMismatch(String),

    // -------------------------------------------------------------------------
    // Programming Errors
    // -------------------------------------------------------------------------
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),
}

/// Discriminant of [`HashlogError`], for callers that branch on the error class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Malformed,
    WrongFileType,
    UnsupportedVersion,
    IndexLogMismatch,
    InvalidUsage,
}

impl HashlogError {
    /// The class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            HashlogError::Io(_) => ErrorKind::Io,
            HashlogError::Malformed(_) => ErrorKind::Malformed,
            HashlogError::WrongFileType { .. } => ErrorKind::WrongFileType,
            HashlogError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            HashlogError::IndexLogMismatch(_) => ErrorKind::IndexLogMismatch,
            HashlogError::InvalidUsage(_) => ErrorKind::InvalidUsage,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        HashlogError::Malformed(msg.into())
    }

    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        HashlogError::InvalidUsage(msg.into())
    }
}
