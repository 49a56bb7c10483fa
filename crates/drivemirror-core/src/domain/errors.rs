//! Domain error types
//!
//! Validation failures raised while constructing domain values.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A file name that cannot be used as a flat remote entry name
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// Invalid remote entry ID
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid remote folder ID
    #[error("Invalid folder ID: {0}")]
    InvalidFolderId(String),

    /// A timestamp outside the representable range
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
