//! FHE Error types

use thiserror::Error;

use crate::types::{Address, Handle};

/// Errors that can occur during confidential value operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FHEError {
    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Homomorphic operation failed
    #[error("Homomorphic operation failed: {0}")]
    OperationFailed(String),

    /// Handle does not reference a stored value
    #[error("Unknown handle: {0}")]
    UnknownHandle(Handle),

    /// Account is not on the access list of a handle
    #[error("Access denied: {account} is not allowed on {handle}")]
    AccessDenied { handle: Handle, account: Address },

    /// Scalar division or remainder by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
