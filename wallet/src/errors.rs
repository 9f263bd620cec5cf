//! Wallet error types

use thiserror::Error;

/// Errors raised while building, signing or verifying structured messages
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The holder declined to sign
    #[error("Signing rejected: {0}")]
    SigningRejected(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Message does not match its declared type
    #[error("Type mismatch for field `{field}`: {reason}")]
    TypeMismatch { field: String, reason: String },
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;
