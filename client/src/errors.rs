//! Client error types

use miner_contracts::ContractError;
use miner_wallet::WalletError;
use thiserror::Error;

/// Errors surfaced to the dashboard
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    // Business rules
    #[error("Transaction reverted: {reason}")]
    Reverted { reason: String },

    // Decryption protocol
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Decryption oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Decryption oracle timed out after {0} ms")]
    OracleTimeout(u64),

    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),

    #[error("Authorization rejected: {0}")]
    AuthorizationRejected(String),

    // I/O
    #[error("Transport error: {0}")]
    Transport(String),

    // Session
    #[error("Connect your wallet to continue.")]
    NoSigner,
}

impl ClientError {
    /// Contract-level rejection, shown distinctly from loading states
    pub fn is_business_rule(&self) -> bool {
        matches!(self, ClientError::Reverted { .. })
    }

    /// The decryption batch failed as a whole; retry with fresh key material
    pub fn is_protocol_failure(&self) -> bool {
        matches!(
            self,
            ClientError::SigningFailed(_)
                | ClientError::OracleUnavailable(_)
                | ClientError::OracleTimeout(_)
                | ClientError::MalformedResponse(_)
                | ClientError::AuthorizationRejected(_)
        )
    }
}

impl From<WalletError> for ClientError {
    fn from(err: WalletError) -> Self {
        ClientError::SigningFailed(err.to_string())
    }
}

impl From<ContractError> for ClientError {
    fn from(err: ContractError) -> Self {
        ClientError::Transport(err.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
