//! Error types for the Miner contracts

use crate::TokenId;
use miner_fhe::{Address, FHEError};
use thiserror::Error;

/// Errors that can occur during contract execution.
///
/// Every variant is raised before any state is mutated, so a reverted
/// transaction leaves registry, ledger and balances untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("Address {0} has already minted a Miner")]
    AlreadyMinted(Address),

    #[error("Unknown token #{0}")]
    UnknownToken(TokenId),

    #[error("{caller} does not own token #{token_id}")]
    NotOwner { token_id: TokenId, caller: Address },

    #[error("Token #{0} is already staked")]
    AlreadyStaked(TokenId),

    #[error("Token #{0} is not staked")]
    NotStaked(TokenId),

    #[error("{caller} is not the staker of token #{token_id}")]
    NotStaker { token_id: TokenId, caller: Address },

    #[error("Nothing to claim for token #{0}")]
    NothingToClaim(TokenId),

    #[error("{0} is not the GOLD minter")]
    UnauthorizedMinter(Address),

    #[error("{0} is not the contract owner")]
    NotContractOwner(Address),

    #[error("Access denied: {0}")]
    AclDenied(String),

    #[error("FHE operation failed: {0}")]
    FHEError(String),

    #[error("Timestamp arithmetic overflow")]
    ArithmeticOverflow,

    #[error("No contract deployed at {0}")]
    ContractNotFound(Address),

    #[error("Unknown function `{function}` on {contract}")]
    UnknownFunction { contract: Address, function: String },

    #[error("Parameter mismatch for `{function}`: {message}")]
    InvalidParameters { function: String, message: String },

    #[error("Return type mismatch: expected {expected}, got {got}")]
    ReturnTypeMismatch { expected: &'static str, got: &'static str },
}

impl ContractError {
    /// Stable revert reason carried by transaction receipts
    pub fn reason(&self) -> &'static str {
        match self {
            ContractError::AlreadyMinted(_) => "AlreadyMinted",
            ContractError::UnknownToken(_) => "UnknownToken",
            ContractError::NotOwner { .. } => "NotOwner",
            ContractError::AlreadyStaked(_) => "AlreadyStaked",
            ContractError::NotStaked(_) => "NotStaked",
            ContractError::NotStaker { .. } => "NotStaker",
            ContractError::NothingToClaim(_) => "NothingToClaim",
            ContractError::UnauthorizedMinter(_) => "UnauthorizedMinter",
            ContractError::NotContractOwner(_) => "NotContractOwner",
            ContractError::AclDenied(_) => "AclDenied",
            ContractError::FHEError(_) => "FHEError",
            ContractError::ArithmeticOverflow => "ArithmeticOverflow",
            ContractError::ContractNotFound(_) => "ContractNotFound",
            ContractError::UnknownFunction { .. } => "UnknownFunction",
            ContractError::InvalidParameters { .. } => "InvalidParameters",
            ContractError::ReturnTypeMismatch { .. } => "ReturnTypeMismatch",
        }
    }
}

impl From<FHEError> for ContractError {
    fn from(err: FHEError) -> Self {
        match err {
            FHEError::AccessDenied { .. } => ContractError::AclDenied(err.to_string()),
            other => ContractError::FHEError(other.to_string()),
        }
    }
}

/// Result type for contract operations
pub type ContractResult<T> = Result<T, ContractError>;
