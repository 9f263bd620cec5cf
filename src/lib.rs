//! Confidential Miners
//!
//! Root crate re-exporting the Miner components for integration testing and
//! providing a [`LocalNode`](node::LocalNode) that runs the whole game in
//! one process.
//!
//! ## Overview
//!
//! Each address may mint one Miner NFT whose mining power is an encrypted
//! integer in [20, 100]. Staked Miners accrue whole days; claiming mints
//! encrypted GOLD equal to `power × days`. Only holders of an ACL grant can
//! see plaintexts, and only through the signed user-decryption protocol.
//!
//! ## Crate Organization
//!
//! - `miner-fhe`: encrypted value store, handles, ACL and FHE backends
//! - `miner-wallet`: account keys and structured-message signing
//! - `miner-contracts`: Miner and GOLD contracts on an in-process devnet
//! - `miner-client`: user decryption, KMS oracle and dashboard orchestration

pub mod logging;
pub mod node;

// Re-export all crates for integration testing
pub use miner_client as client;
pub use miner_contracts as contracts;
pub use miner_fhe as fhe;
pub use miner_wallet as wallet;

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::node::{LocalNode, NodeConfig, NodeError};
    pub use miner_client::{
        AccountSession, ClientConfig, ClientError, ClientOrchestrator, DecryptionAuthorizer,
        HandleContractPair, Plaintext, RefreshOutcome,
    };
    pub use miner_contracts::{Call, CallArg, CallValue, ContractError, DevnetConfig, TokenId};
    pub use miner_fhe::{Address, ConfidentialValueStore, FheBackend, Handle, MockBackend, TfheBackend};
    pub use miner_wallet::{StructuredSigner, Wallet};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
