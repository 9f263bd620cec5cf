//! Miner FHE Operations
//!
//! Confidential values for the Miner game, backed by TFHE-rs.
//! Contracts compute on encrypted powers and balances without ever
//! seeing a plaintext.
//!
//! # Key Features:
//! - Opaque 32-byte handles referencing stored ciphertexts
//! - Homomorphic addition, scalar multiplication and scalar remainder
//! - Encrypted random sampling
//! - Per-handle access lists gating use and decryption
//!
//! # Architecture:
//! - [`FheBackend`]: the encrypted-arithmetic capability (TFHE-rs or mock)
//! - [`ConfidentialValueStore`]: handles, provenance and access control
//! - [`ConfidentialValueStore::reveal`]: the single plaintext exit, reserved
//!   for the decryption oracle

pub mod acl;
pub mod backend;
pub mod errors;
mod real_impl;
pub mod store;
pub mod types;

pub use acl::AccessList;
pub use backend::{FheBackend, MockBackend, MockCiphertext, TfheBackend};
pub use errors::FHEError;
pub use real_impl::{ClientKey, FHEOps, FHEUint64, KeyId, KeyPair, ServerKey};
pub use store::ConfidentialValueStore;
pub use types::{Address, Handle};

/// FHE Configuration
#[derive(Clone, Debug)]
pub struct FHEConfig {
    /// Security parameter (bits)
    pub security_bits: u32,
}

impl Default for FHEConfig {
    fn default() -> Self {
        Self {
            security_bits: 128,
        }
    }
}

/// Result type for FHE operations
pub type FHEResult<T> = Result<T, FHEError>;
