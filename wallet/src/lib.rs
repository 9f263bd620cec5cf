//! Miner Wallet
//!
//! Account keys and structured-message signing:
//! - Ed25519 signing wallet with derived 20-byte account addresses
//! - Domain-separated typed messages (domain, type spec, message)
//! - Async signing capability trait for external wallets

pub mod errors;
pub mod keypair;
pub mod signer;
pub mod typed_data;

pub use errors::{WalletError, WalletResult};
pub use keypair::{address_of, StructuredSignature, Wallet};
pub use signer::StructuredSigner;
pub use typed_data::{
    signing_digest, Domain, FieldKind, FieldSpec, FieldValue, StructuredMessage, TypeSpec,
};
