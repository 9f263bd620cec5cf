//! Miner Client
//!
//! Everything between the user and the contracts:
//! - [`DecryptionAuthorizer`]: ephemeral key, signed authorization, sealed
//!   response, one oracle call per batch
//! - [`KmsOracle`]: the decryption service, checking the signed window and
//!   the ACL before sealing plaintexts to the requester's key
//! - [`ClientOrchestrator`]: dashboard refresh cycles and user actions
//!
//! # Decryption flow
//!
//! ```text
//! client                                   oracle
//!   │ EphemeralKeypair::generate()           │
//!   │ sign(publicKey, contracts, start, days)│
//!   │ ─────── UserDecryptRequest ──────────> │ verify window, signer, ACL
//!   │ <────── UserDecryptResponse ────────── │ seal(value) to publicKey
//!   │ open(response)  (consumes the keypair) │
//! ```

pub mod authorizer;
pub mod config;
pub mod errors;
pub mod oracle;
pub mod orchestrator;
pub mod provider;
pub mod request;
pub mod sealing;

pub use authorizer::{DecryptedValues, DecryptionAuthorizer, EphemeralKeypair};
pub use config::{ClientBuilder, ClientConfig, ConfigError, DecryptionConfig, LoggingSettings};
pub use errors::{ClientError, ClientResult};
pub use oracle::{DecryptionOracle, KmsOracle, KMS_VERIFIER_LABEL};
pub use orchestrator::{
    AccountSession, ClientOrchestrator, DashboardState, Plaintext, RefreshOutcome, StatusState,
    TokenView, NO_SIGNER_WARNING,
};
pub use provider::{ChainReader, DevnetProvider, TransactionSender};
pub use request::{
    authorization_message, authorization_type, signing_domain, HandleContractPair, SealedEntry,
    UserDecryptRequest, UserDecryptResponse, AUTHORIZATION_TYPE,
};
pub use sealing::SealedValue;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::authorizer::DecryptionAuthorizer;
    pub use crate::config::ClientConfig;
    pub use crate::errors::{ClientError, ClientResult};
    pub use crate::oracle::KmsOracle;
    pub use crate::orchestrator::{AccountSession, ClientOrchestrator, Plaintext, RefreshOutcome};
    pub use crate::provider::DevnetProvider;
    pub use crate::request::HandleContractPair;
}
