//! User decryption request and response
//!
//! The holder signs a structured message binding an ephemeral public key,
//! the contracts whose values may be revealed and a validity window:
//!
//! ```text
//! UserDecryptRequestVerification(
//!     bytes publicKey,
//!     address[] contractAddresses,
//!     uint256 startTimestamp,
//!     uint256 durationDays)
//! ```

use crate::sealing::SealedValue;
use miner_fhe::{Address, Handle};
use miner_wallet::{Domain, FieldKind, FieldValue, StructuredMessage, StructuredSignature, TypeSpec};
use serde::{Deserialize, Serialize};

pub const AUTHORIZATION_TYPE: &str = "UserDecryptRequestVerification";

/// Type spec of the signed authorization
pub fn authorization_type() -> TypeSpec {
    TypeSpec::new(AUTHORIZATION_TYPE)
        .field("publicKey", FieldKind::Bytes)
        .field("contractAddresses", FieldKind::AddressArray)
        .field("startTimestamp", FieldKind::Uint256)
        .field("durationDays", FieldKind::Uint256)
}

/// Authorization message for the given key, contracts and window
pub fn authorization_message(
    public_key: &[u8; 32],
    contract_addresses: &[Address],
    start_timestamp: u64,
    duration_days: u64,
) -> StructuredMessage {
    StructuredMessage::new()
        .with("publicKey", FieldValue::Bytes(public_key.to_vec()))
        .with(
            "contractAddresses",
            FieldValue::AddressArray(contract_addresses.to_vec()),
        )
        .with("startTimestamp", FieldValue::Uint256(start_timestamp))
        .with("durationDays", FieldValue::Uint256(duration_days))
}

/// Signing domain for user decryption
pub fn signing_domain(name: &str, version: &str, chain_id: u64, verifying_contract: Address) -> Domain {
    Domain {
        name: name.to_string(),
        version: version.to_string(),
        chain_id,
        verifying_contract,
    }
}

/// A handle and the contract it belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleContractPair {
    pub handle: Handle,
    pub contract: Address,
}

impl HandleContractPair {
    pub fn new(handle: Handle, contract: Address) -> Self {
        Self { handle, contract }
    }
}

/// Request sent to the decryption oracle. Carries the ephemeral public key
/// only; the secret never leaves the client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserDecryptRequest {
    pub pairs: Vec<HandleContractPair>,
    pub public_key: [u8; 32],
    pub signature: StructuredSignature,
    pub contract_addresses: Vec<Address>,
    pub requester: Address,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

impl UserDecryptRequest {
    /// Message the signature must cover
    pub fn message(&self) -> StructuredMessage {
        authorization_message(
            &self.public_key,
            &self.contract_addresses,
            self.start_timestamp,
            self.duration_days,
        )
    }
}

/// One sealed plaintext
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEntry {
    pub handle: Handle,
    pub sealed: SealedValue,
}

/// Oracle answer; handles it could not resolve are absent
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDecryptResponse {
    /// Oracle's ephemeral x25519 key for this response
    pub oracle_public_key: [u8; 32],
    pub entries: Vec<SealedEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_type_string() {
        assert_eq!(
            authorization_type().encode_type(),
            "UserDecryptRequestVerification(bytes publicKey,address[] contractAddresses,uint256 startTimestamp,uint256 durationDays)"
        );
    }

    #[test]
    fn test_message_matches_type() {
        let message = authorization_message(&[1u8; 32], &[Address::from_label("miner")], 100, 10);
        assert!(message.struct_hash(&authorization_type()).is_ok());
    }

    #[test]
    fn test_request_survives_json_transport() {
        let wallet = miner_wallet::Wallet::from_seed([2u8; 32]);
        let miner = Address::from_label("miner");
        let domain = signing_domain("Decryption", "1", 31337, Address::from_label("verifier"));
        let message = authorization_message(&[9u8; 32], &[miner], 100, 10);
        let signature = wallet
            .sign_structured(&domain, &authorization_type(), &message)
            .unwrap();

        let request = UserDecryptRequest {
            pairs: vec![HandleContractPair::new(Handle::ZERO, miner)],
            public_key: [9u8; 32],
            signature,
            contract_addresses: vec![miner],
            requester: wallet.address(),
            start_timestamp: 100,
            duration_days: 10,
        };

        let json = serde_json::to_string(&request).unwrap();
        let received: UserDecryptRequest = serde_json::from_str(&json).unwrap();
        let signer = received
            .signature
            .verify(&domain, &authorization_type(), &received.message())
            .unwrap();
        assert_eq!(signer, wallet.address());
    }
}
