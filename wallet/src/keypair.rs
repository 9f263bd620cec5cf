//! Wallet keypair
//!
//! An ed25519 signing key plus the account address derived from it.

use crate::errors::{WalletError, WalletResult};
use crate::typed_data::{signing_digest, Domain, StructuredMessage, TypeSpec};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use miner_fhe::Address;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Derive the account address of an ed25519 public key
pub fn address_of(public_key: &[u8; 32]) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"miner-account");
    hasher.update(public_key);
    Address::from_digest(hasher.finalize().as_bytes())
}

/// Signature over a structured message.
///
/// Ed25519 has no public key recovery, so the signer's public key travels
/// with the signature and verifiers derive the address from it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredSignature {
    pub public_key: [u8; 32],
    pub signature: Vec<u8>,
}

impl StructuredSignature {
    /// Address of the key that produced the signature
    pub fn signer(&self) -> Address {
        address_of(&self.public_key)
    }

    /// Verify against (domain, spec, message); returns the signer address
    pub fn verify(
        &self,
        domain: &Domain,
        spec: &TypeSpec,
        message: &StructuredMessage,
    ) -> WalletResult<Address> {
        let digest = signing_digest(domain, spec, message)?;
        let verifying_key = VerifyingKey::from_bytes(&self.public_key)
            .map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        let bytes: [u8; 64] = self
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| WalletError::InvalidSignature)?;
        verifying_key
            .verify(&digest, &Signature::from_bytes(&bytes))
            .map_err(|_| WalletError::InvalidSignature)?;
        Ok(self.signer())
    }
}

impl std::fmt::Debug for StructuredSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredSignature")
            .field("signer", &self.signer())
            .field("signature", &hex::encode(&self.signature[..self.signature.len().min(8)]))
            .finish()
    }
}

/// Local signing wallet
pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
}

impl Wallet {
    /// Generate a new random wallet
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Deterministic wallet from a 32-byte secret seed
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_of(signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a structured message
    pub fn sign_structured(
        &self,
        domain: &Domain,
        spec: &TypeSpec,
        message: &StructuredMessage,
    ) -> WalletResult<StructuredSignature> {
        let digest = signing_digest(domain, spec, message)?;
        let signature = self.signing_key.sign(&digest);
        tracing::debug!(signer = %self.address, primary_type = %spec.primary_type, "signed structured message");
        Ok(StructuredSignature {
            public_key: self.public_key(),
            signature: signature.to_bytes().to_vec(),
        })
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet").field("address", &self.address).finish()
    }
}
