//! TFHE-rs key material
//!
//! The client key never leaves the key management side. The server key is
//! what the coprocessor installs to evaluate. Both carry the [`KeyId`] of
//! the generation they came from so ciphertexts of different key pairs are
//! never mixed.

use crate::{FHEConfig, FHEError, FHEResult};
use rand::RngCore;
use tfhe::{generate_keys, ConfigBuilder};
use tfhe::{ClientKey as TfheClientKey, ServerKey as TfheServerKey};

/// Security level of the default TFHE-rs parameter set
pub const SUPPORTED_SECURITY_BITS: u32 = 128;

/// Fingerprint of one key generation
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; 16]);

impl KeyId {
    fn derive(config: &FHEConfig, nonce: &[u8; 32]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"miner-fhe-key");
        hasher.update(&config.security_bits.to_le_bytes());
        hasher.update(nonce);
        let mut id = [0u8; 16];
        id.copy_from_slice(&hasher.finalize().as_bytes()[..16]);
        Self(id)
    }
}

impl std::fmt::Debug for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyId({})", hex::encode(&self.0[..8]))
    }
}

/// Encryption and decryption key
#[derive(Clone)]
pub struct ClientKey {
    pub(crate) inner: TfheClientKey,
    id: KeyId,
}

impl ClientKey {
    pub fn id(&self) -> KeyId {
        self.id
    }
}

impl std::fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ClientKey").field(&self.id).finish()
    }
}

/// Evaluation key
#[derive(Clone)]
pub struct ServerKey {
    inner: TfheServerKey,
    id: KeyId,
}

impl ServerKey {
    pub fn id(&self) -> KeyId {
        self.id
    }

    /// Install for evaluation on the calling thread. TFHE-rs keeps the
    /// evaluation key thread-local, so every evaluating thread needs this.
    pub fn set_current_thread(&self) {
        tfhe::set_server_key(self.inner.clone());
    }
}

impl std::fmt::Debug for ServerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ServerKey").field(&self.id).finish()
    }
}

#[derive(Clone)]
pub struct KeyPair {
    pub client: ClientKey,
    pub server: ServerKey,
}

impl KeyPair {
    /// Generate a fresh key pair. Slow: seconds even in release builds.
    pub fn generate(config: &FHEConfig) -> FHEResult<Self> {
        if config.security_bits != SUPPORTED_SECURITY_BITS {
            return Err(FHEError::ConfigError(format!(
                "only {}-bit parameters are available, got {}",
                SUPPORTED_SECURITY_BITS, config.security_bits
            )));
        }

        let mut nonce = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut nonce);
        let id = KeyId::derive(config, &nonce);

        let (client_key, server_key) = generate_keys(ConfigBuilder::default().build());
        tracing::debug!(key_id = ?id, "generated FHE key pair");

        Ok(Self {
            client: ClientKey {
                inner: client_key,
                id,
            },
            server: ServerKey {
                inner: server_key,
                id,
            },
        })
    }

    pub fn id(&self) -> KeyId {
        self.client.id
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("KeyPair").field(&self.client.id).finish()
    }
}
