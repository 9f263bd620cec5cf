//! Sealing of revealed plaintexts
//!
//! The oracle and the client agree on a shared secret through x25519 (the
//! oracle's per-response key against the client's ephemeral key). Each
//! value gets its own key, `HKDF-SHA256(shared, info = handle)`, and is
//! encrypted with ChaCha20-Poly1305 using the handle as associated data, so
//! a sealed value cannot be replayed under another handle.

use crate::errors::{ClientError, ClientResult};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use miner_fhe::Handle;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

const SEAL_SALT: &[u8] = b"miner-user-decrypt-v1";

/// Plaintext encrypted to the requester's ephemeral key
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
}

impl std::fmt::Debug for SealedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SealedValue(<encrypted>)")
    }
}

fn value_cipher(shared: &[u8; 32], handle: &Handle) -> ClientResult<ChaCha20Poly1305> {
    let hk = Hkdf::<Sha256>::new(Some(SEAL_SALT), shared);
    let mut okm = Zeroizing::new([0u8; 32]);
    hk.expand(handle.as_bytes(), &mut okm[..])
        .map_err(|e| ClientError::MalformedResponse(format!("key derivation: {}", e)))?;
    Ok(ChaCha20Poly1305::new(Key::from_slice(&okm[..])))
}

/// Seal `value` for `handle`
pub fn seal(shared: &[u8; 32], handle: &Handle, value: u64) -> ClientResult<SealedValue> {
    let mut nonce = [0u8; 12];
    OsRng.fill_bytes(&mut nonce);

    let plaintext = Zeroizing::new(value.to_be_bytes());
    let ciphertext = value_cipher(shared, handle)?
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &plaintext[..],
                aad: handle.as_bytes(),
            },
        )
        .map_err(|_| ClientError::OracleUnavailable("sealing failed".into()))?;

    Ok(SealedValue { nonce, ciphertext })
}

/// Open a value sealed for `handle`
pub fn open(shared: &[u8; 32], handle: &Handle, sealed: &SealedValue) -> ClientResult<u64> {
    let plaintext = value_cipher(shared, handle)?
        .decrypt(
            Nonce::from_slice(&sealed.nonce),
            Payload {
                msg: &sealed.ciphertext,
                aad: handle.as_bytes(),
            },
        )
        .map_err(|_| ClientError::MalformedResponse(format!("cannot open value for {}", handle)))?;
    let plaintext = Zeroizing::new(plaintext);

    let bytes: [u8; 8] = plaintext[..]
        .try_into()
        .map_err(|_| ClientError::MalformedResponse("sealed value has wrong length".into()))?;
    Ok(u64::from_be_bytes(bytes))
}
