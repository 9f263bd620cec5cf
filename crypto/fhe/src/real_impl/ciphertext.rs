//! Encrypted 64-bit integers
//!
//! Powers, reward deltas and balances all live in one width. A ciphertext
//! remembers the key it was encrypted under; trivial encryptions of public
//! constants belong to no key and combine with anything.

use super::keys::{ClientKey, KeyId};
use crate::{FHEError, FHEResult};
use tfhe::prelude::*;
use tfhe::FheUint64 as TfheFheUint64;

#[derive(Clone)]
pub struct FHEUint64 {
    inner: TfheFheUint64,
    key: Option<KeyId>,
}

impl FHEUint64 {
    pub fn encrypt(value: u64, client_key: &ClientKey) -> FHEResult<Self> {
        Ok(Self {
            inner: TfheFheUint64::encrypt(value, &client_key.inner),
            key: Some(client_key.id()),
        })
    }

    /// Noiseless encryption of a public constant
    pub fn encrypt_trivial(value: u64) -> Self {
        Self {
            inner: TfheFheUint64::encrypt_trivial(value),
            key: None,
        }
    }

    pub fn decrypt(&self, client_key: &ClientKey) -> FHEResult<u64> {
        if let Some(key) = self.key {
            if key != client_key.id() {
                return Err(FHEError::DecryptionFailed(format!(
                    "ciphertext under {:?}, client key is {:?}",
                    key,
                    client_key.id()
                )));
            }
        }
        Ok(self.inner.decrypt(&client_key.inner))
    }

    /// Key this ciphertext is bound to, `None` for trivial encryptions
    pub fn key(&self) -> Option<KeyId> {
        self.key
    }

    pub(crate) fn inner(&self) -> &TfheFheUint64 {
        &self.inner
    }

    pub(crate) fn from_parts(inner: TfheFheUint64, key: Option<KeyId>) -> Self {
        Self { inner, key }
    }
}

impl std::fmt::Debug for FHEUint64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FHEUint64")
            .field("value", &"<encrypted>")
            .field("key", &self.key)
            .finish()
    }
}
