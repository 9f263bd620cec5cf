//! FHE backends
//!
//! The store never touches ciphertext internals itself; it drives an
//! [`FheBackend`], the opaque encrypted-arithmetic capability. Two
//! implementations exist:
//!
//! - [`TfheBackend`]: real TFHE-rs `FheUint64` ciphertexts
//! - [`MockBackend`]: cleartext stand-in with identical wrapping semantics,
//!   used by tests and local simulations where key generation and
//!   bootstrapping would dominate run time

use crate::real_impl::{FHEOps, FHEUint64, KeyPair};
use crate::{FHEConfig, FHEError, FHEResult};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Encrypted-arithmetic capability over 64-bit unsigned integers
pub trait FheBackend: Send + Sync {
    /// Backend specific ciphertext
    type Ciphertext: Clone + Send + Sync + std::fmt::Debug;

    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Encrypt a publicly known constant
    fn encrypt_trivial(&self, value: u64) -> FHEResult<Self::Ciphertext>;

    /// Encrypt a pseudo-random value derived from `seed`.
    ///
    /// The sample is drawn inside the backend and never returned in clear.
    fn encrypt_random(&self, seed: [u8; 32]) -> FHEResult<Self::Ciphertext>;

    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> FHEResult<Self::Ciphertext>;

    fn add_scalar(&self, a: &Self::Ciphertext, scalar: u64) -> FHEResult<Self::Ciphertext>;

    fn mul_scalar(&self, a: &Self::Ciphertext, scalar: u64) -> FHEResult<Self::Ciphertext>;

    fn rem_scalar(&self, a: &Self::Ciphertext, scalar: u64) -> FHEResult<Self::Ciphertext>;

    /// Decrypt a ciphertext. Only the key management side may call this.
    fn decrypt(&self, ct: &Self::Ciphertext) -> FHEResult<u64>;
}

fn sample_from_seed(seed: [u8; 32]) -> u64 {
    ChaCha20Rng::from_seed(seed).next_u64()
}

/// TFHE-rs backed implementation
pub struct TfheBackend {
    keys: KeyPair,
}

impl TfheBackend {
    /// Generate fresh keys (slow)
    pub fn generate(config: &FHEConfig) -> FHEResult<Self> {
        Ok(Self {
            keys: KeyPair::generate(config)?,
        })
    }

    /// Use an existing key pair
    pub fn with_keys(keys: KeyPair) -> Self {
        Self { keys }
    }

    fn with_server_key<T>(&self, op: impl FnOnce() -> FHEResult<T>) -> FHEResult<T> {
        self.keys.server.set_current_thread();
        op()
    }
}

impl std::fmt::Debug for TfheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfheBackend").field("keys", &self.keys).finish()
    }
}

impl FheBackend for TfheBackend {
    type Ciphertext = FHEUint64;

    fn name(&self) -> &'static str {
        "tfhe"
    }

    fn encrypt_trivial(&self, value: u64) -> FHEResult<FHEUint64> {
        Ok(FHEUint64::encrypt_trivial(value))
    }

    fn encrypt_random(&self, seed: [u8; 32]) -> FHEResult<FHEUint64> {
        FHEUint64::encrypt(sample_from_seed(seed), &self.keys.client)
    }

    fn add(&self, a: &FHEUint64, b: &FHEUint64) -> FHEResult<FHEUint64> {
        self.with_server_key(|| FHEOps::add(a, b))
    }

    fn add_scalar(&self, a: &FHEUint64, scalar: u64) -> FHEResult<FHEUint64> {
        self.with_server_key(|| FHEOps::add_scalar(a, scalar))
    }

    fn mul_scalar(&self, a: &FHEUint64, scalar: u64) -> FHEResult<FHEUint64> {
        self.with_server_key(|| FHEOps::mul_scalar(a, scalar))
    }

    fn rem_scalar(&self, a: &FHEUint64, scalar: u64) -> FHEResult<FHEUint64> {
        self.with_server_key(|| FHEOps::rem_scalar(a, scalar))
    }

    fn decrypt(&self, ct: &FHEUint64) -> FHEResult<u64> {
        ct.decrypt(&self.keys.client)
    }
}

/// Cleartext ciphertext of the mock backend
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MockCiphertext(u64);

impl std::fmt::Debug for MockCiphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MockCiphertext(<encrypted>)")
    }
}

/// Mock backend: same arithmetic as `FheUint64` (wrapping mod 2^64) on clear values
#[derive(Debug, Default, Clone, Copy)]
pub struct MockBackend;

impl FheBackend for MockBackend {
    type Ciphertext = MockCiphertext;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn encrypt_trivial(&self, value: u64) -> FHEResult<MockCiphertext> {
        Ok(MockCiphertext(value))
    }

    fn encrypt_random(&self, seed: [u8; 32]) -> FHEResult<MockCiphertext> {
        Ok(MockCiphertext(sample_from_seed(seed)))
    }

    fn add(&self, a: &MockCiphertext, b: &MockCiphertext) -> FHEResult<MockCiphertext> {
        Ok(MockCiphertext(a.0.wrapping_add(b.0)))
    }

    fn add_scalar(&self, a: &MockCiphertext, scalar: u64) -> FHEResult<MockCiphertext> {
        Ok(MockCiphertext(a.0.wrapping_add(scalar)))
    }

    fn mul_scalar(&self, a: &MockCiphertext, scalar: u64) -> FHEResult<MockCiphertext> {
        Ok(MockCiphertext(a.0.wrapping_mul(scalar)))
    }

    fn rem_scalar(&self, a: &MockCiphertext, scalar: u64) -> FHEResult<MockCiphertext> {
        if scalar == 0 {
            return Err(FHEError::DivisionByZero);
        }
        Ok(MockCiphertext(a.0 % scalar))
    }

    fn decrypt(&self, ct: &MockCiphertext) -> FHEResult<u64> {
        Ok(ct.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_wraps_like_fhe_uint64() {
        let backend = MockBackend;
        let max = backend.encrypt_trivial(u64::MAX).unwrap();
        let one = backend.encrypt_trivial(1).unwrap();

        let sum = backend.add(&max, &one).unwrap();
        assert_eq!(backend.decrypt(&sum).unwrap(), 0);

        let doubled = backend.mul_scalar(&max, 2).unwrap();
        assert_eq!(backend.decrypt(&doubled).unwrap(), u64::MAX - 1);
    }

    #[test]
    fn test_random_is_seed_deterministic() {
        let backend = MockBackend;
        let a = backend.encrypt_random([7u8; 32]).unwrap();
        let b = backend.encrypt_random([7u8; 32]).unwrap();
        let c = backend.encrypt_random([8u8; 32]).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_mock_debug_hides_value() {
        let rendered = format!("{:?}", MockCiphertext(42));
        assert!(!rendered.contains("42"));
    }

    #[test]
    fn test_tfhe_backend_matches_mock() {
        let tfhe = TfheBackend::generate(&FHEConfig::default()).unwrap();
        let mock = MockBackend;

        let seed = [3u8; 32];
        let t = tfhe.encrypt_random(seed).unwrap();
        let m = mock.encrypt_random(seed).unwrap();

        let t = tfhe.rem_scalar(&t, 81).unwrap();
        let m = mock.rem_scalar(&m, 81).unwrap();
        let t = tfhe.add_scalar(&t, 20).unwrap();
        let m = mock.add_scalar(&m, 20).unwrap();

        assert_eq!(tfhe.decrypt(&t).unwrap(), mock.decrypt(&m).unwrap());
    }
}
