//! Homomorphic operations
//!
//! The server key must be installed on the calling thread before any of
//! these run.

use super::ciphertext::FHEUint64;
use super::keys::KeyId;
use crate::{FHEError, FHEResult};

pub struct FHEOps;

impl FHEOps {
    pub fn add(a: &FHEUint64, b: &FHEUint64) -> FHEResult<FHEUint64> {
        let key = Self::common_key(a, b)?;
        Ok(FHEUint64::from_parts(a.inner() + b.inner(), key))
    }

    pub fn add_scalar(a: &FHEUint64, scalar: u64) -> FHEResult<FHEUint64> {
        Ok(FHEUint64::from_parts(a.inner() + scalar, a.key()))
    }

    pub fn mul_scalar(a: &FHEUint64, scalar: u64) -> FHEResult<FHEUint64> {
        Ok(FHEUint64::from_parts(a.inner() * scalar, a.key()))
    }

    /// `a mod scalar`; the most expensive of the scalar ops
    pub fn rem_scalar(a: &FHEUint64, scalar: u64) -> FHEResult<FHEUint64> {
        if scalar == 0 {
            return Err(FHEError::DivisionByZero);
        }
        Ok(FHEUint64::from_parts(a.inner() % scalar, a.key()))
    }

    fn common_key(a: &FHEUint64, b: &FHEUint64) -> FHEResult<Option<KeyId>> {
        match (a.key(), b.key()) {
            (Some(x), Some(y)) if x != y => Err(FHEError::OperationFailed(format!(
                "operands under different keys: {:?} and {:?}",
                x, y
            ))),
            (x, y) => Ok(x.or(y)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::real_impl::KeyPair;
    use crate::FHEConfig;

    #[test]
    fn test_scalar_operations() {
        let keypair = KeyPair::generate(&FHEConfig::default()).unwrap();
        keypair.server.set_current_thread();

        let a = FHEUint64::encrypt(100, &keypair.client).unwrap();
        let b = FHEUint64::encrypt(50, &keypair.client).unwrap();

        let sum = FHEOps::add(&a, &b).unwrap();
        assert_eq!(sum.decrypt(&keypair.client).unwrap(), 150);

        let shifted = FHEOps::add_scalar(&a, 25).unwrap();
        assert_eq!(shifted.decrypt(&keypair.client).unwrap(), 125);

        let prod = FHEOps::mul_scalar(&a, 3).unwrap();
        assert_eq!(prod.decrypt(&keypair.client).unwrap(), 300);

        let rem = FHEOps::rem_scalar(&a, 81).unwrap();
        assert_eq!(rem.decrypt(&keypair.client).unwrap(), 19);

        // Trivial constants adopt the other operand's key
        let mixed = FHEOps::add(&FHEUint64::encrypt_trivial(1), &a).unwrap();
        assert_eq!(mixed.key(), Some(keypair.id()));
    }

    #[test]
    fn test_mixed_keys_rejected() {
        let first = KeyPair::generate(&FHEConfig::default()).unwrap();
        let second = KeyPair::generate(&FHEConfig::default()).unwrap();
        first.server.set_current_thread();

        let a = FHEUint64::encrypt(1, &first.client).unwrap();
        let b = FHEUint64::encrypt(2, &second.client).unwrap();
        assert!(matches!(FHEOps::add(&a, &b), Err(FHEError::OperationFailed(_))));
        assert!(matches!(b.decrypt(&first.client), Err(FHEError::DecryptionFailed(_))));
    }

    #[test]
    fn test_rem_by_zero_rejected() {
        let a = FHEUint64::encrypt_trivial(5);
        assert_eq!(FHEOps::rem_scalar(&a, 0).unwrap_err(), FHEError::DivisionByZero);
    }
}
