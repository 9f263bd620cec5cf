//! Signing capability
//!
//! The decryption protocol never touches key material directly; it asks a
//! [`StructuredSigner`] for an address and a signature. Browser wallets,
//! hardware devices and the local [`Wallet`] all sit behind this trait.

use crate::errors::WalletResult;
use crate::keypair::{StructuredSignature, Wallet};
use crate::typed_data::{Domain, StructuredMessage, TypeSpec};
use async_trait::async_trait;
use miner_fhe::Address;

#[async_trait]
pub trait StructuredSigner: Send + Sync {
    /// Account address of the holder
    fn address(&self) -> Address;

    /// Ask the holder to sign; may fail with `SigningRejected`
    async fn sign_structured(
        &self,
        domain: &Domain,
        spec: &TypeSpec,
        message: &StructuredMessage,
    ) -> WalletResult<StructuredSignature>;
}

#[async_trait]
impl StructuredSigner for Wallet {
    fn address(&self) -> Address {
        Wallet::address(self)
    }

    async fn sign_structured(
        &self,
        domain: &Domain,
        spec: &TypeSpec,
        message: &StructuredMessage,
    ) -> WalletResult<StructuredSignature> {
        Wallet::sign_structured(self, domain, spec, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed_data::{FieldKind, FieldValue};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wallet_as_trait_object() {
        let wallet = Wallet::generate();
        let expected = wallet.address();
        let signer: Arc<dyn StructuredSigner> = Arc::new(wallet);

        let domain = Domain {
            name: "Test".into(),
            version: "1".into(),
            chain_id: 1,
            verifying_contract: Address::ZERO,
        };
        let spec = TypeSpec::new("Ping").field("nonce", FieldKind::Uint256);
        let message = StructuredMessage::new().with("nonce", FieldValue::Uint256(3));

        let signature = signer.sign_structured(&domain, &spec, &message).await.unwrap();
        assert_eq!(signer.address(), expected);
        assert_eq!(signature.verify(&domain, &spec, &message).unwrap(), expected);
    }
}
