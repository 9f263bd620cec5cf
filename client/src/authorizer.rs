//! Decryption authorizer
//!
//! Runs the user decryption protocol for one batch of handles:
//!
//! 1. deduplicate the handles; an empty batch returns immediately
//! 2. generate a fresh ephemeral x25519 key pair
//! 3. build the authorization (public key, contracts, window)
//! 4. have the holder sign it
//! 5. exchange it with the oracle for sealed values
//! 6. open the sealed values with the ephemeral secret
//!
//! The key pair is consumed when the response is opened, so it cannot be
//! reused across batches or retries.

use crate::config::{ClientConfig, DecryptionConfig};
use crate::errors::{ClientError, ClientResult};
use crate::oracle::DecryptionOracle;
use crate::request::{
    authorization_message, authorization_type, signing_domain, HandleContractPair,
    UserDecryptRequest, UserDecryptResponse,
};
use crate::sealing::open;
use miner_contracts::Clock;
use miner_fhe::{Address, Handle};
use miner_wallet::{Domain, StructuredSigner};
use rand::rngs::OsRng;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use x25519_dalek::{EphemeralSecret, PublicKey};

/// Single-use key pair for one decryption batch
pub struct EphemeralKeypair {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl EphemeralKeypair {
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Open the oracle's sealed values, consuming the key pair.
    ///
    /// Entries for handles that were not requested make the whole response
    /// malformed.
    pub fn open(
        self,
        response: &UserDecryptResponse,
        requested: &BTreeSet<Handle>,
    ) -> ClientResult<DecryptedValues> {
        let shared = self
            .secret
            .diffie_hellman(&PublicKey::from(response.oracle_public_key));
        if !shared.was_contributory() {
            return Err(ClientError::MalformedResponse(
                "degenerate oracle public key".into(),
            ));
        }

        let mut values = HashMap::with_capacity(response.entries.len());
        for entry in &response.entries {
            if !requested.contains(&entry.handle) {
                return Err(ClientError::MalformedResponse(format!(
                    "unrequested handle {}",
                    entry.handle
                )));
            }
            let value = open(shared.as_bytes(), &entry.handle, &entry.sealed)?;
            if values.insert(entry.handle, value).is_some() {
                return Err(ClientError::MalformedResponse(format!(
                    "duplicate entry for {}",
                    entry.handle
                )));
            }
        }
        Ok(DecryptedValues(values))
    }
}

impl std::fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKeypair")
            .field("public", &hex::encode(&self.public.as_bytes()[..8]))
            .finish()
    }
}

/// Plaintexts recovered for a batch. A missing handle is still encrypted,
/// not zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptedValues(HashMap<Handle, u64>);

impl DecryptedValues {
    pub fn get(&self, handle: &Handle) -> Option<u64> {
        self.0.get(handle).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Handle, &u64)> {
        self.0.iter()
    }
}

pub struct DecryptionAuthorizer {
    oracle: Arc<dyn DecryptionOracle>,
    clock: Arc<dyn Clock>,
    config: DecryptionConfig,
    chain_id: u64,
}

impl DecryptionAuthorizer {
    pub fn new(oracle: Arc<dyn DecryptionOracle>, clock: Arc<dyn Clock>, config: &ClientConfig) -> Self {
        Self {
            oracle,
            clock,
            config: config.decryption.clone(),
            chain_id: config.chain_id,
        }
    }

    /// Domain the authorization is signed under
    pub fn domain(&self) -> Domain {
        signing_domain(
            &self.config.domain_name,
            &self.config.domain_version,
            self.chain_id,
            self.oracle.verifying_contract(),
        )
    }

    /// Reveal `pairs` to the holder behind `signer`.
    ///
    /// Any failure fails the whole batch; no partial result is returned.
    pub async fn user_decrypt(
        &self,
        signer: &dyn StructuredSigner,
        pairs: &[HandleContractPair],
    ) -> ClientResult<DecryptedValues> {
        let mut unique: BTreeMap<Handle, Address> = BTreeMap::new();
        for pair in pairs {
            unique.entry(pair.handle).or_insert(pair.contract);
        }
        if unique.is_empty() {
            return Ok(DecryptedValues::default());
        }

        let keypair = EphemeralKeypair::generate();
        let public_key = keypair.public_key();
        let contract_addresses: Vec<Address> = unique
            .values()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let start_timestamp = self.clock.now();
        let duration_days = self.config.validity_days;

        let message = authorization_message(&public_key, &contract_addresses, start_timestamp, duration_days);
        let signature = signer
            .sign_structured(&self.domain(), &authorization_type(), &message)
            .await?;
        debug!(
            requester = %signer.address(),
            handles = unique.len(),
            contracts = contract_addresses.len(),
            "authorization signed"
        );

        let requested: BTreeSet<Handle> = unique.keys().copied().collect();
        let request = UserDecryptRequest {
            pairs: unique
                .into_iter()
                .map(|(handle, contract)| HandleContractPair::new(handle, contract))
                .collect(),
            public_key,
            signature,
            contract_addresses,
            requester: signer.address(),
            start_timestamp,
            duration_days,
        };

        let timeout_ms = self.config.oracle_timeout_ms;
        let response = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.oracle.user_decrypt(request),
        )
        .await
        .map_err(|_| ClientError::OracleTimeout(timeout_ms))??;

        let values = keypair.open(&response, &requested)?;
        info!(requested = requested.len(), decrypted = values.len(), "user decryption complete");
        Ok(values)
    }
}

impl std::fmt::Debug for DecryptionAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptionAuthorizer")
            .field("chain_id", &self.chain_id)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientBuilder;
    use crate::oracle::{KmsOracle, KMS_VERIFIER_LABEL};
    use async_trait::async_trait;
    use miner_contracts::ManualClock;
    use miner_fhe::{ConfidentialValueStore, MockBackend};
    use miner_wallet::{StructuredSignature, TypeSpec, StructuredMessage, Wallet, WalletError, WalletResult};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NOW: u64 = 1_700_000_000;

    struct Fixture {
        store: Arc<ConfidentialValueStore<MockBackend>>,
        clock: Arc<ManualClock>,
        authorizer: DecryptionAuthorizer,
        wallet: Wallet,
        contract: Address,
    }

    fn fixture_with(config: ClientConfig, max_validity_days: u64) -> Fixture {
        let store = Arc::new(ConfidentialValueStore::with_seed(MockBackend, [4u8; 32]));
        let clock = Arc::new(ManualClock::new(NOW));
        let domain = signing_domain(
            &config.decryption.domain_name,
            &config.decryption.domain_version,
            config.chain_id,
            Address::from_label(KMS_VERIFIER_LABEL),
        );
        let oracle = Arc::new(KmsOracle::new(store.clone(), clock.clone(), domain, max_validity_days));
        let authorizer = DecryptionAuthorizer::new(oracle, clock.clone(), &config);
        Fixture {
            store,
            clock,
            authorizer,
            wallet: Wallet::from_seed([1u8; 32]),
            contract: Address::from_label("miner"),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(ClientConfig::default(), 365)
    }

    /// Value computed by `contract` and allowed to the wallet
    fn value(f: &Fixture, plaintext: u64) -> Handle {
        let handle = f.store.trivial(f.contract, plaintext).unwrap();
        f.store.allow(f.contract, handle, f.wallet.address()).unwrap();
        handle
    }

    #[tokio::test]
    async fn test_decrypts_batch() {
        let f = fixture();
        let a = value(&f, 20);
        let b = value(&f, 100);
        let pairs = [
            HandleContractPair::new(a, f.contract),
            HandleContractPair::new(b, f.contract),
            HandleContractPair::new(a, f.contract),
        ];

        let values = f.authorizer.user_decrypt(&f.wallet, &pairs).await.unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values.get(&a), Some(20));
        assert_eq!(values.get(&b), Some(100));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_signing() {
        struct CountingSigner(AtomicUsize, Wallet);

        #[async_trait]
        impl StructuredSigner for CountingSigner {
            fn address(&self) -> Address {
                self.1.address()
            }
            async fn sign_structured(
                &self,
                domain: &Domain,
                spec: &TypeSpec,
                message: &StructuredMessage,
            ) -> WalletResult<StructuredSignature> {
                self.0.fetch_add(1, Ordering::SeqCst);
                self.1.sign_structured(domain, spec, message)
            }
        }

        let f = fixture();
        let signer = CountingSigner(AtomicUsize::new(0), Wallet::generate());
        let values = f.authorizer.user_decrypt(&signer, &[]).await.unwrap();
        assert!(values.is_empty());
        assert_eq!(signer.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_handle_has_no_entry() {
        let f = fixture();
        let known = value(&f, 7);
        let unknown = Handle([0xAB; 32]);
        let pairs = [
            HandleContractPair::new(known, f.contract),
            HandleContractPair::new(unknown, f.contract),
        ];

        let values = f.authorizer.user_decrypt(&f.wallet, &pairs).await.unwrap();
        assert_eq!(values.get(&known), Some(7));
        assert_eq!(values.get(&unknown), None);
    }

    #[tokio::test]
    async fn test_signing_refusal_fails_batch() {
        struct Refusing(Address);

        #[async_trait]
        impl StructuredSigner for Refusing {
            fn address(&self) -> Address {
                self.0
            }
            async fn sign_structured(
                &self,
                _: &Domain,
                _: &TypeSpec,
                _: &StructuredMessage,
            ) -> WalletResult<StructuredSignature> {
                Err(WalletError::SigningRejected("user denied".into()))
            }
        }

        let f = fixture();
        let handle = value(&f, 1);
        let err = f
            .authorizer
            .user_decrypt(&Refusing(f.wallet.address()), &[HandleContractPair::new(handle, f.contract)])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::SigningFailed(_)));
    }

    #[tokio::test]
    async fn test_not_allowed_rejected() {
        let f = fixture();
        let handle = f.store.trivial(f.contract, 5).unwrap();
        let err = f
            .authorizer
            .user_decrypt(&f.wallet, &[HandleContractPair::new(handle, f.contract)])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthorizationRejected(_)));
    }

    #[tokio::test]
    async fn test_wrong_contract_rejected() {
        let f = fixture();
        let handle = value(&f, 5);
        let err = f
            .authorizer
            .user_decrypt(
                &f.wallet,
                &[HandleContractPair::new(handle, Address::from_label("gold"))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthorizationRejected(_)));
    }

    #[tokio::test]
    async fn test_validity_above_oracle_maximum_rejected() {
        let config = ClientBuilder::new()
            .validity_days(30)
            .max_validity_days(30)
            .build()
            .unwrap();
        let f = fixture_with(config, 10);
        let handle = value(&f, 5);

        let err = f
            .authorizer
            .user_decrypt(&f.wallet, &[HandleContractPair::new(handle, f.contract)])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthorizationRejected(_)));
    }

    #[tokio::test]
    async fn test_domain_mismatch_rejected() {
        let f = fixture();
        let other = fixture_with(ClientBuilder::new().domain("Other", "2").build().unwrap(), 365);
        let handle = other.store.trivial(other.contract, 1).unwrap();
        other.store.allow(other.contract, handle, f.wallet.address()).unwrap();

        // Signed under "Other" but verified under the oracle's default domain
        let oracle = Arc::new(KmsOracle::new(
            other.store.clone(),
            other.clock.clone(),
            f.authorizer.domain(),
            365,
        ));
        let authorizer = DecryptionAuthorizer::new(
            oracle,
            other.clock.clone(),
            &ClientBuilder::new().domain("Other", "2").build().unwrap(),
        );
        let err = authorizer
            .user_decrypt(&f.wallet, &[HandleContractPair::new(handle, other.contract)])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthorizationRejected(_)));
    }

    struct StalledOracle;

    #[async_trait]
    impl DecryptionOracle for StalledOracle {
        fn verifying_contract(&self) -> Address {
            Address::ZERO
        }
        async fn user_decrypt(&self, _: UserDecryptRequest) -> ClientResult<UserDecryptResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(UserDecryptResponse::default())
        }
    }

    #[tokio::test]
    async fn test_oracle_timeout() {
        let config = ClientBuilder::new().oracle_timeout_ms(20).build().unwrap();
        let authorizer = DecryptionAuthorizer::new(
            Arc::new(StalledOracle),
            Arc::new(ManualClock::new(NOW)),
            &config,
        );
        let wallet = Wallet::generate();
        let err = authorizer
            .user_decrypt(&wallet, &[HandleContractPair::new(Handle([1; 32]), Address::ZERO)])
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::OracleTimeout(20));
    }

    /// Replays a canned response regardless of the request
    struct ReplayOracle(Mutex<Option<UserDecryptResponse>>);

    #[async_trait]
    impl DecryptionOracle for ReplayOracle {
        fn verifying_contract(&self) -> Address {
            Address::ZERO
        }
        async fn user_decrypt(&self, _: UserDecryptRequest) -> ClientResult<UserDecryptResponse> {
            self.0
                .lock()
                .take()
                .ok_or_else(|| ClientError::OracleUnavailable("drained".into()))
        }
    }

    #[tokio::test]
    async fn test_response_for_other_key_is_malformed() {
        // Sealed to a key pair other than the one the authorizer generates
        let stranger = EphemeralKeypair::generate();
        let oracle_secret = EphemeralSecret::random_from_rng(OsRng);
        let oracle_public = PublicKey::from(&oracle_secret);
        let shared = oracle_secret.diffie_hellman(&PublicKey::from(stranger.public_key()));
        let handle = Handle([5u8; 32]);
        let response = UserDecryptResponse {
            oracle_public_key: oracle_public.to_bytes(),
            entries: vec![crate::request::SealedEntry {
                handle,
                sealed: crate::sealing::seal(shared.as_bytes(), &handle, 9).unwrap(),
            }],
        };

        let authorizer = DecryptionAuthorizer::new(
            Arc::new(ReplayOracle(Mutex::new(Some(response)))),
            Arc::new(ManualClock::new(NOW)),
            &ClientConfig::default(),
        );
        let err = authorizer
            .user_decrypt(&Wallet::generate(), &[HandleContractPair::new(handle, Address::ZERO)])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse(_)));
    }

    #[test]
    fn test_open_rejects_unrequested_entries() {
        let keypair = EphemeralKeypair::generate();
        let oracle_secret = EphemeralSecret::random_from_rng(OsRng);
        let oracle_public = PublicKey::from(&oracle_secret);
        let shared = oracle_secret.diffie_hellman(&PublicKey::from(keypair.public_key()));
        let handle = Handle([6u8; 32]);
        let response = UserDecryptResponse {
            oracle_public_key: oracle_public.to_bytes(),
            entries: vec![crate::request::SealedEntry {
                handle,
                sealed: crate::sealing::seal(shared.as_bytes(), &handle, 1).unwrap(),
            }],
        };

        let err = keypair.open(&response, &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse(_)));
    }
}
