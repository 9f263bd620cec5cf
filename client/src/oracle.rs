//! Decryption oracle
//!
//! [`KmsOracle`] is the in-process key management service. It is the only
//! component allowed to call [`ConfidentialValueStore::reveal`], and it
//! does so only after the whole request has been authorized:
//!
//! 1. validity window: `start <= now < start + duration`, duration within bounds
//! 2. signature over the rebuilt authorization message, signer == requester
//! 3. every pair's contract is in the signed contract list
//! 4. every known handle was produced by its contract and is allowed to
//!    both the requester and the contract
//!
//! Handles the store does not know produce no entry. Any other failure
//! rejects the batch; nothing is revealed.

use crate::errors::{ClientError, ClientResult};
use crate::request::{authorization_type, SealedEntry, UserDecryptRequest, UserDecryptResponse};
use crate::sealing::seal;
use async_trait::async_trait;
use miner_contracts::{Clock, SECONDS_PER_DAY};
use miner_fhe::{Address, ConfidentialValueStore, FheBackend};
use miner_wallet::Domain;
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use x25519_dalek::{EphemeralSecret, PublicKey};

/// Label the KMS verifying address is derived from
pub const KMS_VERIFIER_LABEL: &str = "kms-decryption-verifier";

/// Oracle that exchanges a signed authorization for sealed plaintexts
#[async_trait]
pub trait DecryptionOracle: Send + Sync {
    /// Verifying contract of the signing domain
    fn verifying_contract(&self) -> Address;

    async fn user_decrypt(&self, request: UserDecryptRequest) -> ClientResult<UserDecryptResponse>;
}

pub struct KmsOracle<B: FheBackend> {
    store: Arc<ConfidentialValueStore<B>>,
    clock: Arc<dyn Clock>,
    domain: Domain,
    max_validity_days: u64,
}

fn rejected(reason: impl Into<String>) -> ClientError {
    ClientError::AuthorizationRejected(reason.into())
}

impl<B: FheBackend> KmsOracle<B> {
    pub fn new(
        store: Arc<ConfidentialValueStore<B>>,
        clock: Arc<dyn Clock>,
        domain: Domain,
        max_validity_days: u64,
    ) -> Self {
        Self {
            store,
            clock,
            domain,
            max_validity_days,
        }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    fn check_window(&self, request: &UserDecryptRequest) -> ClientResult<()> {
        if request.duration_days == 0 || request.duration_days > self.max_validity_days {
            return Err(rejected(format!(
                "validity of {} days outside 1..={}",
                request.duration_days, self.max_validity_days
            )));
        }
        let end = request
            .duration_days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|d| d.checked_add(request.start_timestamp))
            .ok_or_else(|| rejected("validity window overflows"))?;

        let now = self.clock.now();
        if now < request.start_timestamp {
            return Err(rejected("authorization not yet valid"));
        }
        if now >= end {
            return Err(rejected("authorization expired"));
        }
        Ok(())
    }

    /// Validate the request; returns the indices of pairs the store knows
    fn authorize(&self, request: &UserDecryptRequest) -> ClientResult<Vec<usize>> {
        self.check_window(request)?;

        let signer = request
            .signature
            .verify(&self.domain, &authorization_type(), &request.message())
            .map_err(|e| rejected(e.to_string()))?;
        if signer != request.requester {
            return Err(rejected(format!(
                "signed by {} on behalf of {}",
                signer, request.requester
            )));
        }

        let mut known = Vec::with_capacity(request.pairs.len());
        for (index, pair) in request.pairs.iter().enumerate() {
            if !request.contract_addresses.contains(&pair.contract) {
                return Err(rejected(format!("contract {} not authorized", pair.contract)));
            }
            let Some(origin) = self.store.origin(&pair.handle) else {
                trace!(handle = %pair.handle, "unknown handle skipped");
                continue;
            };
            if origin != pair.contract {
                return Err(rejected(format!(
                    "handle {} does not belong to {}",
                    pair.handle, pair.contract
                )));
            }
            if !self.store.is_allowed(&pair.handle, &request.requester)
                || !self.store.is_allowed(&pair.handle, &pair.contract)
            {
                return Err(rejected(format!(
                    "{} may not decrypt {}",
                    request.requester, pair.handle
                )));
            }
            known.push(index);
        }
        Ok(known)
    }
}

#[async_trait]
impl<B: FheBackend> DecryptionOracle for KmsOracle<B> {
    fn verifying_contract(&self) -> Address {
        self.domain.verifying_contract
    }

    async fn user_decrypt(&self, request: UserDecryptRequest) -> ClientResult<UserDecryptResponse> {
        let known = match self.authorize(&request) {
            Ok(known) => known,
            Err(err) => {
                warn!(requester = %request.requester, error = %err, "user decryption rejected");
                return Err(err);
            }
        };

        let secret = EphemeralSecret::random_from_rng(OsRng);
        let oracle_public_key = PublicKey::from(&secret);
        let shared = secret.diffie_hellman(&PublicKey::from(request.public_key));
        if !shared.was_contributory() {
            return Err(rejected("degenerate ephemeral public key"));
        }

        let mut entries = Vec::with_capacity(known.len());
        for index in known {
            let handle = request.pairs[index].handle;
            let value = self
                .store
                .reveal(&handle, &request.requester)
                .map_err(|e| rejected(e.to_string()))?;
            entries.push(SealedEntry {
                handle,
                sealed: seal(shared.as_bytes(), &handle, value)?,
            });
        }

        info!(
            requester = %request.requester,
            requested = request.pairs.len(),
            sealed = entries.len(),
            "user decryption served"
        );
        debug!(window_start = request.start_timestamp, days = request.duration_days, "authorization window");

        Ok(UserDecryptResponse {
            oracle_public_key: oracle_public_key.to_bytes(),
            entries,
        })
    }
}
