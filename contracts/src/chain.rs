//! In-process devnet
//!
//! Hosts one GOLD and one Miner deployment over a shared confidential value
//! store and exposes the two capabilities the client consumes: transaction
//! submission with receipts, and read-only field access by function name.

use crate::abi::{expect_address, expect_no_args, expect_token_id, functions, Call, CallArg, CallValue};
use crate::clock::{Clock, ManualClock};
use crate::context::{Event, ExecutionContext};
use crate::errors::{ContractError, ContractResult};
use crate::gold::ConfidentialGold;
use crate::miner::MinerContract;
use miner_fhe::{Address, ConfidentialValueStore, FheBackend};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Devnet parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevnetConfig {
    pub chain_id: u64,
    /// Initial block timestamp for a manual clock
    pub genesis_timestamp: u64,
    /// Fixed entropy for reproducible power sampling
    pub random_seed: Option<[u8; 32]>,
    /// Label the deployer address is derived from
    pub deployer_label: String,
}

impl DevnetConfig {
    /// Local development chain
    pub fn local() -> Self {
        Self {
            chain_id: 31337,
            genesis_timestamp: 1_700_000_000,
            random_seed: None,
            deployer_label: "deployer".to_string(),
        }
    }

    pub fn with_seed(mut self, seed: [u8; 32]) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn deployer(&self) -> Address {
        Address::from_label(&self.deployer_label)
    }
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self::local()
    }
}

/// Addresses of a deployment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub chain_id: u64,
    pub deployer: Address,
    pub gold: Address,
    pub miner: Address,
}

/// Deterministic contract address from deployer and nonce
pub fn contract_address(deployer: &Address, nonce: u64) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"miner-contract-address");
    hasher.update(deployer.as_bytes());
    hasher.update(&nonce.to_le_bytes());
    Address::from_digest(hasher.finalize().as_bytes())
}

/// Outcome of a transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Success,
    Reverted { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: [u8; 32],
    pub from: Address,
    pub to: Address,
    pub call: Call,
    pub timestamp: u64,
    pub status: TxStatus,
    /// Empty for reverted transactions
    pub events: Vec<Event>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }

    pub fn revert_reason(&self) -> Option<&str> {
        match &self.status {
            TxStatus::Success => None,
            TxStatus::Reverted { reason } => Some(reason),
        }
    }
}

/// Submitted transaction awaiting confirmation
#[derive(Debug)]
pub struct PendingTransaction {
    receipt: Receipt,
}

impl PendingTransaction {
    pub fn hash(&self) -> [u8; 32] {
        self.receipt.tx_hash
    }

    /// Block until the transaction is included
    pub fn wait(self) -> Receipt {
        self.receipt
    }
}

pub struct Devnet<B: FheBackend> {
    config: DevnetConfig,
    deployment: Deployment,
    clock: Arc<dyn Clock>,
    store: Arc<ConfidentialValueStore<B>>,
    gold: Arc<ConfidentialGold<B>>,
    miner: MinerContract<B>,
    tx_nonce: AtomicU64,
}

impl<B: FheBackend> Devnet<B> {
    /// Deploy GOLD, then Miner, then hand the GOLD minter role to Miner
    pub fn deploy(backend: B, config: DevnetConfig, clock: Arc<dyn Clock>) -> ContractResult<Self> {
        let store = Arc::new(match config.random_seed {
            Some(seed) => ConfidentialValueStore::with_seed(backend, seed),
            None => ConfidentialValueStore::new(backend),
        });

        let deployer = config.deployer();
        let deployment = Deployment {
            chain_id: config.chain_id,
            deployer,
            gold: contract_address(&deployer, 0),
            miner: contract_address(&deployer, 1),
        };

        let gold = Arc::new(ConfidentialGold::new(deployment.gold, deployer, store.clone()));
        let miner = MinerContract::new(deployment.miner, store.clone(), gold.clone());
        gold.set_minter(&mut ExecutionContext::new(deployer, clock.now()), deployment.miner)?;

        info!(
            chain_id = deployment.chain_id,
            gold = %deployment.gold,
            miner = %deployment.miner,
            backend = store.backend().name(),
            "devnet deployed"
        );

        Ok(Self {
            config,
            deployment,
            clock,
            store,
            gold,
            miner,
            tx_nonce: AtomicU64::new(0),
        })
    }

    /// Local devnet driven by a manual clock starting at genesis
    pub fn local(backend: B, config: DevnetConfig) -> ContractResult<(Self, Arc<ManualClock>)> {
        let clock = Arc::new(ManualClock::new(config.genesis_timestamp));
        let devnet = Self::deploy(backend, config, clock.clone())?;
        Ok((devnet, clock))
    }

    pub fn config(&self) -> &DevnetConfig {
        &self.config
    }

    pub fn deployment(&self) -> Deployment {
        self.deployment
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn store(&self) -> &Arc<ConfidentialValueStore<B>> {
        &self.store
    }

    pub fn miner(&self) -> &MinerContract<B> {
        &self.miner
    }

    pub fn gold(&self) -> &ConfidentialGold<B> {
        &self.gold
    }

    /// Execute `call` from `from`. Reverts are reported in the receipt.
    pub fn submit(&self, from: Address, call: Call) -> PendingTransaction {
        let nonce = self.tx_nonce.fetch_add(1, Ordering::SeqCst);
        let timestamp = self.clock.now();
        let tx_hash = self.tx_hash(&from, nonce, &call);
        let to = match call {
            Call::SetMinter { .. } => self.deployment.gold,
            _ => self.deployment.miner,
        };

        let mut ctx = ExecutionContext::new(from, timestamp);
        let (status, events) = match self.execute(&mut ctx, &call) {
            Ok(()) => (TxStatus::Success, ctx.into_events()),
            Err(err) => {
                warn!(%from, function = call.function_name(), reason = err.reason(), error = %err, "transaction reverted");
                (
                    TxStatus::Reverted {
                        reason: err.reason().to_string(),
                    },
                    Vec::new(),
                )
            }
        };

        PendingTransaction {
            receipt: Receipt {
                tx_hash,
                from,
                to,
                call,
                timestamp,
                status,
                events,
            },
        }
    }

    fn execute(&self, ctx: &mut ExecutionContext, call: &Call) -> ContractResult<()> {
        match call {
            Call::MintMiner => self.miner.mint(ctx).map(|_| ()),
            Call::Stake { token_id } => self.miner.stake(ctx, *token_id).map(|_| ()),
            Call::Claim { token_id } => self.miner.claim(ctx, *token_id).map(|_| ()),
            Call::Unstake { token_id } => self.miner.unstake(ctx, *token_id).map(|_| ()),
            Call::SetMinter { minter } => self.gold.set_minter(ctx, *minter),
        }
    }

    fn tx_hash(&self, from: &Address, nonce: u64, call: &Call) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.deployment.chain_id.to_le_bytes());
        hasher.update(from.as_bytes());
        hasher.update(&nonce.to_le_bytes());
        hasher.update(&call.encode());
        *hasher.finalize().as_bytes()
    }

    /// Read-only lookup by contract address and function name
    pub fn read_field(&self, contract: Address, function: &str, args: &[CallArg]) -> ContractResult<CallValue> {
        if contract == self.deployment.miner {
            self.read_miner(function, args)
        } else if contract == self.deployment.gold {
            self.read_gold(function, args)
        } else {
            Err(ContractError::ContractNotFound(contract))
        }
    }

    fn read_miner(&self, function: &str, args: &[CallArg]) -> ContractResult<CallValue> {
        let miner = &self.miner;
        match function {
            functions::HAS_MINTED => Ok(CallValue::Bool(
                miner.has_minted(&expect_address(function, args)?),
            )),
            functions::TOTAL_MINTED => {
                expect_no_args(function, args)?;
                Ok(CallValue::Uint(miner.total_minted()))
            }
            functions::WALLET_TOKENS => Ok(CallValue::TokenIds(
                miner.wallet_tokens(&expect_address(function, args)?),
            )),
            functions::STAKED_TOKENS => Ok(CallValue::TokenIds(
                miner.staked_tokens(&expect_address(function, args)?),
            )),
            functions::GET_MINER_POWER => Ok(CallValue::Handle(
                miner.get_miner_power(expect_token_id(function, args)?)?,
            )),
            functions::GET_STAKE_INFO => Ok(CallValue::StakeInfo(
                miner.get_stake_info(expect_token_id(function, args)?),
            )),
            functions::PENDING_CLAIMABLE_DAYS => Ok(CallValue::Uint(
                miner.pending_claimable_days(expect_token_id(function, args)?, self.now()),
            )),
            functions::OWNER_OF => Ok(CallValue::Address(
                miner.owner_of(expect_token_id(function, args)?)?,
            )),
            _ => Err(ContractError::UnknownFunction {
                contract: self.deployment.miner,
                function: function.to_string(),
            }),
        }
    }

    fn read_gold(&self, function: &str, args: &[CallArg]) -> ContractResult<CallValue> {
        match function {
            functions::CONFIDENTIAL_BALANCE_OF => Ok(CallValue::Handle(
                self.gold
                    .confidential_balance_of(&expect_address(function, args)?),
            )),
            functions::CONFIDENTIAL_TOTAL_SUPPLY => {
                expect_no_args(function, args)?;
                Ok(CallValue::Handle(self.gold.total_supply()))
            }
            functions::MINTER => {
                expect_no_args(function, args)?;
                Ok(CallValue::Address(self.gold.minter()))
            }
            functions::OWNER => {
                expect_no_args(function, args)?;
                Ok(CallValue::Address(self.gold.owner()))
            }
            _ => Err(ContractError::UnknownFunction {
                contract: self.deployment.gold,
                function: function.to_string(),
            }),
        }
    }
}

impl<B: FheBackend> std::fmt::Debug for Devnet<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Devnet")
            .field("deployment", &self.deployment)
            .field("now", &self.now())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{StakeRecord, SECONDS_PER_DAY};
    use miner_fhe::{Handle, MockBackend};

    fn devnet() -> (Devnet<MockBackend>, Arc<ManualClock>) {
        Devnet::local(MockBackend, DevnetConfig::local().with_seed([9u8; 32])).unwrap()
    }

    #[test]
    fn test_deployment_wires_minter() {
        let (devnet, _) = devnet();
        let d = devnet.deployment();
        assert_ne!(d.gold, d.miner);
        assert_eq!(
            devnet.read_field(d.gold, functions::MINTER, &[]).unwrap(),
            CallValue::Address(d.miner)
        );
        assert_eq!(
            devnet.read_field(d.gold, functions::OWNER, &[]).unwrap(),
            CallValue::Address(d.deployer)
        );
    }

    #[test]
    fn test_submit_success_and_revert() {
        let (devnet, _) = devnet();
        let alice = Address::from_label("alice");

        let receipt = devnet.submit(alice, Call::MintMiner).wait();
        assert!(receipt.is_success());
        assert_eq!(receipt.to, devnet.deployment().miner);
        assert_eq!(receipt.events.len(), 1);

        let receipt = devnet.submit(alice, Call::MintMiner).wait();
        assert_eq!(receipt.revert_reason(), Some("AlreadyMinted"));
        assert!(receipt.events.is_empty());
    }

    #[test]
    fn test_tx_hashes_unique() {
        let (devnet, _) = devnet();
        let alice = Address::from_label("alice");
        let a = devnet.submit(alice, Call::Claim { token_id: 1 });
        let b = devnet.submit(alice, Call::Claim { token_id: 1 });
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_read_fields_follow_lifecycle() {
        let (devnet, clock) = devnet();
        let d = devnet.deployment();
        let alice = Address::from_label("alice");
        let who = [CallArg::Address(alice)];

        assert_eq!(
            devnet.read_field(d.miner, functions::HAS_MINTED, &who).unwrap(),
            CallValue::Bool(false)
        );
        assert!(devnet.submit(alice, Call::MintMiner).wait().is_success());
        assert!(devnet
            .submit(alice, Call::Stake { token_id: 1 })
            .wait()
            .is_success());
        clock.advance(2 * SECONDS_PER_DAY + 5);

        let token = [CallArg::TokenId(1)];
        assert_eq!(
            devnet.read_field(d.miner, functions::HAS_MINTED, &who).unwrap(),
            CallValue::Bool(true)
        );
        assert_eq!(
            devnet.read_field(d.miner, functions::TOTAL_MINTED, &[]).unwrap(),
            CallValue::Uint(1)
        );
        assert_eq!(
            devnet.read_field(d.miner, functions::WALLET_TOKENS, &who).unwrap(),
            CallValue::TokenIds(vec![])
        );
        assert_eq!(
            devnet.read_field(d.miner, functions::STAKED_TOKENS, &who).unwrap(),
            CallValue::TokenIds(vec![1])
        );
        assert_eq!(
            devnet
                .read_field(d.miner, functions::PENDING_CLAIMABLE_DAYS, &token)
                .unwrap(),
            CallValue::Uint(2)
        );
        assert_eq!(
            devnet.read_field(d.miner, functions::OWNER_OF, &token).unwrap(),
            CallValue::Address(d.miner)
        );
        let info = devnet
            .read_field(d.miner, functions::GET_STAKE_INFO, &token)
            .unwrap()
            .as_stake_info()
            .unwrap();
        assert_eq!(info.staker, alice);
        assert_eq!(info.staked_at, devnet.config().genesis_timestamp);
        assert!(devnet
            .read_field(d.miner, functions::GET_MINER_POWER, &token)
            .unwrap()
            .as_handle()
            .is_ok());
        assert_eq!(
            devnet
                .read_field(d.gold, functions::CONFIDENTIAL_BALANCE_OF, &who)
                .unwrap(),
            CallValue::Handle(Handle::ZERO)
        );
    }

    #[test]
    fn test_unstaked_token_reads_sentinel() {
        let (devnet, _) = devnet();
        let d = devnet.deployment();
        assert_eq!(
            devnet
                .read_field(d.miner, functions::GET_STAKE_INFO, &[CallArg::TokenId(7)])
                .unwrap(),
            CallValue::StakeInfo(StakeRecord::EMPTY)
        );
        assert_eq!(
            devnet
                .read_field(d.miner, functions::PENDING_CLAIMABLE_DAYS, &[CallArg::TokenId(7)])
                .unwrap(),
            CallValue::Uint(0)
        );
    }

    #[test]
    fn test_read_errors() {
        let (devnet, _) = devnet();
        let d = devnet.deployment();
        let stranger = Address::from_label("stranger");

        assert_eq!(
            devnet.read_field(stranger, functions::TOTAL_MINTED, &[]).unwrap_err(),
            ContractError::ContractNotFound(stranger)
        );
        assert_eq!(
            devnet.read_field(d.miner, "balanceOf", &[]).unwrap_err().reason(),
            "UnknownFunction"
        );
        assert_eq!(
            devnet
                .read_field(d.miner, functions::OWNER_OF, &[CallArg::Address(stranger)])
                .unwrap_err()
                .reason(),
            "InvalidParameters"
        );
        assert_eq!(
            devnet
                .read_field(d.miner, functions::GET_MINER_POWER, &[CallArg::TokenId(5)])
                .unwrap_err(),
            ContractError::UnknownToken(5)
        );
    }

    #[test]
    fn test_only_deployer_sets_minter() {
        let (devnet, _) = devnet();
        let mallory = Address::from_label("mallory");
        let receipt = devnet
            .submit(mallory, Call::SetMinter { minter: mallory })
            .wait();
        assert_eq!(receipt.revert_reason(), Some("NotContractOwner"));
        assert_eq!(receipt.to, devnet.deployment().gold);
    }
}
