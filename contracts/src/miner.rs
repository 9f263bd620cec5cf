//! Miner contract
//!
//! Couples the [`MinerRegistry`] and the [`StakeLedger`]. Mutations on one
//! token are serialised through a per-token lock; registry and ledger maps
//! sit behind `RwLock`s that are only held for checks and commits, never
//! across homomorphic work.
//!
//! Staked tokens are held in custody by the contract itself, so `ownerOf`
//! reports the Miner contract address while a token is staked.

use crate::context::{Event, ExecutionContext};
use crate::errors::{ContractError, ContractResult};
use crate::gold::ConfidentialGold;
use crate::ledger::{StakeLedger, StakeRecord};
use crate::registry::MinerRegistry;
use crate::TokenId;
use dashmap::DashMap;
use miner_fhe::{Address, ConfidentialValueStore, FheBackend, Handle};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info};

/// Lowest possible power
pub const POWER_MIN: u64 = 20;
/// Highest possible power
pub const POWER_MAX: u64 = 100;

const POWER_SPAN: u64 = POWER_MAX - POWER_MIN + 1;

pub struct MinerContract<B: FheBackend> {
    address: Address,
    store: Arc<ConfidentialValueStore<B>>,
    gold: Arc<ConfidentialGold<B>>,
    registry: RwLock<MinerRegistry>,
    ledger: RwLock<StakeLedger>,
    token_locks: DashMap<TokenId, Arc<Mutex<()>>>,
    mint_lock: Mutex<()>,
}

impl<B: FheBackend> MinerContract<B> {
    pub fn new(
        address: Address,
        store: Arc<ConfidentialValueStore<B>>,
        gold: Arc<ConfidentialGold<B>>,
    ) -> Self {
        Self {
            address,
            store,
            gold,
            registry: RwLock::new(MinerRegistry::new()),
            ledger: RwLock::new(StakeLedger::new()),
            token_locks: DashMap::new(),
            mint_lock: Mutex::new(()),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn gold(&self) -> &Arc<ConfidentialGold<B>> {
        &self.gold
    }

    fn token_lock(&self, token_id: TokenId) -> ContractResult<Arc<Mutex<()>>> {
        self.registry.read().owner_of(token_id)?;
        Ok(Arc::clone(&self.token_locks.entry(token_id).or_default()))
    }

    // ---------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------

    /// Mint the sender's Miner with an encrypted power in
    /// [`POWER_MIN`]..=[`POWER_MAX`]
    pub fn mint(&self, ctx: &mut ExecutionContext) -> ContractResult<TokenId> {
        let caller = ctx.sender;
        let _minting = self.mint_lock.lock();
        self.registry.read().next_mint(&caller)?;

        // power = (raw % 81) + 20, never decrypted here
        let raw = self.store.random(self.address)?;
        let bounded = self.store.rem_scalar(self.address, raw, POWER_SPAN)?;
        let power = self.store.add_scalar(self.address, bounded, POWER_MIN)?;
        self.store.allow(self.address, power, caller)?;

        let token_id = self.registry.write().record_mint(caller, power)?;

        info!(token_id, owner = %caller, "Miner minted");
        ctx.emit(Event::MinerMinted {
            token_id,
            owner: caller,
            power,
        });
        Ok(token_id)
    }

    /// Move a wallet-held token into staking custody
    pub fn stake(&self, ctx: &mut ExecutionContext, token_id: TokenId) -> ContractResult<StakeRecord> {
        let caller = ctx.sender;
        let lock = self.token_lock(token_id)?;
        let _serial = lock.lock();

        let mut registry = self.registry.write();
        let mut ledger = self.ledger.write();
        let owner = registry.owner_of(token_id)?;
        ledger.ensure_unstaked(token_id)?;
        if owner != caller {
            return Err(ContractError::NotOwner { token_id, caller });
        }

        registry.transfer(token_id, caller, self.address)?;
        let record = ledger.open(token_id, caller, ctx.timestamp)?;
        drop(ledger);
        drop(registry);

        info!(token_id, staker = %caller, at = record.staked_at, "Miner staked");
        ctx.emit(Event::Staked { token_id, record });
        Ok(record)
    }

    /// Credit `power * days` GOLD for every whole day since the last claim.
    ///
    /// The new `last_claim` is computed before any GOLD moves, so every
    /// fallible step precedes the credit and a failed claim changes nothing.
    pub fn claim(&self, ctx: &mut ExecutionContext, token_id: TokenId) -> ContractResult<StakeRecord> {
        let caller = ctx.sender;
        let lock = self.token_lock(token_id)?;
        let _serial = lock.lock();

        let (days, target, power) = {
            let registry = self.registry.read();
            let ledger = self.ledger.read();
            let days = ledger.claimable_days(token_id, &caller, ctx.timestamp)?;
            let target = ledger.claim_target(token_id, days)?;
            (days, target, registry.power_of(token_id)?)
        };

        let reward = self.store.scalar_multiply(self.address, power, days)?;
        self.store.allow(self.address, reward, self.gold.address())?;
        self.gold.mint(ctx, self.address, caller, reward)?;

        // The token lock keeps the record alive between plan and commit
        let record = self.ledger.write().commit_claim(token_id, target)?;

        info!(token_id, staker = %caller, days, last_claim = record.last_claim, "rewards claimed");
        ctx.emit(Event::Claimed {
            token_id,
            days,
            reward,
            record,
        });
        Ok(record)
    }

    /// Return a staked token to its staker's wallet. Unclaimed days are
    /// forfeited.
    pub fn unstake(&self, ctx: &mut ExecutionContext, token_id: TokenId) -> ContractResult<StakeRecord> {
        let caller = ctx.sender;
        let lock = self.token_lock(token_id)?;
        let _serial = lock.lock();

        let mut registry = self.registry.write();
        let mut ledger = self.ledger.write();
        let record = ledger.require_staker(token_id, &caller)?;
        registry.transfer(token_id, self.address, caller)?;
        ledger.close(token_id, &caller)?;
        drop(ledger);
        drop(registry);

        let forfeited = record.pending_days(ctx.timestamp);
        if forfeited > 0 {
            debug!(token_id, forfeited, "unclaimed days forfeited on unstake");
        }
        info!(token_id, staker = %caller, "Miner unstaked");
        ctx.emit(Event::Unstaked {
            token_id,
            staker: caller,
        });
        Ok(record)
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    pub fn has_minted(&self, account: &Address) -> bool {
        self.registry.read().has_minted(account)
    }

    pub fn total_minted(&self) -> u64 {
        self.registry.read().total_minted()
    }

    /// Tokens held in `account`'s wallet, ascending
    pub fn wallet_tokens(&self, account: &Address) -> Vec<TokenId> {
        self.registry.read().tokens_of(account)
    }

    /// Tokens `account` has staked, ascending
    pub fn staked_tokens(&self, account: &Address) -> Vec<TokenId> {
        self.ledger.read().staked_tokens(account)
    }

    pub fn owner_of(&self, token_id: TokenId) -> ContractResult<Address> {
        self.registry.read().owner_of(token_id)
    }

    pub fn get_miner_power(&self, token_id: TokenId) -> ContractResult<Handle> {
        self.registry.read().power_of(token_id)
    }

    pub fn get_stake_info(&self, token_id: TokenId) -> StakeRecord {
        self.ledger.read().stake_info(token_id)
    }

    pub fn pending_claimable_days(&self, token_id: TokenId, now: u64) -> u64 {
        self.ledger.read().pending_claimable_days(token_id, now)
    }
}

impl<B: FheBackend> std::fmt::Debug for MinerContract<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinerContract")
            .field("address", &self.address)
            .field("total_minted", &self.total_minted())
            .finish()
    }
}
