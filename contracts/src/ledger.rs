//! Stake ledger
//!
//! Per-token state machine with two states, Unstaked and Staked. A
//! [`StakeRecord`] exists only while the token is staked.
//!
//! Claims advance `last_claim` by whole days rather than snapping it to the
//! claim time, so the partial day already accrued counts toward the next
//! threshold:
//!
//! ```text
//! staked_at = t0
//! claim at t0 + 1d + 6h   -> 1 day,  last_claim = t0 + 1d
//! claim at t0 + 2d        -> 1 day,  last_claim = t0 + 2d
//! ```

use crate::errors::{ContractError, ContractResult};
use crate::TokenId;
use miner_fhe::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Length of one accrual day in seconds
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Stake of a single token
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    /// Owner at stake time
    pub staker: Address,
    pub staked_at: u64,
    /// Most recent stake or claim boundary; never decreases
    pub last_claim: u64,
}

impl StakeRecord {
    /// Sentinel returned for unstaked tokens
    pub const EMPTY: StakeRecord = StakeRecord {
        staker: Address::ZERO,
        staked_at: 0,
        last_claim: 0,
    };

    pub fn is_active(&self) -> bool {
        !self.staker.is_zero()
    }

    /// Whole days elapsed since `last_claim`; 0 if the clock reads earlier
    pub fn pending_days(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_claim) / SECONDS_PER_DAY
    }
}

/// Stake records keyed by token id, plus a per-staker index
#[derive(Debug, Default)]
pub struct StakeLedger {
    records: HashMap<TokenId, StakeRecord>,
    by_staker: HashMap<Address, BTreeSet<TokenId>>,
}

impl StakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_staked(&self, token_id: TokenId) -> bool {
        self.records.contains_key(&token_id)
    }

    pub fn record(&self, token_id: TokenId) -> Option<StakeRecord> {
        self.records.get(&token_id).copied()
    }

    /// Stake record, or [`StakeRecord::EMPTY`] when unstaked
    pub fn stake_info(&self, token_id: TokenId) -> StakeRecord {
        self.record(token_id).unwrap_or(StakeRecord::EMPTY)
    }

    pub fn pending_claimable_days(&self, token_id: TokenId, now: u64) -> u64 {
        self.records
            .get(&token_id)
            .map(|r| r.pending_days(now))
            .unwrap_or(0)
    }

    /// Tokens staked by `staker`, ascending
    pub fn staked_tokens(&self, staker: &Address) -> Vec<TokenId> {
        self.by_staker
            .get(staker)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Fails with `AlreadyStaked` unless the token is Unstaked
    pub fn ensure_unstaked(&self, token_id: TokenId) -> ContractResult<()> {
        if self.is_staked(token_id) {
            return Err(ContractError::AlreadyStaked(token_id));
        }
        Ok(())
    }

    /// Unstaked -> Staked
    pub fn open(&mut self, token_id: TokenId, staker: Address, now: u64) -> ContractResult<StakeRecord> {
        self.ensure_unstaked(token_id)?;
        let record = StakeRecord {
            staker,
            staked_at: now,
            last_claim: now,
        };
        self.records.insert(token_id, record);
        self.by_staker.entry(staker).or_default().insert(token_id);
        Ok(record)
    }

    /// Stake record of `token_id`, provided `caller` is its staker
    pub fn require_staker(&self, token_id: TokenId, caller: &Address) -> ContractResult<StakeRecord> {
        let record = self
            .record(token_id)
            .ok_or(ContractError::NotStaked(token_id))?;
        if record.staker != *caller {
            return Err(ContractError::NotStaker {
                token_id,
                caller: *caller,
            });
        }
        Ok(record)
    }

    /// Days `caller` may claim now; fails with `NothingToClaim` on zero
    pub fn claimable_days(&self, token_id: TokenId, caller: &Address, now: u64) -> ContractResult<u64> {
        let days = self.require_staker(token_id, caller)?.pending_days(now);
        if days == 0 {
            return Err(ContractError::NothingToClaim(token_id));
        }
        Ok(days)
    }

    /// `last_claim` after crediting `days` whole days. Does not mutate.
    pub fn claim_target(&self, token_id: TokenId, days: u64) -> ContractResult<u64> {
        let record = self
            .records
            .get(&token_id)
            .ok_or(ContractError::NotStaked(token_id))?;
        let delta = days
            .checked_mul(SECONDS_PER_DAY)
            .ok_or(ContractError::ArithmeticOverflow)?;
        record
            .last_claim
            .checked_add(delta)
            .ok_or(ContractError::ArithmeticOverflow)
    }

    /// Store a target from [`claim_target`](Self::claim_target)
    pub fn commit_claim(&mut self, token_id: TokenId, last_claim: u64) -> ContractResult<StakeRecord> {
        let record = self
            .records
            .get_mut(&token_id)
            .ok_or(ContractError::NotStaked(token_id))?;
        record.last_claim = record.last_claim.max(last_claim);
        Ok(*record)
    }

    /// Advance `last_claim` by whole days
    pub fn advance_claim(&mut self, token_id: TokenId, days: u64) -> ContractResult<StakeRecord> {
        let target = self.claim_target(token_id, days)?;
        self.commit_claim(token_id, target)
    }

    /// Staked -> Unstaked. Unclaimed days are forfeited.
    pub fn close(&mut self, token_id: TokenId, caller: &Address) -> ContractResult<StakeRecord> {
        let record = self.require_staker(token_id, caller)?;
        self.records.remove(&token_id);
        if let Some(ids) = self.by_staker.get_mut(caller) {
            ids.remove(&token_id);
            if ids.is_empty() {
                self.by_staker.remove(caller);
            }
        }
        Ok(record)
    }
}
