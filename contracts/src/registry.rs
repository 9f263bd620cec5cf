//! Miner token registry
//!
//! Arena of minted tokens keyed by id. Tokens never reference their owner
//! object, only its address; the per-address wallet index is kept in
//! ascending id order so enumeration is stable and duplicate-free.

use crate::errors::{ContractError, ContractResult};
use crate::TokenId;
use miner_fhe::{Address, Handle};
use std::collections::{BTreeSet, HashMap, HashSet};

/// First token id handed out
pub const FIRST_TOKEN_ID: TokenId = 1;

/// Identity, ownership and encrypted power of every minted token
#[derive(Debug)]
pub struct MinerRegistry {
    next_token_id: TokenId,
    minted: HashSet<Address>,
    owners: HashMap<TokenId, Address>,
    powers: HashMap<TokenId, Handle>,
    holdings: HashMap<Address, BTreeSet<TokenId>>,
}

impl Default for MinerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MinerRegistry {
    pub fn new() -> Self {
        Self {
            next_token_id: FIRST_TOKEN_ID,
            minted: HashSet::new(),
            owners: HashMap::new(),
            powers: HashMap::new(),
            holdings: HashMap::new(),
        }
    }

    /// Whether `account` has ever minted
    pub fn has_minted(&self, account: &Address) -> bool {
        self.minted.contains(account)
    }

    pub fn total_minted(&self) -> u64 {
        self.next_token_id - FIRST_TOKEN_ID
    }

    /// Check mint eligibility and return the id the next mint will receive
    pub fn next_mint(&self, caller: &Address) -> ContractResult<TokenId> {
        if self.has_minted(caller) {
            return Err(ContractError::AlreadyMinted(*caller));
        }
        Ok(self.next_token_id)
    }

    /// Record a mint prepared with [`next_mint`](Self::next_mint)
    pub fn record_mint(&mut self, caller: Address, power: Handle) -> ContractResult<TokenId> {
        let token_id = self.next_mint(&caller)?;
        self.next_token_id += 1;
        self.minted.insert(caller);
        self.owners.insert(token_id, caller);
        self.powers.insert(token_id, power);
        self.holdings.entry(caller).or_default().insert(token_id);
        Ok(token_id)
    }

    pub fn owner_of(&self, token_id: TokenId) -> ContractResult<Address> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or(ContractError::UnknownToken(token_id))
    }

    /// Encrypted power handle; immutable after mint
    pub fn power_of(&self, token_id: TokenId) -> ContractResult<Handle> {
        self.powers
            .get(&token_id)
            .copied()
            .ok_or(ContractError::UnknownToken(token_id))
    }

    /// Tokens currently held by `holder`, ascending
    pub fn tokens_of(&self, holder: &Address) -> Vec<TokenId> {
        self.holdings
            .get(holder)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Move ownership of `token_id` from `from` to `to`
    pub fn transfer(&mut self, token_id: TokenId, from: Address, to: Address) -> ContractResult<()> {
        let owner = self.owner_of(token_id)?;
        if owner != from {
            return Err(ContractError::NotOwner {
                token_id,
                caller: from,
            });
        }
        if let Some(ids) = self.holdings.get_mut(&from) {
            ids.remove(&token_id);
            if ids.is_empty() {
                self.holdings.remove(&from);
            }
        }
        self.holdings.entry(to).or_default().insert(token_id);
        self.owners.insert(token_id, to);
        Ok(())
    }
}
