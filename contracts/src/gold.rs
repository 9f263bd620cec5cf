//! Confidential GOLD token
//!
//! Balances are encrypted handles; a holder without a balance reads as the
//! zero handle. Only the minter may credit balances, and every credit is a
//! homomorphic addition. There are no transfers.

use crate::context::{Event, ExecutionContext};
use crate::errors::{ContractError, ContractResult};
use miner_fhe::{Address, ConfidentialValueStore, FheBackend, Handle};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub const NAME: &str = "Confidential Gold";
pub const SYMBOL: &str = "GOLD";

pub struct ConfidentialGold<B: FheBackend> {
    address: Address,
    owner: Address,
    store: Arc<ConfidentialValueStore<B>>,
    minter: RwLock<Address>,
    balances: RwLock<HashMap<Address, Handle>>,
    total_supply: RwLock<Handle>,
    /// Serialises credits; readers only take the short map locks
    credit_lock: Mutex<()>,
}

impl<B: FheBackend> ConfidentialGold<B> {
    /// Deploy with `owner` and no minter
    pub fn new(address: Address, owner: Address, store: Arc<ConfidentialValueStore<B>>) -> Self {
        Self {
            address,
            owner,
            store,
            minter: RwLock::new(Address::ZERO),
            balances: RwLock::new(HashMap::new()),
            total_supply: RwLock::new(Handle::ZERO),
            credit_lock: Mutex::new(()),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn minter(&self) -> Address {
        *self.minter.read()
    }

    /// Encrypted balance; the zero handle until the first credit
    pub fn confidential_balance_of(&self, account: &Address) -> Handle {
        self.balances
            .read()
            .get(account)
            .copied()
            .unwrap_or(Handle::ZERO)
    }

    pub fn total_supply(&self) -> Handle {
        *self.total_supply.read()
    }

    pub fn set_minter(&self, ctx: &mut ExecutionContext, minter: Address) -> ContractResult<()> {
        if ctx.sender != self.owner {
            return Err(ContractError::NotContractOwner(ctx.sender));
        }
        *self.minter.write() = minter;
        info!(gold = %self.address, %minter, "GOLD minter updated");
        ctx.emit(Event::MinterUpdated { minter });
        Ok(())
    }

    /// Credit `amount` to `to`. `caller` is the contract invoking the mint
    /// and must be the minter; GOLD must be allowed on `amount`.
    pub fn mint(
        &self,
        ctx: &mut ExecutionContext,
        caller: Address,
        to: Address,
        amount: Handle,
    ) -> ContractResult<Handle> {
        if caller != self.minter() {
            return Err(ContractError::UnauthorizedMinter(caller));
        }

        let _credit = self.credit_lock.lock();
        let balance = self
            .store
            .add(self.address, self.confidential_balance_of(&to), amount)?;
        let supply = self.store.add(self.address, self.total_supply(), amount)?;
        self.store.allow(self.address, balance, to)?;

        self.balances.write().insert(to, balance);
        *self.total_supply.write() = supply;

        debug!(%to, %balance, "GOLD balance credited");
        ctx.emit(Event::GoldMinted {
            to,
            amount,
            balance,
        });
        Ok(balance)
    }
}

impl<B: FheBackend> std::fmt::Debug for ConfidentialGold<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfidentialGold")
            .field("address", &self.address)
            .field("owner", &self.owner)
            .field("minter", &self.minter())
            .field("holders", &self.balances.read().len())
            .finish()
    }
}
