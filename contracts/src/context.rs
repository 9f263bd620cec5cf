//! Execution context and emitted events

use crate::ledger::StakeRecord;
use crate::TokenId;
use miner_fhe::{Address, Handle};
use serde::{Deserialize, Serialize};

/// Event emitted by a successful call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    MinerMinted {
        token_id: TokenId,
        owner: Address,
        power: Handle,
    },
    Staked {
        token_id: TokenId,
        record: StakeRecord,
    },
    Claimed {
        token_id: TokenId,
        days: u64,
        reward: Handle,
        record: StakeRecord,
    },
    Unstaked {
        token_id: TokenId,
        staker: Address,
    },
    GoldMinted {
        to: Address,
        amount: Handle,
        balance: Handle,
    },
    MinterUpdated {
        minter: Address,
    },
}

/// Per-transaction execution context.
///
/// The timestamp is read once when the transaction starts and stays fixed
/// for every contract it touches.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    /// Account that submitted the transaction
    pub sender: Address,
    /// Block timestamp (seconds)
    pub timestamp: u64,
    events: Vec<Event>,
}

impl ExecutionContext {
    pub fn new(sender: Address, timestamp: u64) -> Self {
        Self {
            sender,
            timestamp,
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}
