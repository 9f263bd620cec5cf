//! Miner Contracts
//!
//! The on-chain half of the Miner game, executed in-process over a shared
//! confidential value store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Devnet                         │
//! ├─────────────────────────────────────────────────────┤
//! │  submit(Call) -> Receipt      read_field(fn, args)  │
//! │      ↓                                              │
//! │  MinerContract ── MinerRegistry (ids, owners, power)│
//! │      │         └─ StakeLedger (stake records)       │
//! │      ↓ mint(reward)                                 │
//! │  ConfidentialGold (encrypted balances)              │
//! │      ↓                                              │
//! │  ConfidentialValueStore (handles, ACL, FHE)         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Features
//!
//! - **One Miner per address**: enforced permanently, independent of transfers
//! - **Encrypted power**: sampled and range-mapped homomorphically
//! - **Whole-day accrual**: claims advance by full days and keep the remainder
//! - **Per-token serialisation**: different tokens mutate in parallel

pub mod abi;
pub mod chain;
pub mod clock;
pub mod context;
pub mod errors;
pub mod gold;
pub mod ledger;
pub mod miner;
pub mod registry;

/// Sequential Miner token id
pub type TokenId = u64;

pub use abi::{functions, Call, CallArg, CallValue};
pub use chain::{contract_address, Deployment, Devnet, DevnetConfig, PendingTransaction, Receipt, TxStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{Event, ExecutionContext};
pub use errors::{ContractError, ContractResult};
pub use gold::ConfidentialGold;
pub use ledger::{StakeLedger, StakeRecord, SECONDS_PER_DAY};
pub use miner::{MinerContract, POWER_MAX, POWER_MIN};
pub use registry::MinerRegistry;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::abi::{functions, Call, CallArg, CallValue};
    pub use crate::chain::{Devnet, DevnetConfig, Receipt, TxStatus};
    pub use crate::clock::{Clock, ManualClock};
    pub use crate::errors::{ContractError, ContractResult};
    pub use crate::ledger::{StakeRecord, SECONDS_PER_DAY};
    pub use crate::TokenId;
}
