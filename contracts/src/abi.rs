//! Call and read surface of the deployed contracts
//!
//! State-changing calls are typed ([`Call`]); read-only lookups are
//! dispatched by function name with positional [`CallArg`]s and answer with
//! a [`CallValue`].

use crate::errors::{ContractError, ContractResult};
use crate::ledger::StakeRecord;
use crate::TokenId;
use miner_fhe::{Address, Handle};
use serde::{Deserialize, Serialize};

/// Read-only function names
pub mod functions {
    // Miner
    pub const HAS_MINTED: &str = "hasMinted";
    pub const TOTAL_MINTED: &str = "totalMinted";
    pub const WALLET_TOKENS: &str = "walletTokens";
    pub const STAKED_TOKENS: &str = "stakedTokens";
    pub const GET_MINER_POWER: &str = "getMinerPower";
    pub const GET_STAKE_INFO: &str = "getStakeInfo";
    pub const PENDING_CLAIMABLE_DAYS: &str = "pendingClaimableDays";
    pub const OWNER_OF: &str = "ownerOf";

    // GOLD
    pub const CONFIDENTIAL_BALANCE_OF: &str = "confidentialBalanceOf";
    pub const CONFIDENTIAL_TOTAL_SUPPLY: &str = "confidentialTotalSupply";
    pub const MINTER: &str = "minter";
    pub const OWNER: &str = "owner";
}

/// State-changing call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    /// Mint the caller's Miner (Miner contract)
    MintMiner,
    Stake { token_id: TokenId },
    Claim { token_id: TokenId },
    Unstake { token_id: TokenId },
    /// Hand the GOLD minter role to `minter` (GOLD owner only)
    SetMinter { minter: Address },
}

impl Call {
    pub fn function_name(&self) -> &'static str {
        match self {
            Call::MintMiner => "mint",
            Call::Stake { .. } => "stake",
            Call::Claim { .. } => "claim",
            Call::Unstake { .. } => "unstake",
            Call::SetMinter { .. } => "setMinter",
        }
    }

    pub fn token_id(&self) -> Option<TokenId> {
        match self {
            Call::Stake { token_id } | Call::Claim { token_id } | Call::Unstake { token_id } => {
                Some(*token_id)
            }
            Call::MintMiner | Call::SetMinter { .. } => None,
        }
    }

    /// Canonical bytes used for transaction hashing
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.function_name().as_bytes().to_vec();
        match self {
            Call::Stake { token_id } | Call::Claim { token_id } | Call::Unstake { token_id } => {
                out.extend_from_slice(&token_id.to_be_bytes());
            }
            Call::SetMinter { minter } => out.extend_from_slice(minter.as_bytes()),
            Call::MintMiner => {}
        }
        out
    }
}

/// Positional argument of a read
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallArg {
    Address(Address),
    TokenId(TokenId),
}

/// Value returned by a read
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallValue {
    Bool(bool),
    Uint(u64),
    Address(Address),
    Handle(Handle),
    TokenIds(Vec<TokenId>),
    StakeInfo(StakeRecord),
}

impl CallValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            CallValue::Bool(_) => "bool",
            CallValue::Uint(_) => "uint256",
            CallValue::Address(_) => "address",
            CallValue::Handle(_) => "euint64",
            CallValue::TokenIds(_) => "uint256[]",
            CallValue::StakeInfo(_) => "StakeInfo",
        }
    }

    fn mismatch(&self, expected: &'static str) -> ContractError {
        ContractError::ReturnTypeMismatch {
            expected,
            got: self.type_name(),
        }
    }

    pub fn as_bool(&self) -> ContractResult<bool> {
        match self {
            CallValue::Bool(v) => Ok(*v),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_uint(&self) -> ContractResult<u64> {
        match self {
            CallValue::Uint(v) => Ok(*v),
            other => Err(other.mismatch("uint256")),
        }
    }

    pub fn as_address(&self) -> ContractResult<Address> {
        match self {
            CallValue::Address(v) => Ok(*v),
            other => Err(other.mismatch("address")),
        }
    }

    pub fn as_handle(&self) -> ContractResult<Handle> {
        match self {
            CallValue::Handle(v) => Ok(*v),
            other => Err(other.mismatch("euint64")),
        }
    }

    pub fn as_stake_info(&self) -> ContractResult<StakeRecord> {
        match self {
            CallValue::StakeInfo(v) => Ok(*v),
            other => Err(other.mismatch("StakeInfo")),
        }
    }

    pub fn into_token_ids(self) -> ContractResult<Vec<TokenId>> {
        match self {
            CallValue::TokenIds(v) => Ok(v),
            other => Err(other.mismatch("uint256[]")),
        }
    }
}

fn bad_params(function: &str, message: impl Into<String>) -> ContractError {
    ContractError::InvalidParameters {
        function: function.to_string(),
        message: message.into(),
    }
}

/// Decode a read with no arguments
pub(crate) fn expect_no_args(function: &str, args: &[CallArg]) -> ContractResult<()> {
    if !args.is_empty() {
        return Err(bad_params(function, format!("expected 0 arguments, got {}", args.len())));
    }
    Ok(())
}

/// Decode a read taking a single address
pub(crate) fn expect_address(function: &str, args: &[CallArg]) -> ContractResult<Address> {
    match args {
        [CallArg::Address(address)] => Ok(*address),
        [other] => Err(bad_params(function, format!("expected address, got {:?}", other))),
        _ => Err(bad_params(function, format!("expected 1 argument, got {}", args.len()))),
    }
}

/// Decode a read taking a single token id
pub(crate) fn expect_token_id(function: &str, args: &[CallArg]) -> ContractResult<TokenId> {
    match args {
        [CallArg::TokenId(token_id)] => Ok(*token_id),
        [other] => Err(bad_params(function, format!("expected token id, got {:?}", other))),
        _ => Err(bad_params(function, format!("expected 1 argument, got {}", args.len()))),
    }
}
