//! Client orchestrator
//!
//! Drives the dashboard: one refresh cycle reads mint status, token ids and
//! the GOLD balance handle concurrently, then power handles and stake
//! details, then runs a single decryption batch across both contracts and
//! merges the plaintexts back onto the tokens.
//!
//! Every cycle is tagged with a generation number. Starting a new cycle or
//! switching accounts bumps the generation; a cycle whose generation is no
//! longer current discards its results instead of committing them.
//! Transactions are tagged with the account epoch, which only an account
//! switch bumps, so a result never lands on another account's status.

use crate::authorizer::{DecryptedValues, DecryptionAuthorizer};
use crate::errors::{ClientError, ClientResult};
use crate::provider::{ChainReader, TransactionSender};
use crate::request::HandleContractPair;
use futures::future::try_join_all;
use miner_contracts::{functions, Call, CallArg, CallValue, Deployment, Receipt, StakeRecord, TokenId};
use miner_fhe::{Address, Handle};
use miner_wallet::StructuredSigner;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NO_SIGNER_WARNING: &str = "Connect your wallet to decrypt miner data.";

/// A decrypted value, or the fact that it is still encrypted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Plaintext {
    Known(u64),
    #[default]
    Unknown,
}

impl Plaintext {
    pub fn value(&self) -> Option<u64> {
        match self {
            Plaintext::Known(v) => Some(*v),
            Plaintext::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Plaintext::Known(_))
    }

    fn resolve(handle: &Handle, values: &DecryptedValues) -> Self {
        if handle.is_zero() {
            return Plaintext::Known(0);
        }
        values.get(handle).map(Plaintext::Known).unwrap_or(Plaintext::Unknown)
    }
}

impl fmt::Display for Plaintext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plaintext::Known(v) => write!(f, "{}", v),
            Plaintext::Unknown => write!(f, "unknown"),
        }
    }
}

/// One token as shown on the dashboard
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenView {
    pub token_id: TokenId,
    pub power_handle: Handle,
    pub power: Plaintext,
    /// Staked tokens only
    pub pending_days: Option<u64>,
    /// Staked tokens only
    pub stake: Option<StakeRecord>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DashboardState {
    pub account: Option<Address>,
    pub has_minted: bool,
    pub wallet: Vec<TokenView>,
    pub staked: Vec<TokenView>,
    pub gold_balance_handle: Handle,
    pub gold_balance: Plaintext,
    /// Sum of the known powers
    pub total_power: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusState {
    pub loading: bool,
    pub decrypting: bool,
    pub fetch_error: Option<String>,
    pub decryption_warning: Option<String>,
    pub tx_status: Option<String>,
    /// Action in flight, e.g. `claim-3`
    pub pending_action: Option<String>,
}

impl StatusState {
    pub fn busy(&self) -> bool {
        self.loading || self.decrypting || self.pending_action.is_some()
    }
}

/// Whether a refresh cycle committed its results
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    Superseded,
}

/// The account the dashboard follows, with its signer when connected
#[derive(Clone)]
pub struct AccountSession {
    address: Address,
    signer: Option<Arc<dyn StructuredSigner>>,
}

impl AccountSession {
    pub fn connected(signer: Arc<dyn StructuredSigner>) -> Self {
        Self {
            address: signer.address(),
            signer: Some(signer),
        }
    }

    /// View an account without the ability to sign
    pub fn read_only(address: Address) -> Self {
        Self {
            address,
            signer: None,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

impl fmt::Debug for AccountSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSession")
            .field("address", &self.address)
            .field("connected", &self.signer.is_some())
            .finish()
    }
}

/// User action on a Miner
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Mint,
    Stake(TokenId),
    Claim(TokenId),
    Unstake(TokenId),
}

impl Action {
    fn call(&self) -> Call {
        match *self {
            Action::Mint => Call::MintMiner,
            Action::Stake(token_id) => Call::Stake { token_id },
            Action::Claim(token_id) => Call::Claim { token_id },
            Action::Unstake(token_id) => Call::Unstake { token_id },
        }
    }

    fn key(&self) -> String {
        match self {
            Action::Mint => "mint".to_string(),
            Action::Stake(id) => format!("stake-{}", id),
            Action::Claim(id) => format!("claim-{}", id),
            Action::Unstake(id) => format!("unstake-{}", id),
        }
    }

    fn pending_message(&self) -> String {
        match self {
            Action::Mint => "Minting Miner...".to_string(),
            Action::Stake(id) => format!("Staking Miner #{}...", id),
            Action::Claim(id) => format!("Claiming GOLD for Miner #{}...", id),
            Action::Unstake(id) => format!("Unstaking Miner #{}...", id),
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            Action::Mint => "Miner minted successfully.",
            Action::Stake(_) => "Stake confirmed.",
            Action::Claim(_) => "Rewards claimed.",
            Action::Unstake(_) => "Miner returned to wallet.",
        }
    }
}

struct ViewState {
    generation: u64,
    account_epoch: u64,
    session: Option<AccountSession>,
    dashboard: DashboardState,
    status: StatusState,
}

/// Results of one cycle, before the generation check
struct Snapshot {
    dashboard: DashboardState,
    decryption_warning: Option<String>,
}

pub struct ClientOrchestrator {
    reader: Arc<dyn ChainReader>,
    sender: Arc<dyn TransactionSender>,
    authorizer: DecryptionAuthorizer,
    contracts: Deployment,
    state: RwLock<ViewState>,
}

impl ClientOrchestrator {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        sender: Arc<dyn TransactionSender>,
        authorizer: DecryptionAuthorizer,
        contracts: Deployment,
    ) -> Self {
        Self {
            reader,
            sender,
            authorizer,
            contracts,
            state: RwLock::new(ViewState {
                generation: 0,
                account_epoch: 0,
                session: None,
                dashboard: DashboardState::default(),
                status: StatusState::default(),
            }),
        }
    }

    pub fn dashboard(&self) -> DashboardState {
        self.state.read().dashboard.clone()
    }

    pub fn status(&self) -> StatusState {
        self.state.read().status.clone()
    }

    pub fn account(&self) -> Option<Address> {
        self.state.read().session.as_ref().map(|s| s.address)
    }

    /// Current cycle generation
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Switch to another account (or none). Any in-flight cycle is
    /// superseded and the dashboard is cleared.
    pub fn set_account(&self, session: Option<AccountSession>) {
        let mut state = self.state.write();
        state.generation += 1;
        state.account_epoch += 1;
        state.dashboard = DashboardState {
            account: session.as_ref().map(|s| s.address),
            ..DashboardState::default()
        };
        state.status = StatusState::default();
        info!(account = ?state.dashboard.account, generation = state.generation, "account switched");
        state.session = session;
    }

    // ---------------------------------------------------------------
    // Read path
    // ---------------------------------------------------------------

    /// Run one refresh cycle.
    ///
    /// Fetch failures are recorded in the status and returned; decryption
    /// failures only leave values unknown and raise a warning.
    pub async fn refresh(&self) -> ClientResult<RefreshOutcome> {
        let (generation, session) = {
            let mut state = self.state.write();
            state.generation += 1;
            let generation = state.generation;
            match state.session.clone() {
                Some(session) => {
                    state.status.loading = true;
                    state.status.fetch_error = None;
                    state.status.decryption_warning = None;
                    (generation, session)
                }
                None => {
                    state.dashboard = DashboardState::default();
                    state.status.fetch_error = None;
                    return Ok(RefreshOutcome::Applied);
                }
            }
        };

        match self.load(generation, &session).await {
            Ok(snapshot) => Ok(self.commit(generation, snapshot)),
            Err(err) => {
                let mut state = self.state.write();
                if state.generation != generation {
                    debug!(generation, error = %err, "stale refresh failure ignored");
                    return Ok(RefreshOutcome::Superseded);
                }
                warn!(account = %session.address, error = %err, "refresh failed");
                state.status.loading = false;
                state.status.decrypting = false;
                state.status.fetch_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn read(&self, contract: Address, function: &str, args: Vec<CallArg>) -> ClientResult<CallValue> {
        self.reader.read_field(contract, function, args).await
    }

    async fn load(&self, generation: u64, session: &AccountSession) -> ClientResult<Snapshot> {
        let miner = self.contracts.miner;
        let gold = self.contracts.gold;
        let who = || vec![CallArg::Address(session.address)];

        let (has_minted, wallet_ids, staked_ids, balance_handle) = tokio::try_join!(
            self.read(miner, functions::HAS_MINTED, who()),
            self.read(miner, functions::WALLET_TOKENS, who()),
            self.read(miner, functions::STAKED_TOKENS, who()),
            self.read(gold, functions::CONFIDENTIAL_BALANCE_OF, who()),
        )?;
        let has_minted = has_minted.as_bool()?;
        let wallet_ids = wallet_ids.into_token_ids()?;
        let staked_ids = staked_ids.into_token_ids()?;
        let balance_handle = balance_handle.as_handle()?;

        let token = |id: &TokenId| vec![CallArg::TokenId(*id)];
        let power_handles: Vec<Handle> = try_join_all(
            wallet_ids
                .iter()
                .chain(staked_ids.iter())
                .map(|id| self.read(miner, functions::GET_MINER_POWER, token(id))),
        )
        .await?
        .iter()
        .map(CallValue::as_handle)
        .collect::<Result<_, _>>()?;

        let (stake_infos, pending_days) = if staked_ids.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            let (infos, pending) = tokio::try_join!(
                try_join_all(
                    staked_ids
                        .iter()
                        .map(|id| self.read(miner, functions::GET_STAKE_INFO, token(id)))
                ),
                try_join_all(
                    staked_ids
                        .iter()
                        .map(|id| self.read(miner, functions::PENDING_CLAIMABLE_DAYS, token(id)))
                ),
            )?;
            (
                infos
                    .iter()
                    .map(CallValue::as_stake_info)
                    .collect::<Result<Vec<_>, _>>()?,
                pending
                    .iter()
                    .map(CallValue::as_uint)
                    .collect::<Result<Vec<_>, _>>()?,
            )
        };

        // One batch across both contracts; zero handles never leave the client
        let mut pairs: Vec<HandleContractPair> = power_handles
            .iter()
            .filter(|h| !h.is_zero())
            .map(|h| HandleContractPair::new(*h, miner))
            .collect();
        if !balance_handle.is_zero() {
            pairs.push(HandleContractPair::new(balance_handle, gold));
        }

        let (values, decryption_warning) = self.decrypt(generation, session, &pairs).await;

        let (wallet_powers, staked_powers) = power_handles.split_at(wallet_ids.len());
        let wallet: Vec<TokenView> = wallet_ids
            .iter()
            .zip(wallet_powers)
            .map(|(id, handle)| TokenView {
                token_id: *id,
                power_handle: *handle,
                power: Plaintext::resolve(handle, &values),
                pending_days: None,
                stake: None,
            })
            .collect();
        let staked: Vec<TokenView> = staked_ids
            .iter()
            .zip(staked_powers)
            .zip(stake_infos.iter().zip(pending_days.iter()))
            .map(|((id, handle), (info, pending))| TokenView {
                token_id: *id,
                power_handle: *handle,
                power: Plaintext::resolve(handle, &values),
                pending_days: Some(*pending),
                stake: Some(*info),
            })
            .collect();

        let total_power = wallet
            .iter()
            .chain(staked.iter())
            .filter_map(|t| t.power.value())
            .sum();

        Ok(Snapshot {
            dashboard: DashboardState {
                account: Some(session.address),
                has_minted,
                wallet,
                staked,
                gold_balance_handle: balance_handle,
                gold_balance: Plaintext::resolve(&balance_handle, &values),
                total_power,
            },
            decryption_warning,
        })
    }

    async fn decrypt(
        &self,
        generation: u64,
        session: &AccountSession,
        pairs: &[HandleContractPair],
    ) -> (DecryptedValues, Option<String>) {
        if pairs.is_empty() {
            return (DecryptedValues::default(), None);
        }
        let Some(signer) = &session.signer else {
            return (DecryptedValues::default(), Some(NO_SIGNER_WARNING.to_string()));
        };

        self.update_if_current(generation, |status| status.decrypting = true);
        match self.authorizer.user_decrypt(signer.as_ref(), pairs).await {
            Ok(values) => (values, None),
            Err(err) => {
                warn!(account = %session.address, error = %err, "decryption batch failed");
                (DecryptedValues::default(), Some(format!("Decryption failed: {}", err)))
            }
        }
    }

    fn update_if_current(&self, generation: u64, update: impl FnOnce(&mut StatusState)) {
        let mut state = self.state.write();
        if state.generation == generation {
            update(&mut state.status);
        }
    }

    /// Like [`update_if_current`](Self::update_if_current), keyed on the account epoch
    fn update_if_same_account(&self, epoch: u64, update: impl FnOnce(&mut StatusState)) -> bool {
        let mut state = self.state.write();
        if state.account_epoch != epoch {
            return false;
        }
        update(&mut state.status);
        true
    }

    fn commit(&self, generation: u64, snapshot: Snapshot) -> RefreshOutcome {
        let mut state = self.state.write();
        if state.generation != generation {
            debug!(generation, current = state.generation, "stale refresh cycle discarded");
            return RefreshOutcome::Superseded;
        }
        state.dashboard = snapshot.dashboard;
        state.status.loading = false;
        state.status.decrypting = false;
        state.status.decryption_warning = snapshot.decryption_warning;
        RefreshOutcome::Applied
    }

    // ---------------------------------------------------------------
    // Write path
    // ---------------------------------------------------------------

    pub async fn mint(&self) -> ClientResult<Receipt> {
        self.transact(Action::Mint).await
    }

    pub async fn stake(&self, token_id: TokenId) -> ClientResult<Receipt> {
        self.transact(Action::Stake(token_id)).await
    }

    pub async fn claim(&self, token_id: TokenId) -> ClientResult<Receipt> {
        self.transact(Action::Claim(token_id)).await
    }

    pub async fn unstake(&self, token_id: TokenId) -> ClientResult<Receipt> {
        self.transact(Action::Unstake(token_id)).await
    }

    /// Submit one call; a successful receipt triggers a full refresh, a
    /// failure is surfaced without re-reading.
    async fn transact(&self, action: Action) -> ClientResult<Receipt> {
        let (from, epoch) = {
            let mut state = self.state.write();
            let from = state
                .session
                .as_ref()
                .filter(|s| s.signer.is_some())
                .map(|s| s.address)
                .ok_or(ClientError::NoSigner)?;
            state.status.pending_action = Some(action.key());
            state.status.tx_status = Some(action.pending_message());
            state.status.fetch_error = None;
            (from, state.account_epoch)
        };

        let result = match self.sender.submit(from, action.call()).await {
            Ok(receipt) if receipt.is_success() => Ok(receipt),
            Ok(receipt) => Err(ClientError::Reverted {
                reason: receipt.revert_reason().unwrap_or("unknown").to_string(),
            }),
            Err(err) => Err(err),
        };

        match result {
            Ok(receipt) => {
                info!(action = %action.key(), account = %from, "transaction confirmed");
                let current = self.update_if_same_account(epoch, |status| {
                    status.pending_action = None;
                    status.tx_status = Some(action.success_message().to_string());
                });
                if !current {
                    debug!(action = %action.key(), account = %from, "account switched, transaction status dropped");
                } else if let Err(err) = self.refresh().await {
                    debug!(error = %err, "refresh after transaction failed");
                }
                Ok(receipt)
            }
            Err(err) => {
                warn!(action = %action.key(), account = %from, error = %err, "transaction failed");
                self.update_if_same_account(epoch, |status| {
                    status.pending_action = None;
                    status.tx_status = None;
                    status.fetch_error = Some(err.to_string());
                });
                Err(err)
            }
        }
    }
}

impl fmt::Debug for ClientOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ClientOrchestrator")
            .field("contracts", &self.contracts)
            .field("generation", &state.generation)
            .field("session", &state.session)
            .finish()
    }
}
