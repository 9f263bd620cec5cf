//! Chain access
//!
//! The orchestrator reaches the contracts through two capabilities: a
//! read-only field accessor and a transaction sender. [`DevnetProvider`]
//! implements both over an in-process [`Devnet`], running each call on the
//! blocking pool since homomorphic work can take seconds.

use crate::errors::{ClientError, ClientResult};
use async_trait::async_trait;
use miner_contracts::{Call, CallArg, CallValue, Devnet, Receipt};
use miner_fhe::{Address, FheBackend};
use std::sync::Arc;
use tracing::debug;

/// Read-only contract state accessor
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn read_field(
        &self,
        contract: Address,
        function: &str,
        args: Vec<CallArg>,
    ) -> ClientResult<CallValue>;
}

/// Transaction submission; resolves once the receipt is available
#[async_trait]
pub trait TransactionSender: Send + Sync {
    async fn submit(&self, from: Address, call: Call) -> ClientResult<Receipt>;
}

/// Both capabilities over an in-process devnet
pub struct DevnetProvider<B: FheBackend> {
    devnet: Arc<Devnet<B>>,
}

impl<B: FheBackend> Clone for DevnetProvider<B> {
    fn clone(&self) -> Self {
        Self {
            devnet: self.devnet.clone(),
        }
    }
}

impl<B: FheBackend + 'static> DevnetProvider<B> {
    pub fn new(devnet: Arc<Devnet<B>>) -> Self {
        Self { devnet }
    }

    pub fn devnet(&self) -> &Arc<Devnet<B>> {
        &self.devnet
    }
}

#[async_trait]
impl<B: FheBackend + 'static> ChainReader for DevnetProvider<B> {
    async fn read_field(
        &self,
        contract: Address,
        function: &str,
        args: Vec<CallArg>,
    ) -> ClientResult<CallValue> {
        let devnet = self.devnet.clone();
        let function = function.to_string();
        tokio::task::spawn_blocking(move || devnet.read_field(contract, &function, &args))
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?
            .map_err(ClientError::from)
    }
}

#[async_trait]
impl<B: FheBackend + 'static> TransactionSender for DevnetProvider<B> {
    async fn submit(&self, from: Address, call: Call) -> ClientResult<Receipt> {
        let devnet = self.devnet.clone();
        let receipt = tokio::task::spawn_blocking(move || devnet.submit(from, call).wait())
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        debug!(tx = %hex::encode(&receipt.tx_hash[..8]), success = receipt.is_success(), "receipt received");
        Ok(receipt)
    }
}
