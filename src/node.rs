//! Local node
//!
//! Wires a devnet, the decryption oracle and the client together so the
//! whole game runs in one process.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                   LocalNode                   │
//! ├───────────────────────────────────────────────┤
//! │  ClientOrchestrator                           │
//! │    ├─ DevnetProvider ──> Devnet (Miner, GOLD) │
//! │    └─ DecryptionAuthorizer ──> KmsOracle      │
//! │                                   │           │
//! │            ConfidentialValueStore ┘           │
//! └───────────────────────────────────────────────┘
//! ```

use miner_client::{
    signing_domain, ClientConfig, ClientOrchestrator, ConfigError, DecryptionAuthorizer,
    DevnetProvider, KmsOracle, KMS_VERIFIER_LABEL,
};
use miner_contracts::{ContractError, Deployment, Devnet, DevnetConfig, ManualClock};
use miner_fhe::{Address, FheBackend};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors while starting a node
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Client expects chain {client}, devnet runs chain {devnet}")]
    ChainMismatch { client: u64, devnet: u64 },
    #[error("Deployment failed: {0}")]
    Deploy(#[from] ContractError),
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;

/// Node configuration
#[derive(Clone, Debug, Default)]
pub struct NodeConfig {
    pub devnet: DevnetConfig,
    pub client: ClientConfig,
}

impl NodeConfig {
    /// Configuration for a local development node
    pub fn local() -> Self {
        Self {
            devnet: DevnetConfig::local(),
            client: ClientConfig::default(),
        }
    }

    /// Deterministic FHE randomness, for reproducible sessions
    pub fn with_seed(mut self, seed: [u8; 32]) -> Self {
        self.devnet = self.devnet.with_seed(seed);
        self
    }
}

/// Devnet plus decryption oracle, sharing one value store
pub struct LocalNode<B: FheBackend + 'static> {
    config: NodeConfig,
    devnet: Arc<Devnet<B>>,
    clock: Arc<ManualClock>,
    oracle: Arc<KmsOracle<B>>,
}

impl<B: FheBackend + 'static> LocalNode<B> {
    /// Deploy the contracts and bring up the oracle
    pub fn start(backend: B, config: NodeConfig) -> NodeResult<Self> {
        config.client.validate()?;
        if config.client.chain_id != config.devnet.chain_id {
            return Err(NodeError::ChainMismatch {
                client: config.client.chain_id,
                devnet: config.devnet.chain_id,
            });
        }

        let (devnet, clock) = Devnet::local(backend, config.devnet.clone())?;
        let devnet = Arc::new(devnet);

        let decryption = &config.client.decryption;
        let domain = signing_domain(
            &decryption.domain_name,
            &decryption.domain_version,
            config.client.chain_id,
            Address::from_label(KMS_VERIFIER_LABEL),
        );
        let oracle = Arc::new(KmsOracle::new(
            devnet.store().clone(),
            clock.clone(),
            domain,
            decryption.max_validity_days,
        ));

        let deployment = devnet.deployment();
        info!(
            chain_id = deployment.chain_id,
            miner = %deployment.miner,
            gold = %deployment.gold,
            "local node started"
        );

        Ok(Self {
            config,
            devnet,
            clock,
            oracle,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn devnet(&self) -> &Arc<Devnet<B>> {
        &self.devnet
    }

    /// Block time source; advance it to let stakes accrue
    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    pub fn deployment(&self) -> Deployment {
        self.devnet.deployment()
    }

    pub fn oracle(&self) -> &Arc<KmsOracle<B>> {
        &self.oracle
    }

    pub fn provider(&self) -> DevnetProvider<B> {
        DevnetProvider::new(self.devnet.clone())
    }

    pub fn authorizer(&self) -> DecryptionAuthorizer {
        DecryptionAuthorizer::new(self.oracle.clone(), self.clock.clone(), &self.config.client)
    }

    /// A fresh dashboard client connected to this node
    pub fn orchestrator(&self) -> ClientOrchestrator {
        let provider = Arc::new(self.provider());
        ClientOrchestrator::new(provider.clone(), provider, self.authorizer(), self.deployment())
    }
}
