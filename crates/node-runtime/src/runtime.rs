//! # Node Runtime
//!
//! Wires the in-memory adapters around [`DaConsensus`] and runs the
//! configured role.
//!
//! ## Startup Sequence
//!
//! 1. Resolve the validator key (configured or throwaway)
//! 2. Build genesis and the chain
//! 3. Construct consensus (fails fast on bad configuration)
//! 4. Start the role-event logger and the role itself

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use da_01_staking::adapters::{InMemoryChain, InMemoryState};
use da_02_consensus::{
    ConsensusDependencies, ConsensusEngine, DaConsensus, InMemoryDaLayer, InMemoryKeyStore,
    InMemoryTxPool, RoleEvent, StandaloneSyncer, StaticSecretsManager, SystemTimeSource,
    VALIDATOR_KEY_SECRET,
};
use parking_lot::Mutex;
use shared_crypto::Secp256k1KeyPair;
use shared_types::{address_to_hex, hash_to_hex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::NodeConfig;
use crate::genesis::GenesisBuilder;

/// How long shutdown waits for the role task.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// A single node running one consensus role.
pub struct NodeRuntime {
    consensus: Arc<DaConsensus>,
    chain: Arc<InMemoryChain>,
    txpool: Arc<InMemoryTxPool>,
    da: InMemoryDaLayer,
    events: Mutex<Option<mpsc::UnboundedReceiver<RoleEvent>>>,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl NodeRuntime {
    /// Create a node runtime from configuration.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let secret = match config.validator_key {
            Some(key) => key.into_bytes(),
            None => {
                let key = Secp256k1KeyPair::generate();
                warn!(
                    "No validator key configured, generated throwaway key for {}",
                    address_to_hex(&key.address())
                );
                key.to_bytes().to_vec()
            }
        };
        let secrets = StaticSecretsManager::new().with_secret(VALIDATOR_KEY_SECRET, secret);

        let keystore = InMemoryKeyStore::new();
        if let Some(raw) = &config.watchtower_key {
            let bytes = hex::decode(raw.trim().trim_start_matches("0x"))
                .context("DA_WATCHTOWER_KEY is not valid hex")?;
            let key = Secp256k1KeyPair::from_slice(&bytes)
                .context("DA_WATCHTOWER_KEY is not a valid secp256k1 key")?;
            keystore.insert(&key);
        }

        let state = InMemoryState::new();
        let genesis = GenesisBuilder::new(config.genesis)
            .build(&state)
            .context("Failed to build genesis block")?;
        info!("Genesis block created: {}", hash_to_hex(&genesis.hash()));
        let chain = Arc::new(InMemoryChain::with_genesis(genesis));

        let da = InMemoryDaLayer::new();
        let txpool = Arc::new(InMemoryTxPool::new());
        let deps = ConsensusDependencies {
            chain: chain.clone(),
            executor: Arc::new(state.clone()),
            ledger: Arc::new(state.clone()),
            state_writer: Some(Arc::new(state)),
            da_connector: Arc::new(da.clone()),
            txpool: txpool.clone(),
            secrets: Arc::new(secrets),
            keystore: Arc::new(keystore),
            syncer: Arc::new(StandaloneSyncer::new()),
            time_source: Arc::new(SystemTimeSource),
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let consensus = DaConsensus::new(deps, config.consensus)
            .context("Failed to initialize consensus")?
            .with_event_sender(events_tx);

        Ok(Self {
            consensus: Arc::new(consensus),
            chain,
            txpool,
            da,
            events: Mutex::new(Some(events_rx)),
            event_task: Mutex::new(None),
        })
    }

    /// Start the role.
    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  DA Rollup Node v{}", env!("CARGO_PKG_VERSION"));
        info!("  Role: {}", self.consensus.role());
        info!("  Address: {}", address_to_hex(&self.consensus.address()));
        info!("===========================================");

        if let Some(mut events) = self.events.lock().take() {
            let handle = tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    log_event(&event);
                }
            });
            *self.event_task.lock() = Some(handle);
        }

        self.consensus.initialize()?;
        self.consensus
            .start()
            .await
            .context("Failed to start consensus role")?;
        Ok(())
    }

    /// Shutdown the node gracefully.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.consensus.close() {
            error!("Failed to close consensus: {}", e);
        }
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.consensus.join_roles())
            .await
            .is_err()
        {
            warn!("Role task did not stop within {:?}", SHUTDOWN_TIMEOUT);
        }
        if let Some(handle) = self.event_task.lock().take() {
            handle.abort();
        }

        info!("Shutdown complete. Chain height: {}", self.chain.height());
    }

    pub fn consensus(&self) -> Arc<DaConsensus> {
        Arc::clone(&self.consensus)
    }

    pub fn chain(&self) -> Arc<InMemoryChain> {
        Arc::clone(&self.chain)
    }

    /// Pool the sequencer drains each interval.
    pub fn txpool(&self) -> Arc<InMemoryTxPool> {
        Arc::clone(&self.txpool)
    }

    pub fn da(&self) -> &InMemoryDaLayer {
        &self.da
    }
}

fn log_event(event: &RoleEvent) {
    match event {
        RoleEvent::BlockProduced {
            number,
            hash,
            transactions,
        } => info!(
            "Block #{} produced with {} txs: {}",
            number,
            transactions,
            hash_to_hex(hash)
        ),
        RoleEvent::BlockAccepted { number, hash } => {
            info!("Block #{} accepted: {}", number, hash_to_hex(hash))
        }
        RoleEvent::BlockRejected {
            number,
            hash,
            reason,
        } => warn!(
            "Block #{} rejected ({}): {}",
            number,
            reason,
            hash_to_hex(hash)
        ),
        RoleEvent::FraudSuspected {
            producer,
            number,
            hash,
        } => error!(
            "Fraud suspected: block #{} {} from {}",
            number,
            hash_to_hex(hash),
            address_to_hex(producer)
        ),
    }
}
