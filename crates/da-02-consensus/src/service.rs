//! DA consensus façade
//!
//! Built once from configuration. Construction validates the configuration,
//! loads the validator key and connects the DA client; `start` runs exactly
//! one role.

use async_trait::async_trait;
use da_01_staking::{
    ActiveSequencersQuerier, Blockchain, DirectStateWriter, StakeLedger, StateExecutor,
    StateTransition,
};
use parking_lot::Mutex;
use shared_crypto::Secp256k1KeyPair;
use shared_types::{address_to_hex, Address, Block, BlockHeader, SealedBlock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::bootstrap::{Bootstrap, BootstrapFunder};
use crate::config::{BootstrapConfig, ConsensusConfig};
use crate::domain::{
    ConsensusError, ConsensusResult, Role, RoleEvent, RolePhase, SyncProgression,
};
use crate::importer::BlockImporter;
use crate::ports::{
    ConsensusEngine, DaConnector, KeyStore, SecretsManager, Syncer, TimeSource, TxPool,
    VALIDATOR_KEY_SECRET,
};
use crate::roles::{BlockWatcher, RoleContext, SequencerRunner, WatchMode};
use crate::verifier::HeaderVerifier;

/// Collaborators owned by the host node.
pub struct ConsensusDependencies {
    pub chain: Arc<dyn Blockchain>,
    pub executor: Arc<dyn StateExecutor>,
    pub ledger: Arc<dyn StakeLedger>,
    /// Needed only when bootstrap funding is enabled.
    pub state_writer: Option<Arc<dyn DirectStateWriter>>,
    pub da_connector: Arc<dyn DaConnector>,
    pub txpool: Arc<dyn TxPool>,
    pub secrets: Arc<dyn SecretsManager>,
    pub keystore: Arc<dyn KeyStore>,
    pub syncer: Arc<dyn Syncer>,
    pub time_source: Arc<dyn TimeSource>,
}

/// The configured role together with the state only that role uses.
enum RoleState {
    Sequencer {
        /// Taken by the first bootstrap; present only when funding is enabled.
        funder: Mutex<Option<BootstrapFunder>>,
        bootstrap: BootstrapConfig,
        syncer: Arc<dyn Syncer>,
        sync_timeout: Duration,
    },
    Validator,
    WatchTower {
        address: Address,
        keystore: Arc<dyn KeyStore>,
    },
}

impl RoleState {
    fn role(&self) -> Role {
        match self {
            RoleState::Sequencer { .. } => Role::Sequencer,
            RoleState::Validator => Role::Validator,
            RoleState::WatchTower { .. } => Role::WatchTower,
        }
    }
}

/// DA-backed consensus engine
pub struct DaConsensus {
    state: RoleState,
    identity: Arc<Secp256k1KeyPair>,
    ctx: RoleContext,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DaConsensus {
    /// Validate `config`, load the validator key and connect the DA client.
    pub fn new(deps: ConsensusDependencies, config: ConsensusConfig) -> ConsensusResult<Self> {
        let role = config.role()?;
        let mechanisms = config.mechanisms()?;
        if !mechanisms.is_empty() && !mechanisms.contains(&role) {
            return Err(ConsensusError::Configuration(format!(
                "role {} is not among the configured mechanisms",
                role
            )));
        }
        let interval = config.production_interval()?;
        let block_time = config.block_time()?;
        let sync_timeout = config.sync_timeout()?;
        let watchtower_address = config.watchtower_address()?;
        let expected_sequencer = config.expected_sequencer_address()?;
        let endpoint = config.da_endpoint()?;

        let identity = load_validator_key(deps.secrets.as_ref())?;
        let address = identity.address();

        let state = match role {
            Role::Sequencer => {
                if let Some(expected) = expected_sequencer {
                    if expected != address {
                        return Err(ConsensusError::Configuration(format!(
                            "validator key derives to {}, expected sequencer {}",
                            address_to_hex(&address),
                            address_to_hex(&expected)
                        )));
                    }
                }
                let funder = match (&deps.state_writer, config.bootstrap.enable_funding) {
                    (Some(writer), true) => Some(BootstrapFunder::new(Arc::clone(writer))),
                    (None, true) => {
                        return Err(ConsensusError::Configuration(
                            "bootstrap funding enabled without a state writer".to_string(),
                        ))
                    }
                    (_, false) => None,
                };
                RoleState::Sequencer {
                    funder: Mutex::new(funder),
                    bootstrap: config.bootstrap,
                    syncer: deps.syncer,
                    sync_timeout,
                }
            }
            Role::Validator => RoleState::Validator,
            Role::WatchTower => RoleState::WatchTower {
                address: watchtower_address,
                keystore: deps.keystore,
            },
        };

        let da = deps.da_connector.connect(&endpoint)?;

        let querier = ActiveSequencersQuerier::new(deps.chain.clone(), deps.ledger.clone());
        let verifier = Arc::new(HeaderVerifier::new(
            deps.chain.clone(),
            querier.clone(),
            deps.time_source.clone(),
            config.max_timestamp_drift_secs,
        ));
        let importer = Arc::new(BlockImporter::new(
            deps.chain.clone(),
            deps.executor.clone(),
            verifier.clone(),
        ));

        let (phase, _) = watch::channel(RolePhase::Idle);
        let ctx = RoleContext {
            chain: deps.chain,
            executor: deps.executor,
            querier,
            verifier,
            importer,
            da,
            txpool: deps.txpool,
            time_source: deps.time_source,
            block_time,
            interval,
            max_block_transactions: config.max_block_transactions,
            cancel: CancellationToken::new(),
            phase: Arc::new(phase),
            events: None,
        };

        info!("[da-02] Initializing DA consensus");
        info!("  Role: {}", role);
        info!("  Node address: {}", address_to_hex(&address));
        info!("  DA endpoint: {}", endpoint);
        info!("  Production interval: {:?}", interval);

        Ok(Self {
            state,
            identity: Arc::new(identity),
            ctx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Sets the event sender for observer notifications.
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<RoleEvent>) -> Self {
        self.ctx.events = Some(tx);
        self
    }

    pub fn role(&self) -> Role {
        self.state.role()
    }

    /// Address of the loaded validator key
    pub fn address(&self) -> Address {
        self.identity.address()
    }

    /// Observe the role's lifecycle phase
    pub fn phase(&self) -> watch::Receiver<RolePhase> {
        self.ctx.phase.subscribe()
    }

    /// Header verifier used by every role
    pub fn verifier(&self) -> Arc<HeaderVerifier> {
        self.ctx.verifier.clone()
    }

    /// Block importer used by watching roles
    pub fn importer(&self) -> Arc<BlockImporter> {
        self.ctx.importer.clone()
    }

    /// Wait for every spawned role task to finish
    pub async fn join_roles(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.tasks.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                error!("[da-02] Role task failed: {}", e);
            }
        }
    }

    fn spawn(&self, task: impl std::future::Future<Output = ()> + Send + 'static) {
        self.tasks.lock().push(tokio::spawn(task));
    }

    async fn start_sequencer(
        &self,
        ctx: Arc<RoleContext>,
        funder: Option<BootstrapFunder>,
        bootstrap: &BootstrapConfig,
        syncer: &dyn Syncer,
        sync_timeout: Duration,
    ) -> ConsensusResult<()> {
        ctx.advance(RolePhase::Bootstrapping);

        syncer
            .start(sync_timeout)
            .await
            .map_err(ConsensusError::Sync)?;

        let report = Bootstrap {
            chain: ctx.chain.as_ref(),
            executor: ctx.executor.as_ref(),
            querier: &ctx.querier,
            identity: &*self.identity,
            config: bootstrap,
            now: ctx.time_source.now(),
        }
        .run(funder)?;
        info!(
            "[da-02] Bootstrap complete (funded: {}, staked: {})",
            report.funded, report.staked
        );

        ctx.advance(RolePhase::Producing);
        let runner = SequencerRunner::new(ctx, self.identity.clone());
        self.spawn(runner.run());
        Ok(())
    }

    fn start_watchtower(
        &self,
        ctx: Arc<RoleContext>,
        address: &Address,
        keystore: &dyn KeyStore,
    ) -> ConsensusResult<()> {
        ctx.advance(RolePhase::LoadingIdentity);
        let key = keystore.load_key(address).map_err(ConsensusError::KeyLoad)?;
        info!(
            "[da-02] WatchTower account {} loaded",
            address_to_hex(&key.address())
        );

        ctx.advance(RolePhase::Watching);
        let watcher = BlockWatcher::new(
            ctx,
            WatchMode::WatchTower {
                reporter: key.address(),
            },
        );
        self.spawn(watcher.run());
        Ok(())
    }
}

/// Decode a validator key stored either as 32 raw bytes or as hex text.
fn load_validator_key(secrets: &dyn SecretsManager) -> ConsensusResult<Secp256k1KeyPair> {
    let raw = secrets
        .get_secret(VALIDATOR_KEY_SECRET)
        .map_err(ConsensusError::KeyLoad)?;
    if raw.len() == 32 {
        return Secp256k1KeyPair::from_slice(&raw).map_err(|e| ConsensusError::KeyLoad(e.to_string()));
    }

    let text = std::str::from_utf8(&raw)
        .map_err(|_| ConsensusError::KeyLoad("validator key is neither raw nor hex".to_string()))?
        .trim();
    let digits = text.strip_prefix("0x").unwrap_or(text);
    let bytes = hex::decode(digits).map_err(|e| ConsensusError::KeyLoad(e.to_string()))?;
    Secp256k1KeyPair::from_slice(&bytes).map_err(|e| ConsensusError::KeyLoad(e.to_string()))
}

#[async_trait]
impl ConsensusEngine for DaConsensus {
    fn verify_header(&self, header: &BlockHeader) -> ConsensusResult<()> {
        self.ctx.verifier.verify_header(header)
    }

    fn process_headers(&self, headers: &[BlockHeader]) -> ConsensusResult<()> {
        self.ctx.verifier.process_headers(headers)
    }

    fn get_block_creator(&self, header: &BlockHeader) -> ConsensusResult<Address> {
        self.ctx.verifier.get_block_creator(header)
    }

    fn pre_commit_state(
        &self,
        header: &BlockHeader,
        transition: &dyn StateTransition,
    ) -> ConsensusResult<()> {
        self.ctx.verifier.pre_commit_state(header, transition)
    }

    fn prepare(&self, _header: &mut BlockHeader) -> ConsensusResult<()> {
        Err(ConsensusError::NotApplicable("prepare"))
    }

    fn seal(&self, _block: Block, _cancel: CancellationToken) -> ConsensusResult<SealedBlock> {
        Err(ConsensusError::NotApplicable("seal"))
    }

    fn get_sync_progression(&self) -> Option<SyncProgression> {
        None
    }

    fn initialize(&self) -> ConsensusResult<()> {
        Ok(())
    }

    async fn start(&self) -> ConsensusResult<()> {
        info!("[da-02] Starting {} role", self.role());
        let ctx = Arc::new(self.ctx.clone());

        match &self.state {
            RoleState::Sequencer {
                funder,
                bootstrap,
                syncer,
                sync_timeout,
            } => {
                let funder = funder.lock().take();
                self.start_sequencer(ctx, funder, bootstrap, syncer.as_ref(), *sync_timeout)
                    .await
            }
            RoleState::Validator => {
                ctx.advance(RolePhase::Watching);
                self.spawn(BlockWatcher::new(ctx, WatchMode::Validator).run());
                Ok(())
            }
            RoleState::WatchTower { address, keystore } => {
                self.start_watchtower(ctx, address, keystore.as_ref())
            }
        }
    }

    fn close(&self) -> ConsensusResult<()> {
        if !self.ctx.cancel.is_cancelled() {
            info!("[da-02] Closing {} role", self.role());
            self.ctx.cancel.cancel();
        }
        if self.tasks.lock().is_empty() {
            self.ctx.advance(RolePhase::Stopped);
        }
        Ok(())
    }
}
