//! # da-02-consensus
//!
//! Consensus engine for a rollup whose blocks are ordered by a
//! data-availability (DA) network.
//!
//! ## Architecture
//!
//! A node runs exactly one role, chosen from configuration:
//!
//! ```text
//!                     ┌──────────────┐
//!  Sequencer ──submit─→│   DA layer   │──next_block──→ Validator
//!      │              └──────────────┘        └─────→ WatchTower
//!      └─ bootstrap (fund, stake) before producing
//! ```
//!
//! Every role verifies headers the same way: the producer recorded in the
//! header must be an active sequencer in the state of the parent block.
//!
//! ### Roles
//!
//! - **Sequencer**: syncs, bootstraps its stake, then produces a block every
//!   interval, publishes it to DA and appends it locally.
//! - **Validator**: follows DA, verifies and imports each block.
//! - **WatchTower**: follows DA like a validator and reports blocks from
//!   producers that are not staked.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use da_02_consensus::{ConsensusConfig, ConsensusEngine, DaConsensus};
//!
//! let consensus = DaConsensus::new(dependencies, ConsensusConfig::default())?
//!     .with_event_sender(events_tx);
//!
//! consensus.start().await?;
//! // ...
//! consensus.close()?;
//! consensus.join_roles().await;
//! ```

pub mod adapters;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod importer;
pub mod metrics;
pub mod ports;
pub mod roles;
pub mod service;
pub mod validation;
pub mod verifier;

// Re-export main types
pub use adapters::{
    InMemoryDaLayer, InMemoryKeyStore, InMemoryTxPool, StandaloneSyncer, StaticSecretsManager,
};
pub use bootstrap::{Bootstrap, BootstrapFunder, BootstrapReport};
pub use config::{BootstrapConfig, ConsensusConfig, IdentityConfig};
pub use domain::{
    ConsensusError, ConsensusResult, DaError, HeaderError, Role, RoleEvent, RolePhase,
    SyncProgression,
};
pub use importer::{BlockImporter, ImportOutcome};
pub use ports::{
    ConsensusEngine, DaClient, DaConnector, KeyStore, SecretsManager, Syncer, SystemTimeSource,
    TimeSource, TxPool, VALIDATOR_KEY_SECRET,
};
pub use service::{ConsensusDependencies, DaConsensus};
pub use verifier::HeaderVerifier;
