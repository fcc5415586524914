//! Role runners
//!
//! Each role runs as one background task spawned by `start`. All runners share
//! a [`RoleContext`] and stop at their next safe point once its cancellation
//! token fires.

mod sequencer;
mod watcher;

pub use sequencer::SequencerRunner;
pub use watcher::{BlockWatcher, WatchMode};

use da_01_staking::{ActiveSequencersQuerier, Blockchain, StateExecutor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::domain::{RoleEvent, RolePhase};
use crate::importer::BlockImporter;
use crate::ports::{DaClient, TimeSource, TxPool};
use crate::verifier::HeaderVerifier;

/// Everything a running role needs.
#[derive(Clone)]
pub struct RoleContext {
    pub chain: Arc<dyn Blockchain>,
    pub executor: Arc<dyn StateExecutor>,
    pub querier: ActiveSequencersQuerier,
    pub verifier: Arc<HeaderVerifier>,
    pub importer: Arc<BlockImporter>,
    pub da: Arc<dyn DaClient>,
    pub txpool: Arc<dyn TxPool>,
    pub time_source: Arc<dyn TimeSource>,
    /// Back-off after a DA read error
    pub block_time: Duration,
    /// Sequencer production cadence
    pub interval: Duration,
    pub max_block_transactions: usize,
    pub cancel: CancellationToken,
    pub phase: Arc<watch::Sender<RolePhase>>,
    pub events: Option<mpsc::UnboundedSender<RoleEvent>>,
}

impl RoleContext {
    /// Emits an event to observers if an event sender is configured.
    pub fn emit(&self, event: RoleEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Move to `phase` unless the role is already past it.
    pub fn advance(&self, phase: RolePhase) {
        self.phase.send_if_modified(|current| {
            if phase > *current {
                *current = phase;
                true
            } else {
                false
            }
        });
    }

    /// Current phase.
    pub fn current_phase(&self) -> RolePhase {
        *self.phase.borrow()
    }
}
