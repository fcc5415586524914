//! DA block consumer shared by Validator and WatchTower

use shared_types::{address_to_hex, hash_to_hex, Address, Block, Hash};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::RoleContext;
use crate::domain::{ConsensusError, ConsensusResult, RoleEvent, RolePhase};
use crate::importer::ImportOutcome;
use crate::metrics;

/// Which role is watching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchMode {
    Validator,
    /// Reports blocks from unstaked producers, identified by its own account.
    WatchTower { reporter: Address },
}

impl WatchMode {
    pub fn name(&self) -> &'static str {
        match self {
            WatchMode::Validator => "validator",
            WatchMode::WatchTower { .. } => "watchtower",
        }
    }
}

/// Reads blocks from the DA layer, verifies and imports them.
pub struct BlockWatcher {
    ctx: Arc<RoleContext>,
    mode: WatchMode,
}

impl BlockWatcher {
    pub fn new(ctx: Arc<RoleContext>, mode: WatchMode) -> Self {
        Self { ctx, mode }
    }

    /// Run until cancelled or the DA stream ends.
    pub async fn run(self) {
        info!("[da-02] Watching DA blocks as {}", self.mode.name());
        let mut imported: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => {
                    info!("[da-02] Received shutdown signal. Exiting watcher task.");
                    break;
                }
                next = self.ctx.da.next_block() => next,
            };

            match next {
                Ok(Some(block)) => {
                    if let Ok(ImportOutcome::Imported(_)) = self.handle_block(block) {
                        imported += 1;
                    }
                }
                Ok(None) => {
                    info!("[da-02] DA block stream ended");
                    break;
                }
                Err(e) => {
                    warn!("[da-02] Failed to read from DA layer: {}", e);
                    tokio::select! {
                        biased;
                        _ = self.ctx.cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.ctx.block_time) => {}
                    }
                }
            }
        }

        info!("[da-02] Watcher stopped. Total blocks imported: {}", imported);
        self.ctx.advance(RolePhase::Stopped);
    }

    /// Verify and import one DA block. Rejections are reported, never fatal.
    pub fn handle_block(&self, block: Block) -> ConsensusResult<ImportOutcome> {
        let number = block.number();
        let hash = block.hash();
        let producer = block.header.miner;

        if self.ctx.chain.has_block(&hash) {
            debug!("[da-02] Block #{} already known", number);
            return Ok(ImportOutcome::AlreadyKnown(hash));
        }

        let result = self
            .ctx
            .verifier
            .verify_header(&block.header)
            .and_then(|()| self.ctx.importer.import(block));

        match result {
            Ok(outcome) => {
                if let ImportOutcome::Imported(_) = outcome {
                    metrics::record_block_imported();
                    self.ctx.emit(RoleEvent::BlockAccepted { number, hash });
                }
                Ok(outcome)
            }
            Err(err) => {
                self.reject(number, hash, producer, &err);
                Err(err)
            }
        }
    }

    fn reject(&self, number: u64, hash: Hash, producer: Address, err: &ConsensusError) {
        warn!(
            "[da-02] Rejected block #{} {} from {}: {}",
            number,
            hash_to_hex(&hash),
            address_to_hex(&producer),
            err
        );
        metrics::record_block_rejected(err.reason());
        self.ctx.emit(RoleEvent::BlockRejected {
            number,
            hash,
            reason: err.reason(),
        });

        if let WatchMode::WatchTower { reporter } = self.mode {
            if err.is_invalid_producer() {
                error!(
                    "[da-02] Suspected byzantine sequencer {}: block #{} {} (reported by {})",
                    address_to_hex(&producer),
                    number,
                    hash_to_hex(&hash),
                    address_to_hex(&reporter)
                );
                metrics::record_suspected_fraud();
                self.ctx.emit(RoleEvent::FraudSuspected {
                    producer,
                    number,
                    hash,
                });
            }
        }
    }
}
