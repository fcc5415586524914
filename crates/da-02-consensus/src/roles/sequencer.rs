//! Sequencer production loop

use shared_crypto::Secp256k1KeyPair;
use da_01_staking::StateTransition;
use shared_types::{
    address_to_hex, hash_to_hex, Address, BlockHeader, Hash, PendingBlock, SealedBlock,
};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::RoleContext;
use crate::domain::{ConsensusError, ConsensusResult, RoleEvent, RolePhase};
use crate::metrics;

/// Produces one block per interval on top of the local head.
pub struct SequencerRunner {
    ctx: Arc<RoleContext>,
    identity: Arc<Secp256k1KeyPair>,
}

impl SequencerRunner {
    pub fn new(ctx: Arc<RoleContext>, identity: Arc<Secp256k1KeyPair>) -> Self {
        Self { ctx, identity }
    }

    /// Run until cancelled. A failed interval is logged and retried on the
    /// next tick with a fresh transaction set.
    pub async fn run(self) {
        let address = self.identity.address();
        info!(
            "[da-02] Sequencer {} producing every {:?}",
            address_to_hex(&address),
            self.ctx.interval
        );

        let mut ticker = tokio::time::interval(self.ctx.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut produced: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => {
                    info!("[da-02] Received shutdown signal. Exiting sequencer task.");
                    break;
                }
                _ = ticker.tick() => {
                    match self.produce_block().await {
                        Ok(sealed) => {
                            produced += 1;
                            metrics::record_block_produced();
                            self.ctx.emit(RoleEvent::BlockProduced {
                                number: sealed.number(),
                                hash: sealed.hash(),
                                transactions: sealed.block().transactions.len(),
                            });
                        }
                        Err(e) => {
                            warn!("[da-02] Block production failed: {}", e);
                            metrics::record_production_failure();
                        }
                    }
                }
            }
        }

        info!(
            "[da-02] Sequencer stopped. Total blocks produced: {}",
            produced
        );
        self.ctx.advance(RolePhase::Stopped);
    }

    /// Build, execute, verify, publish and append one block.
    ///
    /// Nothing is appended unless every step succeeds.
    pub async fn produce_block(&self) -> ConsensusResult<SealedBlock> {
        let ctx = &self.ctx;
        let address = self.identity.address();

        let head = ctx
            .chain
            .head()
            .ok_or_else(|| ConsensusError::StateRead("chain has no head".to_string()))?;
        let timestamp = ctx.time_source.now().max(head.timestamp);
        let header = BlockHeader::child_of(&head, address, timestamp);

        let candidates = ctx
            .txpool
            .get_transactions_for_block(ctx.max_block_transactions, header.gas_limit)
            .await
            .map_err(ConsensusError::TxPool)?;

        let mut transition = ctx.executor.begin_transition(head.state_root, &header)?;
        let mut pending = PendingBlock::new(header);
        let mut dropped = Vec::new();
        for tx in candidates {
            match transition.apply(&tx) {
                Ok(receipt) if producer_active(transition.as_ref(), &address) => {
                    pending.push(tx, receipt)
                }
                Ok(_) => {
                    debug!(
                        "[da-02] Dropping tx {}: deactivates the producer",
                        hash_to_hex(&tx.hash())
                    );
                    dropped.push(tx.hash());
                    // A transition cannot undo one transaction. Replay the kept ones.
                    transition = ctx
                        .executor
                        .begin_transition(head.state_root, &pending.header)?;
                    for kept in &pending.transactions {
                        transition.apply(kept)?;
                    }
                }
                Err(e) => {
                    debug!(
                        "[da-02] Dropping tx {}: {}",
                        hash_to_hex(&tx.hash()),
                        e
                    );
                    dropped.push(tx.hash());
                }
            }
        }

        if let Err(e) = ctx.verifier.pre_commit_state(&pending.header, transition.as_ref()) {
            // Every candidate leaves the pool so the next tick starts from a fresh set.
            dropped.extend(pending.transactions.iter().map(|tx| tx.hash()));
            self.drop_from_pool(&dropped).await;
            return Err(e);
        }
        pending.header.gas_used = transition.total_gas();
        pending.header.state_root = transition.commit()?;
        self.drop_from_pool(&dropped).await;

        let sealed = pending.seal();
        ctx.verifier.verify_header(sealed.header())?;

        ctx.da.submit_block(&sealed).await?;
        ctx.chain.write_block(sealed.clone())?;

        let included: Vec<_> = sealed.block().transactions.iter().map(|tx| tx.hash()).collect();
        if !included.is_empty() {
            if let Err(e) = ctx.txpool.remove_included(&included).await {
                warn!("[da-02] Failed to remove included transactions: {}", e);
            }
        }

        info!(
            "[da-02] Produced block #{} ({} txs) {}",
            sealed.number(),
            included.len(),
            hash_to_hex(&sealed.hash())
        );
        Ok(sealed)
    }

    async fn drop_from_pool(&self, hashes: &[Hash]) {
        if hashes.is_empty() {
            return;
        }
        if let Err(e) = self.ctx.txpool.drop_transactions(hashes).await {
            warn!("[da-02] Failed to drop {} transactions: {}", hashes.len(), e);
        }
    }
}

fn producer_active(transition: &dyn StateTransition, producer: &Address) -> bool {
    transition
        .stake_entry(producer)
        .is_some_and(|entry| entry.active)
}
