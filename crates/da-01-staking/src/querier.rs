//! Active-sequencer set queries
//!
//! The set lives in chain state and is read through the [`StakeLedger`] port,
//! either at the current head or at an explicit state root.

use shared_types::{address_to_hex, Address, Hash};
use std::sync::Arc;
use tracing::debug;

use crate::domain::{StakeEntry, StakingError, StakingResult};
use crate::ports::{Blockchain, StakeLedger};

/// Answers "is this address an active sequencer?".
#[derive(Clone)]
pub struct ActiveSequencersQuerier {
    chain: Arc<dyn Blockchain>,
    ledger: Arc<dyn StakeLedger>,
}

impl ActiveSequencersQuerier {
    pub fn new(chain: Arc<dyn Blockchain>, ledger: Arc<dyn StakeLedger>) -> Self {
        Self { chain, ledger }
    }

    /// Whether `address` is active at the current head.
    pub fn contains(&self, address: &Address) -> StakingResult<bool> {
        let head = self.chain.head().ok_or(StakingError::NoHead)?;
        self.contains_at(&head.state_root, address)
    }

    /// Whether `address` is active at `state_root`.
    ///
    /// A missing snapshot is an error, never a silent `false`.
    pub fn contains_at(&self, state_root: &Hash, address: &Address) -> StakingResult<bool> {
        let active = self
            .stake_at(state_root, address)?
            .is_some_and(|entry| entry.active);
        debug!(
            "[da-01] {} active at root: {}",
            address_to_hex(address),
            active
        );
        Ok(active)
    }

    /// Stake entry of `address` at `state_root`.
    pub fn stake_at(
        &self,
        state_root: &Hash,
        address: &Address,
    ) -> StakingResult<Option<StakeEntry>> {
        self.ledger
            .stake_entry(state_root, address)
            .map_err(StakingError::from_read)
    }

    /// Every active sequencer at the current head.
    pub fn active_sequencers(&self) -> StakingResult<Vec<Address>> {
        let head = self.chain.head().ok_or(StakingError::NoHead)?;
        self.ledger
            .active_sequencers(&head.state_root)
            .map_err(StakingError::from_read)
    }
}
