//! # Genesis Builder
//!
//! Creates the genesis header and its world state.

use std::time::{SystemTime, UNIX_EPOCH};

use da_01_staking::adapters::{InMemoryState, WorldState};
use da_01_staking::StakeEntry;
use shared_types::{AccountState, Address, BlockHeader, U256};
use thiserror::Error;

/// Genesis creation errors.
#[derive(Debug, Error)]
pub enum GenesisError {
    /// Invalid genesis configuration.
    #[error("Invalid genesis configuration: {0}")]
    InvalidConfig(String),
}

/// Genesis configuration.
#[derive(Debug, Clone)]
pub struct GenesisConfig {
    /// Genesis timestamp (Unix seconds). If None, uses current time.
    pub timestamp: Option<u64>,

    /// Gas limit inherited by every block.
    pub gas_limit: u64,

    /// Initial balances.
    pub alloc: Vec<(Address, U256)>,

    /// Sequencers active from genesis, with their stake.
    pub sequencers: Vec<(Address, U256)>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            timestamp: None,
            gas_limit: 30_000_000,
            alloc: Vec::new(),
            sequencers: Vec::new(),
        }
    }
}

impl GenesisConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), GenesisError> {
        if self.gas_limit == 0 {
            return Err(GenesisError::InvalidConfig(
                "Gas limit must be non-zero".to_string(),
            ));
        }
        if let Some((address, _)) = self.sequencers.iter().find(|(_, stake)| stake.is_zero()) {
            return Err(GenesisError::InvalidConfig(format!(
                "Sequencer {} has zero stake",
                shared_types::address_to_hex(address)
            )));
        }
        Ok(())
    }
}

/// Builder for the genesis block.
pub struct GenesisBuilder {
    config: GenesisConfig,
}

impl GenesisBuilder {
    pub fn new(config: GenesisConfig) -> Self {
        Self { config }
    }

    /// Genesis world state.
    pub fn state(&self) -> WorldState {
        WorldState::from_alloc(
            self.config
                .alloc
                .iter()
                .map(|(address, balance)| (*address, AccountState::with_balance(*balance))),
            self.config
                .sequencers
                .iter()
                .map(|(address, stake)| (*address, StakeEntry::active(*stake))),
        )
    }

    /// Store the genesis state in `state` and return the genesis header.
    pub fn build(&self, state: &InMemoryState) -> Result<BlockHeader, GenesisError> {
        self.config.validate()?;

        let timestamp = self.config.timestamp.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });
        let root = state.insert_genesis(self.state());
        Ok(BlockHeader::genesis(root, self.config.gas_limit, timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use da_01_staking::StakeLedger;
    use shared_types::ETH;

    #[test]
    fn test_empty_genesis() {
        let state = InMemoryState::new();
        let header = GenesisBuilder::new(GenesisConfig {
            timestamp: Some(1_700_000_000),
            ..Default::default()
        })
        .build(&state)
        .unwrap();

        assert!(header.is_genesis());
        assert_eq!(header.timestamp, 1_700_000_000);
        assert_eq!(header.state_root, WorldState::default().root());
    }

    #[test]
    fn test_genesis_sequencers_are_active() {
        let sequencer = [7u8; 20];
        let state = InMemoryState::new();
        let header = GenesisBuilder::new(GenesisConfig {
            sequencers: vec![(sequencer, U256::from(10 * ETH))],
            ..Default::default()
        })
        .build(&state)
        .unwrap();

        let active = state.active_sequencers(&header.state_root).unwrap();
        assert_eq!(active, vec![sequencer]);
    }

    #[test]
    fn test_zero_stake_rejected() {
        let config = GenesisConfig {
            sequencers: vec![([7u8; 20], U256::zero())],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
