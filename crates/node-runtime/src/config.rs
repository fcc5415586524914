//! # Node Configuration
//!
//! Read from `DA_*` environment variables on top of the defaults.
//!
//! | Variable                 | Meaning                                    |
//! |--------------------------|--------------------------------------------|
//! | `DA_ROLE`                | `sequencer`, `validator` or `watchtower`   |
//! | `DA_BLOCK_TIME`          | Block time in seconds                      |
//! | `DA_INTERVAL`            | Sequencer production interval in seconds   |
//! | `DA_ADDR`                | DA node `host:port`                        |
//! | `DA_VALIDATOR_KEY`       | Hex-encoded validator key                  |
//! | `DA_WATCHTOWER_ADDRESS`  | WatchTower account address                 |
//! | `DA_WATCHTOWER_KEY`      | Hex-encoded key stored for the WatchTower  |
//! | `DA_BOOTSTRAP_FUNDING`   | `true` to enable the dev balance deposit   |
//! | `DA_GENESIS_SEQUENCERS`  | Comma-separated addresses staked at genesis|

use da_02_consensus::config::INTERVAL_OPTION;
use da_02_consensus::ConsensusConfig;
use shared_types::{parse_address, Address, U256, ETH};
use tracing::{info, warn};

use crate::genesis::GenesisConfig;

/// Stake given to every genesis sequencer.
pub const GENESIS_SEQUENCER_STAKE: u128 = 10 * ETH;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Consensus configuration.
    pub consensus: ConsensusConfig,
    /// Genesis configuration.
    pub genesis: GenesisConfig,
    /// Hex-encoded validator key. A throwaway key is generated when unset.
    pub validator_key: Option<String>,
    /// Hex-encoded key for the WatchTower account.
    pub watchtower_key: Option<String>,
}

/// Load configuration from the environment.
pub fn load_config() -> NodeConfig {
    load_config_from(|name| std::env::var(name).ok())
}

/// Load configuration from an arbitrary variable source.
pub fn load_config_from(var: impl Fn(&str) -> Option<String>) -> NodeConfig {
    let mut config = NodeConfig::default();

    if let Some(role) = var("DA_ROLE") {
        config.consensus.node_type = role;
    }

    if let Some(block_time) = var("DA_BLOCK_TIME") {
        match block_time.trim().parse() {
            Ok(secs) => config.consensus.block_time_secs = secs,
            Err(_) => warn!("DA_BLOCK_TIME must be a number of seconds, using default"),
        }
    }

    // Passed through as-is; consensus rejects values that are not integers.
    if let Some(interval) = var("DA_INTERVAL") {
        let value = match interval.trim().parse::<u64>() {
            Ok(secs) => serde_json::Value::from(secs),
            Err(_) => serde_json::Value::from(interval),
        };
        config
            .consensus
            .options
            .insert(INTERVAL_OPTION.to_string(), value);
    }

    if let Some(addr) = var("DA_ADDR") {
        config.consensus.da_addr = addr;
    }

    if let Some(address) = var("DA_WATCHTOWER_ADDRESS") {
        config.consensus.identity.watchtower_address = address;
    }

    if let Some(flag) = var("DA_BOOTSTRAP_FUNDING") {
        config.consensus.bootstrap.enable_funding =
            matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    }

    if let Some(list) = var("DA_GENESIS_SEQUENCERS") {
        config.genesis.sequencers = parse_sequencers(&list);
        info!(
            "Loaded {} genesis sequencers from environment",
            config.genesis.sequencers.len()
        );
    }

    config.validator_key = var("DA_VALIDATOR_KEY");
    config.watchtower_key = var("DA_WATCHTOWER_KEY");

    config
}

fn parse_sequencers(list: &str) -> Vec<(Address, U256)> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match parse_address(entry) {
            Ok(address) => Some((address, U256::from(GENESIS_SEQUENCER_STAKE))),
            Err(e) => {
                warn!("Ignoring genesis sequencer '{}': {}", entry, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use da_02_consensus::{ConsensusError, Role};
    use std::collections::HashMap;
    use std::time::Duration;

    fn load(vars: &[(&str, &str)]) -> NodeConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_config_from(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]);
        assert_eq!(config.consensus.role().unwrap(), Role::Sequencer);
        assert!(!config.consensus.bootstrap.enable_funding);
        assert!(config.validator_key.is_none());
        assert!(config.genesis.sequencers.is_empty());
    }

    #[test]
    fn test_environment_overrides() {
        let config = load(&[
            ("DA_ROLE", "WatchTower"),
            ("DA_BLOCK_TIME", "5"),
            ("DA_INTERVAL", "7"),
            ("DA_ADDR", "da.example:9944"),
            ("DA_BOOTSTRAP_FUNDING", "true"),
            (
                "DA_GENESIS_SEQUENCERS",
                "0x0101010101010101010101010101010101010101, nonsense",
            ),
        ]);

        assert_eq!(config.consensus.role().unwrap(), Role::WatchTower);
        assert_eq!(config.consensus.block_time().unwrap(), Duration::from_secs(5));
        assert_eq!(
            config.consensus.production_interval().unwrap(),
            Duration::from_secs(7)
        );
        assert_eq!(
            config.consensus.da_endpoint().unwrap(),
            "ws://da.example:9944/v1/json-rpc"
        );
        assert!(config.consensus.bootstrap.enable_funding);
        assert_eq!(config.genesis.sequencers, vec![([1u8; 20], U256::from(10 * ETH))]);
    }

    #[test]
    fn test_non_numeric_interval_surfaces_as_configuration_error() {
        let config = load(&[("DA_INTERVAL", "fast")]);
        assert!(matches!(
            config.consensus.production_interval(),
            Err(ConsensusError::Configuration(_))
        ));
    }
}
