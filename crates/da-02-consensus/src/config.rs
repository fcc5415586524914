//! Configuration types for DA consensus

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_types::{parse_address, Address, ETH, U256};
use std::time::Duration;

use crate::domain::{ConsensusError, ConsensusResult, Role};

/// Default WatchTower account, used when none is configured.
pub const DEFAULT_WATCHTOWER_ADDRESS: &str = "0xF817d12e6933BbA48C14D4c992719B46aD9f5f61";

/// Default DA node address.
pub const DEFAULT_DA_ADDR: &str = "127.0.0.1:9944";

/// Maximum extra data carried by a header, in bytes.
pub const MAX_EXTRA_DATA_SIZE: usize = 32;

/// Option key of the production interval, in seconds.
pub const INTERVAL_OPTION: &str = "interval";

/// Option key listing the roles this node may be configured for.
pub const MECHANISMS_OPTION: &str = "mechanisms";

/// Runtime configuration for DA consensus
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Role selector: "sequencer", "validator" or "watchtower"
    pub node_type: String,

    /// Block time in seconds. Production cadence fallback and sync timeout base.
    pub block_time_secs: u64,

    /// DA node address (`host:port`)
    pub da_addr: String,

    /// Free-form consensus options (`interval`, `mechanisms`)
    pub options: Map<String, Value>,

    /// Identity settings
    pub identity: IdentityConfig,

    /// Sequencer bootstrap settings
    pub bootstrap: BootstrapConfig,

    /// Maximum transactions drained per block
    pub max_block_transactions: usize,

    /// How far a header timestamp may run ahead of local time
    pub max_timestamp_drift_secs: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            node_type: Role::Sequencer.as_str().to_string(),
            block_time_secs: 2,
            da_addr: DEFAULT_DA_ADDR.to_string(),
            options: Map::new(),
            identity: IdentityConfig::default(),
            bootstrap: BootstrapConfig::default(),
            max_block_transactions: 1_000,
            max_timestamp_drift_secs: 15,
        }
    }
}

/// Identity settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// If set, the validator key must derive to this address
    pub expected_sequencer_address: Option<String>,

    /// Account the WatchTower loads from the keystore
    pub watchtower_address: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            expected_sequencer_address: None,
            watchtower_address: DEFAULT_WATCHTOWER_ADDRESS.to_string(),
        }
    }
}

/// Sequencer bootstrap settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Allow the one-time direct balance grant. Development only.
    pub enable_funding: bool,

    /// Balance granted by the funding block, in wei
    pub funding_amount: U256,

    /// Amount staked by the sequencer, in wei
    pub stake_amount: U256,

    /// Gas limit of the staking transaction
    pub stake_gas_limit: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enable_funding: false,
            funding_amount: U256::from(100 * ETH),
            stake_amount: U256::from(10 * ETH),
            stake_gas_limit: 1_000_000,
        }
    }
}

impl ConsensusConfig {
    /// Parsed role.
    pub fn role(&self) -> ConsensusResult<Role> {
        self.node_type.parse()
    }

    /// `interval` option, if present.
    pub fn interval(&self) -> ConsensusResult<Option<u64>> {
        match self.options.get(INTERVAL_OPTION) {
            None => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                ConsensusError::Configuration(format!(
                    "interval expected non-negative integer, got {}",
                    value
                ))
            }),
        }
    }

    /// Block time. Must be non-zero.
    pub fn block_time(&self) -> ConsensusResult<Duration> {
        if self.block_time_secs == 0 {
            return Err(ConsensusError::Configuration(
                "block time must be non-zero".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.block_time_secs))
    }

    /// Production cadence: the `interval` option, or block time when unset or zero.
    pub fn production_interval(&self) -> ConsensusResult<Duration> {
        match self.interval()? {
            Some(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => self.block_time(),
        }
    }

    /// `mechanisms` option: one role name or a list of them. Empty when unset.
    pub fn mechanisms(&self) -> ConsensusResult<Vec<Role>> {
        let invalid = |value: &Value| {
            ConsensusError::Configuration(format!("invalid mechanism types: {}", value))
        };
        match self.options.get(MECHANISMS_OPTION) {
            None => Ok(Vec::new()),
            Some(Value::String(name)) => Ok(vec![name.parse::<Role>()?]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().ok_or_else(|| invalid(item))?.parse::<Role>())
                .collect(),
            Some(other) => Err(invalid(other)),
        }
    }

    /// Timeout handed to the syncer: three block times.
    pub fn sync_timeout(&self) -> ConsensusResult<Duration> {
        self.block_time()?.checked_mul(3).ok_or_else(|| {
            ConsensusError::Configuration(format!(
                "block time of {}s is too large",
                self.block_time_secs
            ))
        })
    }

    /// DA JSON-RPC endpoint.
    pub fn da_endpoint(&self) -> ConsensusResult<String> {
        let addr = self.da_addr.trim();
        if addr.is_empty() {
            return Err(ConsensusError::Configuration(
                "DA address must be set".to_string(),
            ));
        }
        Ok(format!("ws://{}/v1/json-rpc", addr))
    }

    /// WatchTower account address.
    pub fn watchtower_address(&self) -> ConsensusResult<Address> {
        parse_address(&self.identity.watchtower_address).map_err(|e| {
            ConsensusError::Configuration(format!("invalid watchtower address: {}", e))
        })
    }

    /// Expected sequencer address, if configured.
    pub fn expected_sequencer_address(&self) -> ConsensusResult<Option<Address>> {
        self.identity
            .expected_sequencer_address
            .as_deref()
            .map(|raw| {
                parse_address(raw).map_err(|e| {
                    ConsensusError::Configuration(format!(
                        "invalid expected sequencer address: {}",
                        e
                    ))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = ConsensusConfig::default();
        assert_eq!(config.role().unwrap(), Role::Sequencer);
        assert_eq!(config.bootstrap.funding_amount, U256::from(100 * ETH));
        assert_eq!(config.bootstrap.stake_amount, U256::from(10 * ETH));
        assert_eq!(config.bootstrap.stake_gas_limit, 1_000_000);
        assert!(!config.bootstrap.enable_funding);
    }

    #[test]
    fn test_interval_must_be_integer() {
        let mut config = ConsensusConfig::default();
        config.options.insert(INTERVAL_OPTION.to_string(), json!("five"));
        assert!(matches!(
            config.interval(),
            Err(ConsensusError::Configuration(_))
        ));

        config.options.insert(INTERVAL_OPTION.to_string(), json!(-1));
        assert!(config.interval().is_err());

        config.options.insert(INTERVAL_OPTION.to_string(), json!(5));
        assert_eq!(config.interval().unwrap(), Some(5));
        assert_eq!(config.production_interval().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_interval_falls_back_to_block_time() {
        let mut config = ConsensusConfig::default();
        config.block_time_secs = 3;
        config.options.insert(INTERVAL_OPTION.to_string(), json!(0));
        assert_eq!(config.production_interval().unwrap(), Duration::from_secs(3));
        assert_eq!(config.sync_timeout().unwrap(), Duration::from_secs(9));
    }

    #[test]
    fn test_zero_block_time_rejected() {
        let config = ConsensusConfig {
            block_time_secs: 0,
            ..Default::default()
        };
        assert!(config.block_time().is_err());
        assert!(config.production_interval().is_err());
    }

    #[test]
    fn test_huge_block_time_is_configuration_error() {
        let config = ConsensusConfig {
            block_time_secs: u64::MAX,
            ..Default::default()
        };
        assert!(config.block_time().is_ok());
        assert!(matches!(
            config.sync_timeout(),
            Err(ConsensusError::Configuration(_))
        ));

        let config = ConsensusConfig {
            block_time_secs: u64::MAX / 3,
            ..Default::default()
        };
        assert_eq!(
            config.sync_timeout().unwrap(),
            Duration::from_secs(u64::MAX / 3 * 3)
        );
    }

    #[test]
    fn test_mechanisms_option() {
        let mut config = ConsensusConfig::default();
        assert!(config.mechanisms().unwrap().is_empty());

        config
            .options
            .insert(MECHANISMS_OPTION.to_string(), json!("watchtower"));
        assert_eq!(config.mechanisms().unwrap(), vec![Role::WatchTower]);

        config.options.insert(
            MECHANISMS_OPTION.to_string(),
            json!(["sequencer", "Validator"]),
        );
        assert_eq!(
            config.mechanisms().unwrap(),
            vec![Role::Sequencer, Role::Validator]
        );

        for bad in [json!(["sequencer", "miner"]), json!([1]), json!(true)] {
            config.options.insert(MECHANISMS_OPTION.to_string(), bad);
            assert!(matches!(
                config.mechanisms(),
                Err(ConsensusError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_da_endpoint() {
        let config = ConsensusConfig {
            da_addr: "10.0.0.1:9944".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.da_endpoint().unwrap(),
            "ws://10.0.0.1:9944/v1/json-rpc"
        );
    }

    #[test]
    fn test_addresses() {
        let mut config = ConsensusConfig::default();
        let watchtower = config.watchtower_address().unwrap();
        assert_eq!(watchtower[0], 0xf8);
        assert_eq!(config.expected_sequencer_address().unwrap(), None);

        config.identity.expected_sequencer_address = Some("0x1234".to_string());
        assert!(config.expected_sequencer_address().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ConsensusConfig = serde_json::from_value(json!({
            "node_type": "validator",
            "options": { "interval": 4 },
        }))
        .unwrap();
        assert_eq!(config.role().unwrap(), Role::Validator);
        assert_eq!(config.interval().unwrap(), Some(4));
        assert_eq!(config.block_time_secs, 2);
    }
}
