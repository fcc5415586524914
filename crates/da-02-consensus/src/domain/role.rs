//! Node roles, lifecycle phases and observer events

use shared_types::{Address, Hash};
use std::fmt;
use std::str::FromStr;

use super::ConsensusError;

/// Role a node plays for its whole lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Produces blocks and publishes them to the DA layer.
    Sequencer,
    /// Verifies and imports blocks read from the DA layer.
    Validator,
    /// Verifies like a validator and reports suspected fraud.
    WatchTower,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Sequencer => "sequencer",
            Role::Validator => "validator",
            Role::WatchTower => "watchtower",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequencer" => Ok(Role::Sequencer),
            "validator" => Ok(Role::Validator),
            "watchtower" => Ok(Role::WatchTower),
            other => Err(ConsensusError::Configuration(format!(
                "unknown node type '{}': expected sequencer, validator or watchtower",
                other
            ))),
        }
    }
}

/// Lifecycle phase of the running role. Only ever moves forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum RolePhase {
    #[default]
    Idle,
    Bootstrapping,
    LoadingIdentity,
    Producing,
    Watching,
    Stopped,
}

/// Events emitted by the running role to observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleEvent {
    /// The sequencer sealed, published and appended a block.
    BlockProduced {
        number: u64,
        hash: Hash,
        transactions: usize,
    },
    /// A DA block was verified and imported.
    BlockAccepted { number: u64, hash: Hash },
    /// A DA block failed verification or import.
    BlockRejected {
        number: u64,
        hash: Hash,
        reason: &'static str,
    },
    /// A block was written by an address outside the active set.
    FraudSuspected {
        producer: Address,
        number: u64,
        hash: Hash,
    },
}

/// Sync progress reported to the host. DA consensus never reports one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncProgression {
    pub starting_block: u64,
    pub current_block: u64,
    pub highest_block: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("Sequencer".parse::<Role>().unwrap(), Role::Sequencer);
        assert_eq!("VALIDATOR".parse::<Role>().unwrap(), Role::Validator);
        assert_eq!(" watchtower ".parse::<Role>().unwrap(), Role::WatchTower);
    }

    #[test]
    fn test_role_parse_rejects_unknown() {
        assert!(matches!(
            "miner".parse::<Role>(),
            Err(ConsensusError::Configuration(_))
        ));
    }

    #[test]
    fn test_phases_are_ordered() {
        assert!(RolePhase::Idle < RolePhase::Bootstrapping);
        assert!(RolePhase::Bootstrapping < RolePhase::Producing);
        assert!(RolePhase::LoadingIdentity < RolePhase::Watching);
        assert!(RolePhase::Watching < RolePhase::Stopped);
    }
}
