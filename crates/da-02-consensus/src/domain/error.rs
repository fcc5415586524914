//! Error types for the consensus crate

use da_01_staking::{ChainError, ExecutionError, StakingError};
use shared_types::{address_to_hex, hash_to_hex, Address, Hash};

/// Structural problems with a header.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("Unknown parent block: {}", hash_to_hex(.0))]
    UnknownParent(Hash),

    #[error("Invalid block number: expected {expected}, got {actual}")]
    InvalidNumber { expected: u64, actual: u64 },

    #[error("Invalid timestamp: block {block} < parent {parent}")]
    InvalidTimestamp { block: u64, parent: u64 },

    #[error("Timestamp too far in future: {timestamp}, current is {current}")]
    FutureTimestamp { timestamp: u64, current: u64 },

    #[error("Block gas exceeds limit: {used} > {limit}")]
    GasLimitExceeded { used: u64, limit: u64 },

    #[error("Gas used mismatch: header says {header}, execution used {executed}")]
    GasUsedMismatch { header: u64, executed: u64 },

    #[error("Extra data too large: {size} bytes > {limit} bytes")]
    ExtraDataTooLarge { size: usize, limit: usize },

    #[error("Header does not extend the previous header in the batch")]
    NotContiguous,

    #[error("State root mismatch: header {}, computed {}", hash_to_hex(.header), hash_to_hex(.computed))]
    StateRootMismatch { header: Hash, computed: Hash },

    #[error("Transactions root mismatch: header {}, computed {}", hash_to_hex(.header), hash_to_hex(.computed))]
    TransactionsRootMismatch { header: Hash, computed: Hash },
}

/// Errors reported by a DA client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DaError {
    #[error("Failed to connect to DA endpoint {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("DA layer unavailable: {0}")]
    Unavailable(String),

    #[error("DA layer rejected block: {0}")]
    Rejected(String),

    #[error("DA block stream closed")]
    Closed,
}

/// Consensus error types
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to load key: {0}")]
    KeyLoad(String),

    /// State snapshot could not be read. Surfaced as-is, retried next time.
    #[error("Failed to read state: {0}")]
    StateRead(String),

    #[error("Invalid producer: {} is not an active sequencer", address_to_hex(.0))]
    InvalidProducer(Address),

    #[error("Malformed header: {0}")]
    MalformedHeader(#[from] HeaderError),

    #[error("Header {index} (block #{number}) rejected: {source}")]
    BatchRejected {
        index: usize,
        number: u64,
        #[source]
        source: Box<ConsensusError>,
    },

    #[error("Producer {} deactivated by its own block", address_to_hex(.0))]
    ProducerDeactivated(Address),

    #[error("Staking transaction failed: {0}")]
    StakingTx(String),

    #[error("Bootstrap funding failed: {0}")]
    Funding(String),

    #[error("DA client error: {0}")]
    DaClient(#[from] DaError),

    #[error("Transaction pool error: {0}")]
    TxPool(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Chain error: {0}")]
    Chain(String),

    #[error("Syncer error: {0}")]
    Sync(String),

    #[error("{0} is not applicable to DA consensus")]
    NotApplicable(&'static str),
}

impl ConsensusError {
    /// Short label used for metrics and rejection events.
    pub fn reason(&self) -> &'static str {
        match self {
            ConsensusError::Configuration(_) => "configuration",
            ConsensusError::KeyLoad(_) => "key_load",
            ConsensusError::StateRead(_) => "state_read",
            ConsensusError::InvalidProducer(_) => "invalid_producer",
            ConsensusError::MalformedHeader(_) => "malformed_header",
            ConsensusError::BatchRejected { source, .. } => source.reason(),
            ConsensusError::ProducerDeactivated(_) => "producer_deactivated",
            ConsensusError::StakingTx(_) => "staking_tx",
            ConsensusError::Funding(_) => "funding",
            ConsensusError::DaClient(_) => "da_client",
            ConsensusError::TxPool(_) => "tx_pool",
            ConsensusError::Execution(_) => "execution",
            ConsensusError::Chain(_) => "chain",
            ConsensusError::Sync(_) => "sync",
            ConsensusError::NotApplicable(_) => "not_applicable",
        }
    }

    /// Whether this error means the producer is not allowed to write blocks.
    pub fn is_invalid_producer(&self) -> bool {
        match self {
            ConsensusError::InvalidProducer(_) => true,
            ConsensusError::BatchRejected { source, .. } => source.is_invalid_producer(),
            _ => false,
        }
    }
}

impl From<StakingError> for ConsensusError {
    fn from(err: StakingError) -> Self {
        match err {
            StakingError::StateRead(reason) => ConsensusError::StateRead(reason),
            StakingError::NoHead => ConsensusError::StateRead(err.to_string()),
            other => ConsensusError::StakingTx(other.to_string()),
        }
    }
}

impl From<ExecutionError> for ConsensusError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::MissingState(_) => ConsensusError::StateRead(err.to_string()),
            other => ConsensusError::Execution(other.to_string()),
        }
    }
}

impl From<ChainError> for ConsensusError {
    fn from(err: ChainError) -> Self {
        ConsensusError::Chain(err.to_string())
    }
}

/// Result type for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_rejection_keeps_inner_reason() {
        let err = ConsensusError::BatchRejected {
            index: 1,
            number: 2,
            source: Box::new(ConsensusError::InvalidProducer([1u8; 20])),
        };
        assert_eq!(err.reason(), "invalid_producer");
        assert!(err.is_invalid_producer());
    }

    #[test]
    fn test_missing_state_maps_to_state_read() {
        let err: ConsensusError = ExecutionError::MissingState([0u8; 32]).into();
        assert!(matches!(err, ConsensusError::StateRead(_)));

        let err: ConsensusError = StakingError::StateRead("gone".to_string()).into();
        assert!(matches!(err, ConsensusError::StateRead(_)));
    }
}
