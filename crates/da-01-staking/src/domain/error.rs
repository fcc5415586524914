//! Error types for the staking crate

use shared_types::{address_to_hex, hash_to_hex, Address, Hash, U256};
use shared_crypto::CryptoError;
use thiserror::Error;

use super::StakingCallError;

/// Errors reported by the chain collaborator.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Block {number} does not extend the head (head is {head})")]
    NotExtendingHead { number: u64, head: u64 },

    #[error("Unknown parent block: {}", hash_to_hex(.0))]
    UnknownParent(Hash),

    #[error("Block already known: {}", hash_to_hex(.0))]
    AlreadyKnown(Hash),

    #[error("Chain storage error: {0}")]
    Storage(String),
}

/// Errors reported by the state execution collaborator.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("State snapshot not available: {}", hash_to_hex(.0))]
    MissingState(Hash),

    #[error("Nonce mismatch for {}: expected {expected}, got {actual}", address_to_hex(.address))]
    NonceMismatch {
        address: Address,
        expected: u64,
        actual: u64,
    },

    #[error("Insufficient balance for {}: need {required}, have {available}", address_to_hex(.address))]
    InsufficientBalance {
        address: Address,
        required: U256,
        available: U256,
    },

    #[error("Intrinsic gas too low: limit {limit}, required {required}")]
    IntrinsicGasTooLow { limit: u64, required: u64 },

    #[error("Block gas exhausted: used {used}, requested {requested}, limit {limit}")]
    BlockGasExhausted { used: u64, requested: u64, limit: u64 },

    #[error("Invalid staking call: {0}")]
    InvalidStakingCall(#[from] StakingCallError),

    #[error("Stake amount must be non-zero")]
    ZeroStake,

    #[error("Address is not staked: {}", address_to_hex(.0))]
    NotStaked(Address),

    #[error("Invalid signature from {}: {reason}", address_to_hex(.address))]
    InvalidSignature { address: Address, reason: String },

    #[error("Signer mismatch: transaction from {}, signed by {}", address_to_hex(.from), address_to_hex(.signer))]
    SignerMismatch { from: Address, signer: Address },

    #[error("Execution error: {0}")]
    Other(String),
}

/// Staking error types
#[derive(Debug, Error)]
pub enum StakingError {
    /// The state snapshot needed to answer a stake query could not be loaded.
    /// Callers must surface this rather than treat the address as unstaked.
    #[error("Failed to read staking state: {0}")]
    StateRead(String),

    #[error("Chain has no head block")]
    NoHead,

    #[error("Staking transaction {} failed: {reason}", hash_to_hex(.tx_hash))]
    TransactionFailed { tx_hash: Hash, reason: String },

    #[error("Staking transaction included but {} is not active", address_to_hex(.0))]
    NotActivated(Address),

    #[error("Failed to sign staking transaction: {0}")]
    Signing(#[from] CryptoError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
}

impl StakingError {
    /// Classify an execution failure that happened while reading state.
    pub fn from_read(err: ExecutionError) -> Self {
        StakingError::StateRead(err.to_string())
    }
}

/// Result type for staking operations
pub type StakingResult<T> = Result<T, StakingError>;
