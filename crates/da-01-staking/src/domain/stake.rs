//! Staking ledger entities
//!
//! The staking ledger lives in chain state. Its storage layout belongs to the
//! execution engine; this crate only knows the entry shape and how a staking
//! call is encoded into transaction data.

use serde::{Deserialize, Serialize};
use shared_types::{keccak256, Address, U256};

/// Address of the staking contract that staking calls are sent to.
pub const STAKING_CONTRACT_ADDRESS: Address = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x10, 0x01,
];

/// Function signature of the stake call.
pub const STAKE_SIGNATURE: &str = "stake(string)";

/// Function signature of the unstake call.
pub const UNSTAKE_SIGNATURE: &str = "unstake()";

/// Stake held by one address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEntry {
    /// Whether the address is in the active-sequencer set.
    pub active: bool,
    /// Amount staked in wei.
    pub amount: U256,
}

impl StakeEntry {
    /// Active entry holding `amount`.
    pub fn active(amount: U256) -> Self {
        Self {
            active: true,
            amount,
        }
    }
}

/// A call into the staking contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StakingCall {
    /// Lock the transaction value as stake for the given node type.
    Stake {
        /// Role label the stake is registered under (e.g. "sequencer").
        node_type: String,
    },
    /// Leave the active set and release the stake.
    Unstake,
}

/// Errors decoding staking call data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StakingCallError {
    #[error("Call data too short: {0} bytes")]
    TooShort(usize),

    #[error("Unknown staking selector: {0:02x?}")]
    UnknownSelector([u8; 4]),

    #[error("Node type is not valid UTF-8")]
    InvalidNodeType,
}

/// First four bytes of the Keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

impl StakingCall {
    /// Encode as transaction call data: selector followed by arguments.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            StakingCall::Stake { node_type } => {
                let mut data = selector(STAKE_SIGNATURE).to_vec();
                data.extend_from_slice(node_type.as_bytes());
                data
            }
            StakingCall::Unstake => selector(UNSTAKE_SIGNATURE).to_vec(),
        }
    }

    /// Decode transaction call data.
    pub fn decode(data: &[u8]) -> Result<Self, StakingCallError> {
        if data.len() < 4 {
            return Err(StakingCallError::TooShort(data.len()));
        }
        let mut head = [0u8; 4];
        head.copy_from_slice(&data[..4]);

        if head == selector(STAKE_SIGNATURE) {
            let node_type = std::str::from_utf8(&data[4..])
                .map_err(|_| StakingCallError::InvalidNodeType)?
                .to_string();
            Ok(StakingCall::Stake { node_type })
        } else if head == selector(UNSTAKE_SIGNATURE) {
            Ok(StakingCall::Unstake)
        } else {
            Err(StakingCallError::UnknownSelector(head))
        }
    }
}
