//! # Core Domain Entities
//!
//! Primitive identifiers, accounts, transactions and receipts shared by the
//! staking and consensus crates.
//!
//! ## Clusters
//!
//! - **Identity**: `Address`, `Hash`, `Signature`
//! - **State**: `AccountState`
//! - **Execution**: `Transaction`, `Receipt`

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha3::{Digest, Keccak256};

use crate::errors::AddressParseError;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

/// One ether expressed in wei.
pub const ETH: u128 = 1_000_000_000_000_000_000;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// A 65-byte recoverable secp256k1 ECDSA signature (r || s || v).
pub type Signature = [u8; 65];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// The all-zero hash, used as the parent of the genesis block.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Format an address as a `0x`-prefixed lowercase hex string.
pub fn address_to_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Format a hash as a `0x`-prefixed lowercase hex string.
pub fn hash_to_hex(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}

/// Parse a `0x`-prefixed (or bare) 40 character hex string into an address.
pub fn parse_address(input: &str) -> Result<Address, AddressParseError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 40 {
        return Err(AddressParseError::InvalidLength(digits.len()));
    }

    let bytes = hex::decode(digits).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
    let mut address = [0u8; 20];
    address.copy_from_slice(&bytes);
    Ok(address)
}

// =============================================================================
// CLUSTER B: STATE
// =============================================================================

/// The state of an account at a given state root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Account balance in wei.
    pub balance: U256,
    /// Account nonce (number of transactions sent).
    pub nonce: u64,
}

impl AccountState {
    /// Account holding `balance` with a zero nonce.
    pub fn with_balance(balance: U256) -> Self {
        Self { balance, nonce: 0 }
    }
}

// =============================================================================
// CLUSTER C: EXECUTION
// =============================================================================

/// A signed transaction as drained from the pool and carried in blocks.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender address (derived from the signing key).
    pub from: Address,
    /// Recipient address (contract or account).
    pub to: Option<Address>,
    /// Value transferred in wei.
    pub value: U256,
    /// Sender's nonce to prevent replay.
    pub nonce: u64,
    /// Gas price in wei.
    pub gas_price: U256,
    /// Gas limit for this transaction.
    pub gas_limit: u64,
    /// Call data.
    pub data: Vec<u8>,
    /// ECDSA signature over [`Transaction::signing_hash`].
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl Transaction {
    /// Hash of every field except the signature. This is the signed message.
    pub fn signing_hash(&self) -> Hash {
        let mut hasher = Keccak256::new();
        hasher.update(self.from);
        match &self.to {
            Some(to) => {
                hasher.update([1u8]);
                hasher.update(to);
            }
            None => hasher.update([0u8]),
        }
        hasher.update(u256_bytes(&self.value));
        hasher.update(self.nonce.to_be_bytes());
        hasher.update(u256_bytes(&self.gas_price));
        hasher.update(self.gas_limit.to_be_bytes());
        hasher.update(&self.data);
        hasher.finalize().into()
    }

    /// Transaction hash, committing to the signature as well.
    pub fn hash(&self) -> Hash {
        let mut hasher = Keccak256::new();
        hasher.update(self.signing_hash());
        hasher.update(self.signature);
        hasher.finalize().into()
    }

    /// Maximum fee the sender can be charged (`gas_price * gas_limit`).
    pub fn max_fee(&self) -> U256 {
        self.gas_price.saturating_mul(U256::from(self.gas_limit))
    }
}

/// Outcome of applying one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hash of the applied transaction.
    pub tx_hash: Hash,
    /// Whether execution succeeded.
    pub success: bool,
    /// Gas consumed by this transaction.
    pub gas_used: u64,
}

pub(crate) fn u256_bytes(value: &U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}
