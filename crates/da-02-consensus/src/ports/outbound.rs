//! Driven ports (Outbound dependencies)

use async_trait::async_trait;
use shared_crypto::Secp256k1KeyPair;
use shared_types::{Address, Block, Hash, SealedBlock, Transaction};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::DaError;

/// Secret name under which the node's validator key is stored.
pub const VALIDATOR_KEY_SECRET: &str = "validator-key";

/// Client for the data-availability network.
///
/// Blocks are delivered in publication order.
#[async_trait]
pub trait DaClient: Send + Sync {
    /// Publish a sealed block.
    async fn submit_block(&self, block: &SealedBlock) -> Result<(), DaError>;

    /// Wait for the next published block. `None` once the stream ends.
    async fn next_block(&self) -> Result<Option<Block>, DaError>;
}

/// Opens DA clients.
pub trait DaConnector: Send + Sync {
    /// Connect to `endpoint` (e.g. `ws://127.0.0.1:9944/v1/json-rpc`).
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn DaClient>, DaError>;
}

/// Transaction pool interface for block production
#[async_trait]
pub trait TxPool: Send + Sync {
    /// Get ready transactions, in inclusion order, up to the limits
    async fn get_transactions_for_block(
        &self,
        max_count: usize,
        max_gas: u64,
    ) -> Result<Vec<Transaction>, String>;

    /// Remove transactions included in a block
    async fn remove_included(&self, tx_hashes: &[Hash]) -> Result<(), String>;

    /// Drop transactions that failed to execute
    async fn drop_transactions(&self, tx_hashes: &[Hash]) -> Result<(), String>;
}

/// Node secrets storage
pub trait SecretsManager: Send + Sync {
    /// Raw secret bytes stored under `name`
    fn get_secret(&self, name: &str) -> Result<Vec<u8>, String>;
}

/// Account keystore
pub trait KeyStore: Send + Sync {
    /// Load and unlock the key of `address`
    fn load_key(&self, address: &Address) -> Result<Secp256k1KeyPair, String>;
}

/// Peer block syncer
#[async_trait]
pub trait Syncer: Send + Sync {
    /// Start syncing; `timeout` bounds a single block request
    async fn start(&self, timeout: Duration) -> Result<(), String>;
}

/// Time source for timestamp validation
pub trait TimeSource: Send + Sync {
    /// Get current unix timestamp in seconds
    fn now(&self) -> u64;
}

/// Default time source using system time
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}
