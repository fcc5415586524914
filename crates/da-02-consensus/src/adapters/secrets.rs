//! In-memory secrets manager and keystore

use parking_lot::RwLock;
use shared_crypto::Secp256k1KeyPair;
use shared_types::{address_to_hex, Address};
use std::collections::HashMap;

use crate::ports::{KeyStore, SecretsManager};

/// Secrets held in memory
#[derive(Default)]
pub struct StaticSecretsManager {
    secrets: RwLock<HashMap<String, Vec<u8>>>,
}

impl StaticSecretsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `name`
    pub fn with_secret(self, name: &str, value: impl Into<Vec<u8>>) -> Self {
        self.secrets.write().insert(name.to_string(), value.into());
        self
    }
}

impl SecretsManager for StaticSecretsManager {
    fn get_secret(&self, name: &str) -> Result<Vec<u8>, String> {
        self.secrets
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| format!("secret '{}' not found", name))
    }
}

/// Keystore holding raw secret keys by address
#[derive(Default)]
pub struct InMemoryKeyStore {
    keys: RwLock<HashMap<Address, [u8; 32]>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `key` under its own address
    pub fn insert(&self, key: &Secp256k1KeyPair) {
        self.keys.write().insert(key.address(), key.to_bytes());
    }
}

impl KeyStore for InMemoryKeyStore {
    fn load_key(&self, address: &Address) -> Result<Secp256k1KeyPair, String> {
        let keys = self.keys.read();
        let bytes = keys
            .get(address)
            .ok_or_else(|| format!("no key for account {}", address_to_hex(address)))?;
        Secp256k1KeyPair::from_bytes(*bytes).map_err(|e| e.to_string())
    }
}
