//! In-memory transaction pool

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Hash, Transaction};
use std::collections::HashSet;

use crate::ports::TxPool;

/// FIFO transaction pool for tests and the dev node
pub struct InMemoryTxPool {
    pending: RwLock<Vec<Transaction>>,
}

impl InMemoryTxPool {
    pub fn new() -> Self {
        Self {
            pending: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, tx: Transaction) {
        self.pending.write().push(tx);
    }

    pub fn len(&self) -> usize {
        self.pending.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.read().is_empty()
    }

    fn remove(&self, tx_hashes: &[Hash]) {
        let remove: HashSet<&Hash> = tx_hashes.iter().collect();
        self.pending.write().retain(|tx| !remove.contains(&tx.hash()));
    }
}

impl Default for InMemoryTxPool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TxPool for InMemoryTxPool {
    async fn get_transactions_for_block(
        &self,
        max_count: usize,
        max_gas: u64,
    ) -> Result<Vec<Transaction>, String> {
        let pending = self.pending.read();
        let mut gas = 0u64;
        let mut selected = Vec::new();
        for tx in pending.iter() {
            if selected.len() >= max_count {
                break;
            }
            if gas.saturating_add(tx.gas_limit) > max_gas {
                continue;
            }
            gas += tx.gas_limit;
            selected.push(tx.clone());
        }
        Ok(selected)
    }

    async fn remove_included(&self, tx_hashes: &[Hash]) -> Result<(), String> {
        self.remove(tx_hashes);
        Ok(())
    }

    async fn drop_transactions(&self, tx_hashes: &[Hash]) -> Result<(), String> {
        self.remove(tx_hashes);
        Ok(())
    }
}
