//! In-memory chain adapter
//!
//! Linear chain without forks. Used by the dev node and tests.

use parking_lot::RwLock;
use shared_types::{Block, BlockHeader, Hash, SealedBlock};
use std::collections::HashMap;

use crate::domain::ChainError;
use crate::ports::Blockchain;

struct ChainInner {
    /// Stored blocks by hash
    blocks: HashMap<Hash, SealedBlock>,
    /// Canonical hashes, indexed by block number
    canonical: Vec<Hash>,
}

/// In-memory canonical chain
pub struct InMemoryChain {
    inner: RwLock<ChainInner>,
}

impl InMemoryChain {
    /// Create a chain holding only `genesis`.
    pub fn with_genesis(genesis: BlockHeader) -> Self {
        let sealed = SealedBlock::from_executed(
            Block {
                header: genesis,
                transactions: Vec::new(),
            },
            Vec::new(),
        );
        let hash = sealed.hash();

        let mut blocks = HashMap::new();
        blocks.insert(hash, sealed);

        Self {
            inner: RwLock::new(ChainInner {
                blocks,
                canonical: vec![hash],
            }),
        }
    }

    /// Current height
    pub fn height(&self) -> u64 {
        (self.inner.read().canonical.len() as u64).saturating_sub(1)
    }

    /// Get the canonical block at `number`
    pub fn block_by_number(&self, number: u64) -> Option<SealedBlock> {
        let inner = self.inner.read();
        let hash = inner.canonical.get(number as usize)?;
        inner.blocks.get(hash).cloned()
    }

    /// Get count of stored blocks
    pub fn block_count(&self) -> usize {
        self.inner.read().blocks.len()
    }
}

impl Blockchain for InMemoryChain {
    fn head(&self) -> Option<BlockHeader> {
        let inner = self.inner.read();
        let hash = inner.canonical.last()?;
        inner.blocks.get(hash).map(|b| b.header().clone())
    }

    fn header_by_hash(&self, hash: &Hash) -> Option<BlockHeader> {
        self.inner.read().blocks.get(hash).map(|b| b.header().clone())
    }

    fn write_block(&self, block: SealedBlock) -> Result<(), ChainError> {
        let mut inner = self.inner.write();
        let hash = block.hash();

        if inner.blocks.contains_key(&hash) {
            return Err(ChainError::AlreadyKnown(hash));
        }

        let head_hash = *inner
            .canonical
            .last()
            .ok_or_else(|| ChainError::Storage("chain has no genesis".to_string()))?;
        let head_number = (inner.canonical.len() - 1) as u64;

        if block.header().parent_hash != head_hash {
            if !inner.blocks.contains_key(&block.header().parent_hash) {
                return Err(ChainError::UnknownParent(block.header().parent_hash));
            }
            return Err(ChainError::NotExtendingHead {
                number: block.number(),
                head: head_number,
            });
        }
        if block.number() != head_number + 1 {
            return Err(ChainError::NotExtendingHead {
                number: block.number(),
                head: head_number,
            });
        }

        inner.canonical.push(hash);
        inner.blocks.insert(hash, block);
        Ok(())
    }
}
