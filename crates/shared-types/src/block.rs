//! # Blocks
//!
//! Headers, blocks under construction and sealed blocks.
//!
//! A [`PendingBlock`] is mutable and owned by whoever is building it. Calling
//! [`PendingBlock::seal`] fixes the transactions root, computes the header
//! hash and yields an immutable [`SealedBlock`].

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::entities::{Address, Hash, Receipt, Transaction, ZERO_HASH};

/// The header of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockHeader {
    /// Hash of the parent block.
    pub parent_hash: Hash,
    /// Block number (height).
    pub number: u64,
    /// Address of the sequencer that produced the block.
    pub miner: Address,
    /// State root after applying this block's transactions.
    pub state_root: Hash,
    /// Root committing to the ordered transaction hashes.
    pub transactions_root: Hash,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Gas limit for the block.
    pub gas_limit: u64,
    /// Gas consumed by the block's transactions.
    pub gas_used: u64,
    /// Free-form extra data.
    pub extra_data: Vec<u8>,
}

impl BlockHeader {
    /// Genesis header committing to `state_root`.
    pub fn genesis(state_root: Hash, gas_limit: u64, timestamp: u64) -> Self {
        Self {
            parent_hash: ZERO_HASH,
            number: 0,
            miner: [0u8; 20],
            state_root,
            transactions_root: transactions_root(&[]),
            timestamp,
            gas_limit,
            gas_used: 0,
            extra_data: Vec::new(),
        }
    }

    /// Child header template extending `parent`. State root, gas used and the
    /// transactions root are filled in once the block is executed.
    pub fn child_of(parent: &BlockHeader, miner: Address, timestamp: u64) -> Self {
        Self {
            parent_hash: parent.hash(),
            number: parent.number + 1,
            miner,
            state_root: ZERO_HASH,
            transactions_root: ZERO_HASH,
            timestamp,
            gas_limit: parent.gas_limit,
            gas_used: 0,
            extra_data: Vec::new(),
        }
    }

    /// Compute the Keccak-256 hash of this header.
    pub fn hash(&self) -> Hash {
        let mut hasher = Keccak256::new();
        hasher.update(self.parent_hash);
        hasher.update(self.number.to_be_bytes());
        hasher.update(self.miner);
        hasher.update(self.state_root);
        hasher.update(self.transactions_root);
        hasher.update(self.timestamp.to_be_bytes());
        hasher.update(self.gas_limit.to_be_bytes());
        hasher.update(self.gas_used.to_be_bytes());
        hasher.update((self.extra_data.len() as u64).to_be_bytes());
        hasher.update(&self.extra_data);
        hasher.finalize().into()
    }

    /// Check if this is a genesis header.
    pub fn is_genesis(&self) -> bool {
        self.number == 0 && self.parent_hash == ZERO_HASH
    }
}

/// Root over the ordered list of transaction hashes.
pub fn transactions_root(transactions: &[Transaction]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update((transactions.len() as u64).to_be_bytes());
    for tx in transactions {
        hasher.update(tx.hash());
    }
    hasher.finalize().into()
}

/// A block as published to and received from the DA layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,
    /// Ordered transactions.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Hash of the block (its header hash).
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Number of the block.
    pub fn number(&self) -> u64 {
        self.header.number
    }
}

/// A block under construction.
#[derive(Debug, Clone)]
pub struct PendingBlock {
    /// Header being filled in.
    pub header: BlockHeader,
    /// Transactions included so far.
    pub transactions: Vec<Transaction>,
    /// Receipts for the included transactions.
    pub receipts: Vec<Receipt>,
}

impl PendingBlock {
    /// Start building on top of `header`.
    pub fn new(header: BlockHeader) -> Self {
        Self {
            header,
            transactions: Vec::new(),
            receipts: Vec::new(),
        }
    }

    /// Record an applied transaction with its receipt.
    pub fn push(&mut self, tx: Transaction, receipt: Receipt) {
        self.transactions.push(tx);
        self.receipts.push(receipt);
    }

    /// Fix the transactions root, compute the hash and freeze the block.
    pub fn seal(mut self) -> SealedBlock {
        self.header.transactions_root = transactions_root(&self.transactions);
        let hash = self.header.hash();
        SealedBlock {
            block: Block {
                header: self.header,
                transactions: self.transactions,
            },
            receipts: self.receipts,
            hash,
        }
    }
}

/// An immutable block whose hash has been computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBlock {
    block: Block,
    receipts: Vec<Receipt>,
    hash: Hash,
}

impl SealedBlock {
    /// Seal a block received from elsewhere together with the receipts
    /// produced by re-executing it.
    pub fn from_executed(block: Block, receipts: Vec<Receipt>) -> Self {
        let hash = block.header.hash();
        Self {
            block,
            receipts,
            hash,
        }
    }

    /// The sealed hash.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// The header.
    pub fn header(&self) -> &BlockHeader {
        &self.block.header
    }

    /// The block body as published to the DA layer.
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Receipts of the included transactions.
    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// Block number.
    pub fn number(&self) -> u64 {
        self.block.header.number
    }

    /// Consume into the DA block.
    pub fn into_block(self) -> Block {
        self.block
    }
}
