//! Block import
//!
//! Re-executes a verified block on its parent state and appends it to the
//! local chain. The header's roots and gas must match what execution yields.

use da_01_staking::{Blockchain, StateExecutor};
use shared_types::{hash_to_hex, transactions_root, Block, Hash, SealedBlock};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{ConsensusResult, HeaderError};
use crate::verifier::HeaderVerifier;

/// Result of importing one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The block was executed and appended.
    Imported(Hash),
    /// The block was already in the chain.
    AlreadyKnown(Hash),
}

/// Imports verified blocks into the local chain.
pub struct BlockImporter {
    chain: Arc<dyn Blockchain>,
    executor: Arc<dyn StateExecutor>,
    verifier: Arc<HeaderVerifier>,
}

impl BlockImporter {
    pub fn new(
        chain: Arc<dyn Blockchain>,
        executor: Arc<dyn StateExecutor>,
        verifier: Arc<HeaderVerifier>,
    ) -> Self {
        Self {
            chain,
            executor,
            verifier,
        }
    }

    /// Execute and append a block whose header already passed verification.
    pub fn import(&self, block: Block) -> ConsensusResult<ImportOutcome> {
        let hash = block.hash();
        if self.chain.has_block(&hash) {
            debug!("[da-02] Block #{} already known", block.number());
            return Ok(ImportOutcome::AlreadyKnown(hash));
        }

        let parent = self
            .chain
            .header_by_hash(&block.header.parent_hash)
            .ok_or(HeaderError::UnknownParent(block.header.parent_hash))?;

        let computed = transactions_root(&block.transactions);
        if computed != block.header.transactions_root {
            return Err(HeaderError::TransactionsRootMismatch {
                header: block.header.transactions_root,
                computed,
            }
            .into());
        }

        let mut transition = self
            .executor
            .begin_transition(parent.state_root, &block.header)?;
        let mut receipts = Vec::with_capacity(block.transactions.len());
        for tx in &block.transactions {
            receipts.push(transition.apply(tx)?);
        }

        let executed = transition.total_gas();
        if executed != block.header.gas_used {
            return Err(HeaderError::GasUsedMismatch {
                header: block.header.gas_used,
                executed,
            }
            .into());
        }

        self.verifier
            .pre_commit_state(&block.header, transition.as_ref())?;

        let state_root = transition.commit()?;
        if state_root != block.header.state_root {
            return Err(HeaderError::StateRootMismatch {
                header: block.header.state_root,
                computed: state_root,
            }
            .into());
        }

        let number = block.number();
        let count = block.transactions.len();
        self.chain
            .write_block(SealedBlock::from_executed(block, receipts))?;

        info!(
            "[da-02] Imported block #{} ({} txs) {}",
            number,
            count,
            hash_to_hex(&hash)
        );
        Ok(ImportOutcome::Imported(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConsensusError;
    use crate::ports::SystemTimeSource;
    use da_01_staking::adapters::{InMemoryChain, InMemoryState, WorldState};
    use da_01_staking::{sign_transaction, ActiveSequencersQuerier, StakeEntry};
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::{AccountState, Address, BlockHeader, PendingBlock, Transaction, ETH, U256};

    const SEQUENCER: Address = [0x11; 20];
    const BOB: Address = [0xbb; 20];

    fn alice() -> Secp256k1KeyPair {
        Secp256k1KeyPair::from_bytes([0xaa; 32]).unwrap()
    }

    struct Fixture {
        chain: Arc<InMemoryChain>,
        state: InMemoryState,
        importer: BlockImporter,
        genesis: BlockHeader,
    }

    fn fixture() -> Fixture {
        let state = InMemoryState::new();
        let root = state.insert_genesis(WorldState::from_alloc(
            [(alice().address(), AccountState::with_balance(U256::from(10 * ETH)))],
            [(SEQUENCER, StakeEntry::active(U256::from(ETH)))],
        ));
        let genesis = BlockHeader::genesis(root, 30_000_000, 1_000);
        let chain = Arc::new(InMemoryChain::with_genesis(genesis.clone()));
        let querier = ActiveSequencersQuerier::new(chain.clone(), Arc::new(state.clone()));
        let verifier = Arc::new(HeaderVerifier::new(
            chain.clone(),
            querier,
            Arc::new(SystemTimeSource),
            15,
        ));
        let importer = BlockImporter::new(chain.clone(), Arc::new(state.clone()), verifier);
        Fixture {
            chain,
            state,
            importer,
            genesis,
        }
    }

    fn unsigned_transfer(nonce: u64) -> Transaction {
        Transaction {
            from: alice().address(),
            to: Some(BOB),
            value: U256::from(ETH),
            nonce,
            gas_price: U256::zero(),
            gas_limit: 21_000,
            data: vec![],
            signature: [0u8; 65],
        }
    }

    fn transfer(nonce: u64) -> Transaction {
        sign_transaction(&alice(), unsigned_transfer(nonce)).unwrap()
    }

    /// Execute `txs` the way a sequencer would and return the sealed block.
    fn produce(f: &Fixture, txs: Vec<Transaction>) -> SealedBlock {
        let header = BlockHeader::child_of(&f.genesis, SEQUENCER, f.genesis.timestamp + 2);
        let mut transition = f
            .state
            .begin_transition(f.genesis.state_root, &header)
            .unwrap();
        let mut pending = PendingBlock::new(header);
        for tx in txs {
            let receipt = transition.apply(&tx).unwrap();
            pending.push(tx, receipt);
        }
        pending.header.gas_used = transition.total_gas();
        pending.header.state_root = transition.commit().unwrap();
        pending.seal()
    }

    #[test]
    fn test_import_executes_and_appends() {
        let f = fixture();
        let sealed = produce(&f, vec![transfer(0)]);

        let outcome = f.importer.import(sealed.block().clone()).unwrap();

        assert_eq!(outcome, ImportOutcome::Imported(sealed.hash()));
        assert_eq!(f.chain.height(), 1);
        let bob = f
            .state
            .account(&sealed.header().state_root, &BOB)
            .unwrap()
            .unwrap();
        assert_eq!(bob.balance, U256::from(ETH));
    }

    #[test]
    fn test_import_skips_known_block() {
        let f = fixture();
        let sealed = produce(&f, vec![]);
        f.importer.import(sealed.block().clone()).unwrap();

        let outcome = f.importer.import(sealed.block().clone()).unwrap();
        assert_eq!(outcome, ImportOutcome::AlreadyKnown(sealed.hash()));
        assert_eq!(f.chain.height(), 1);
    }

    #[test]
    fn test_import_rejects_wrong_state_root() {
        let f = fixture();
        let mut block = produce(&f, vec![transfer(0)]).into_block();
        block.header.state_root = [3u8; 32];

        assert!(matches!(
            f.importer.import(block),
            Err(ConsensusError::MalformedHeader(HeaderError::StateRootMismatch { .. }))
        ));
        assert_eq!(f.chain.height(), 0);
    }

    #[test]
    fn test_import_rejects_tampered_transactions() {
        let f = fixture();
        let mut block = produce(&f, vec![transfer(0)]).into_block();
        block.transactions[0].value = U256::from(2 * ETH);

        assert!(matches!(
            f.importer.import(block),
            Err(ConsensusError::MalformedHeader(
                HeaderError::TransactionsRootMismatch { .. }
            ))
        ));
    }

    #[test]
    fn test_import_rejects_unexecutable_transaction() {
        let f = fixture();
        let mut block = produce(&f, vec![]).into_block();
        block.transactions.push(transfer(7));
        block.header.transactions_root = transactions_root(&block.transactions);

        assert!(matches!(
            f.importer.import(block),
            Err(ConsensusError::Execution(_))
        ));
        assert_eq!(f.chain.height(), 0);
    }

    #[test]
    fn test_import_rejects_unsigned_transaction() {
        let f = fixture();
        let mut block = produce(&f, vec![]).into_block();
        block.transactions.push(unsigned_transfer(0));
        block.header.transactions_root = transactions_root(&block.transactions);

        assert!(matches!(
            f.importer.import(block),
            Err(ConsensusError::Execution(reason)) if reason.starts_with("Invalid signature")
        ));
        assert_eq!(f.chain.height(), 0);
    }
}
