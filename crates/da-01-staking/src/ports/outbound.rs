//! Outbound ports (driven side)

use shared_types::{AccountState, Address, BlockHeader, Hash, Receipt, SealedBlock, Transaction};

use crate::domain::{ChainError, ExecutionError, StakeEntry};

/// The canonical chain.
pub trait Blockchain: Send + Sync {
    /// Current head header, `None` before genesis is written.
    fn head(&self) -> Option<BlockHeader>;

    /// Header lookup by hash.
    fn header_by_hash(&self, hash: &Hash) -> Option<BlockHeader>;

    /// Whether a block with this hash is already stored.
    fn has_block(&self, hash: &Hash) -> bool {
        self.header_by_hash(hash).is_some()
    }

    /// Append a block on top of the current head.
    fn write_block(&self, block: SealedBlock) -> Result<(), ChainError>;
}

/// Opens state transitions over stored state snapshots.
pub trait StateExecutor: Send + Sync {
    /// Begin executing `header`'s transactions on top of `parent_state_root`.
    fn begin_transition(
        &self,
        parent_state_root: Hash,
        header: &BlockHeader,
    ) -> Result<Box<dyn StateTransition>, ExecutionError>;

    /// Account lookup at a given state root.
    fn account(
        &self,
        state_root: &Hash,
        address: &Address,
    ) -> Result<Option<AccountState>, ExecutionError>;
}

/// An in-progress block execution.
pub trait StateTransition: Send {
    /// Apply one transaction. An error leaves the transition untouched.
    fn apply(&mut self, tx: &Transaction) -> Result<Receipt, ExecutionError>;

    /// Stake entry of `address` in the post-state so far.
    fn stake_entry(&self, address: &Address) -> Option<StakeEntry>;

    /// Gas consumed by the applied transactions.
    fn total_gas(&self) -> u64;

    /// Persist the post-state and return its root.
    fn commit(self: Box<Self>) -> Result<Hash, ExecutionError>;
}

/// Read access to the staking ledger stored in chain state.
pub trait StakeLedger: Send + Sync {
    /// Stake entry of `address` at `state_root`.
    fn stake_entry(
        &self,
        state_root: &Hash,
        address: &Address,
    ) -> Result<Option<StakeEntry>, ExecutionError>;

    /// All active sequencers at `state_root`.
    fn active_sequencers(&self, state_root: &Hash) -> Result<Vec<Address>, ExecutionError>;
}

/// Writes an account without executing a transaction.
///
/// Only the bootstrap funding path uses this. It is never reachable from
/// block import.
pub trait DirectStateWriter: Send + Sync {
    /// Overwrite `address` on top of `parent_state_root`, returning the new root.
    fn set_account_directly(
        &self,
        parent_state_root: Hash,
        address: Address,
        account: AccountState,
    ) -> Result<Hash, ExecutionError>;
}
