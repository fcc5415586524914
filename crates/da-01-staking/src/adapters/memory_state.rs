//! In-memory state executor
//!
//! Content-addressed world state snapshots. Every committed transition adds a
//! snapshot keyed by its root, so any past root stays readable until it is
//! explicitly forgotten.
//!
//! Execution rules are deliberately small: value transfers and the two
//! staking calls, each signed by its sender. Fees are `gas_used * gas_price` and go to the block miner.

use parking_lot::RwLock;
use shared_crypto::Secp256k1Signature;
use shared_types::{
    keccak256, AccountState, Address, BlockHeader, Hash, Receipt, Transaction, U256,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::domain::{ExecutionError, StakeEntry, StakingCall, STAKING_CONTRACT_ADDRESS};
use crate::ports::{DirectStateWriter, StakeLedger, StateExecutor, StateTransition};

/// Gas charged for any transaction.
pub const BASE_TX_GAS: u64 = 21_000;

/// Extra gas charged for a call into the staking contract.
pub const STAKING_CALL_GAS: u64 = 50_000;

/// One world state snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldState {
    accounts: BTreeMap<Address, AccountState>,
    stakes: BTreeMap<Address, StakeEntry>,
}

impl WorldState {
    /// Build a snapshot from account and stake allocations.
    pub fn from_alloc(
        accounts: impl IntoIterator<Item = (Address, AccountState)>,
        stakes: impl IntoIterator<Item = (Address, StakeEntry)>,
    ) -> Self {
        Self {
            accounts: accounts.into_iter().collect(),
            stakes: stakes.into_iter().collect(),
        }
    }

    /// Root committing to every account and stake entry.
    pub fn root(&self) -> Hash {
        let mut buf = Vec::with_capacity(16 + self.accounts.len() * 60 + self.stakes.len() * 53);
        buf.extend_from_slice(&(self.accounts.len() as u64).to_be_bytes());
        for (address, account) in &self.accounts {
            buf.extend_from_slice(address);
            buf.extend_from_slice(&u256_be(&account.balance));
            buf.extend_from_slice(&account.nonce.to_be_bytes());
        }
        buf.extend_from_slice(&(self.stakes.len() as u64).to_be_bytes());
        for (address, entry) in &self.stakes {
            buf.extend_from_slice(address);
            buf.push(entry.active as u8);
            buf.extend_from_slice(&u256_be(&entry.amount));
        }
        keccak256(&buf)
    }

    fn account(&self, address: &Address) -> AccountState {
        self.accounts.get(address).cloned().unwrap_or_default()
    }

    fn credit(&mut self, address: Address, amount: U256) {
        if amount.is_zero() {
            return;
        }
        let account = self.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(amount);
    }
}

fn u256_be(value: &U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}

type Snapshots = Arc<RwLock<HashMap<Hash, WorldState>>>;

/// In-memory state executor, stake ledger and bootstrap writer.
#[derive(Clone)]
pub struct InMemoryState {
    snapshots: Snapshots,
}

impl InMemoryState {
    /// Create an executor holding only the empty state.
    pub fn new() -> Self {
        let empty = WorldState::default();
        let mut snapshots = HashMap::new();
        snapshots.insert(empty.root(), empty);
        Self {
            snapshots: Arc::new(RwLock::new(snapshots)),
        }
    }

    /// Store a genesis snapshot and return its root.
    pub fn insert_genesis(&self, state: WorldState) -> Hash {
        let root = state.root();
        self.snapshots.write().insert(root, state);
        root
    }

    /// Whether a snapshot exists for `root`.
    pub fn has_state(&self, root: &Hash) -> bool {
        self.snapshots.read().contains_key(root)
    }

    /// Drop the snapshot for `root`, as a pruning node would.
    pub fn forget(&self, root: &Hash) {
        self.snapshots.write().remove(root);
    }

    fn snapshot(&self, root: &Hash) -> Result<WorldState, ExecutionError> {
        self.snapshots
            .read()
            .get(root)
            .cloned()
            .ok_or(ExecutionError::MissingState(*root))
    }
}

impl Default for InMemoryState {
    fn default() -> Self {
        Self::new()
    }
}

impl StateExecutor for InMemoryState {
    fn begin_transition(
        &self,
        parent_state_root: Hash,
        header: &BlockHeader,
    ) -> Result<Box<dyn StateTransition>, ExecutionError> {
        let state = self.snapshot(&parent_state_root)?;
        Ok(Box::new(MemoryTransition {
            state,
            snapshots: Arc::clone(&self.snapshots),
            coinbase: header.miner,
            gas_limit: header.gas_limit,
            gas_used: 0,
        }))
    }

    fn account(
        &self,
        state_root: &Hash,
        address: &Address,
    ) -> Result<Option<AccountState>, ExecutionError> {
        let snapshots = self.snapshots.read();
        let state = snapshots
            .get(state_root)
            .ok_or(ExecutionError::MissingState(*state_root))?;
        Ok(state.accounts.get(address).cloned())
    }
}

impl StakeLedger for InMemoryState {
    fn stake_entry(
        &self,
        state_root: &Hash,
        address: &Address,
    ) -> Result<Option<StakeEntry>, ExecutionError> {
        let snapshots = self.snapshots.read();
        let state = snapshots
            .get(state_root)
            .ok_or(ExecutionError::MissingState(*state_root))?;
        Ok(state.stakes.get(address).cloned())
    }

    fn active_sequencers(&self, state_root: &Hash) -> Result<Vec<Address>, ExecutionError> {
        let snapshots = self.snapshots.read();
        let state = snapshots
            .get(state_root)
            .ok_or(ExecutionError::MissingState(*state_root))?;
        Ok(state
            .stakes
            .iter()
            .filter(|(_, entry)| entry.active)
            .map(|(address, _)| *address)
            .collect())
    }
}

impl DirectStateWriter for InMemoryState {
    fn set_account_directly(
        &self,
        parent_state_root: Hash,
        address: Address,
        account: AccountState,
    ) -> Result<Hash, ExecutionError> {
        let mut state = self.snapshot(&parent_state_root)?;
        state.accounts.insert(address, account);
        let root = state.root();
        self.snapshots.write().insert(root, state);
        Ok(root)
    }
}

/// Transition over a private copy of the parent snapshot.
struct MemoryTransition {
    state: WorldState,
    snapshots: Snapshots,
    coinbase: Address,
    gas_limit: u64,
    gas_used: u64,
}

impl MemoryTransition {
    fn intrinsic_gas(tx: &Transaction) -> u64 {
        if tx.to == Some(STAKING_CONTRACT_ADDRESS) {
            BASE_TX_GAS + STAKING_CALL_GAS
        } else {
            BASE_TX_GAS
        }
    }

    /// The signature must recover to `tx.from`.
    fn check_signer(tx: &Transaction) -> Result<(), ExecutionError> {
        let signer = Secp256k1Signature::from_bytes(tx.signature)
            .recover_address(&tx.signing_hash())
            .map_err(|e| ExecutionError::InvalidSignature {
                address: tx.from,
                reason: e.to_string(),
            })?;
        if signer != tx.from {
            return Err(ExecutionError::SignerMismatch {
                from: tx.from,
                signer,
            });
        }
        Ok(())
    }
}

impl StateTransition for MemoryTransition {
    fn apply(&mut self, tx: &Transaction) -> Result<Receipt, ExecutionError> {
        Self::check_signer(tx)?;

        let gas = Self::intrinsic_gas(tx);
        if tx.gas_limit < gas {
            return Err(ExecutionError::IntrinsicGasTooLow {
                limit: tx.gas_limit,
                required: gas,
            });
        }
        if self.gas_used + gas > self.gas_limit {
            return Err(ExecutionError::BlockGasExhausted {
                used: self.gas_used,
                requested: gas,
                limit: self.gas_limit,
            });
        }

        let sender = self.state.account(&tx.from);
        if sender.nonce != tx.nonce {
            return Err(ExecutionError::NonceMismatch {
                address: tx.from,
                expected: sender.nonce,
                actual: tx.nonce,
            });
        }
        let fee = tx.gas_price.saturating_mul(U256::from(gas));
        let required = tx.value.saturating_add(fee);
        if sender.balance < required {
            return Err(ExecutionError::InsufficientBalance {
                address: tx.from,
                required,
                available: sender.balance,
            });
        }

        // Validate the call before touching any state.
        let call = match tx.to {
            Some(STAKING_CONTRACT_ADDRESS) => Some(StakingCall::decode(&tx.data)?),
            Some(_) => None,
            None => {
                return Err(ExecutionError::Other(
                    "contract creation is not supported".to_string(),
                ))
            }
        };
        let refund = match &call {
            Some(StakingCall::Stake { .. }) if tx.value.is_zero() => {
                return Err(ExecutionError::ZeroStake)
            }
            Some(StakingCall::Unstake) => match self.state.stakes.get(&tx.from) {
                Some(entry) if entry.active => entry.amount,
                _ => return Err(ExecutionError::NotStaked(tx.from)),
            },
            _ => U256::zero(),
        };

        let account = self.state.accounts.entry(tx.from).or_default();
        account.balance -= required;
        account.nonce += 1;

        match call {
            Some(StakingCall::Stake { node_type }) => {
                let entry = self.state.stakes.entry(tx.from).or_default();
                entry.amount = entry.amount.saturating_add(tx.value);
                entry.active = true;
                debug!(node_type = %node_type, amount = %entry.amount, "stake registered");
            }
            Some(StakingCall::Unstake) => {
                self.state.stakes.insert(tx.from, StakeEntry::default());
                self.state.credit(tx.from, refund.saturating_add(tx.value));
            }
            None => {
                if let Some(to) = tx.to {
                    self.state.credit(to, tx.value);
                }
            }
        }
        self.state.credit(self.coinbase, fee);
        self.gas_used += gas;

        Ok(Receipt {
            tx_hash: tx.hash(),
            success: true,
            gas_used: gas,
        })
    }

    fn stake_entry(&self, address: &Address) -> Option<StakeEntry> {
        self.state.stakes.get(address).cloned()
    }

    fn total_gas(&self) -> u64 {
        self.gas_used
    }

    fn commit(self: Box<Self>) -> Result<Hash, ExecutionError> {
        let root = self.state.root();
        self.snapshots.write().insert(root, self.state);
        Ok(root)
    }
}
