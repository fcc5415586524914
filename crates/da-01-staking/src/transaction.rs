//! Staking transaction submission
//!
//! Builds, signs and executes a staking call in its own block on top of the
//! current head, then appends that block to the chain.

use shared_crypto::{CryptoError, Secp256k1KeyPair};
use shared_types::{
    address_to_hex, hash_to_hex, Address, BlockHeader, PendingBlock, SealedBlock, Transaction,
    U256,
};
use tracing::info;

use crate::domain::{StakingCall, StakingError, StakingResult, STAKING_CONTRACT_ADDRESS};
use crate::ports::{Blockchain, StateExecutor};

/// Parameters of a stake submission.
pub struct StakeRequest<'a> {
    /// Role label recorded with the stake (e.g. "sequencer").
    pub node_type: &'a str,
    /// Address that stakes. Must match `key`.
    pub address: Address,
    /// Signing key for the staking transaction.
    pub key: &'a Secp256k1KeyPair,
    /// Amount to lock, in wei.
    pub amount: U256,
    /// Gas limit of the staking transaction.
    pub gas_limit: u64,
    /// Label used in logs for the staking account.
    pub account_label: &'a str,
    /// Timestamp of the block carrying the transaction.
    pub timestamp: u64,
}

/// Set `tx.from` to the key's address and sign the transaction.
pub fn sign_transaction(
    key: &Secp256k1KeyPair,
    mut tx: Transaction,
) -> Result<Transaction, CryptoError> {
    tx.from = key.address();
    tx.signature = *key.sign_prehash(&tx.signing_hash())?.as_bytes();
    Ok(tx)
}

/// Build a signed call to the staking contract.
pub fn build_staking_transaction(
    key: &Secp256k1KeyPair,
    nonce: u64,
    call: &StakingCall,
    value: U256,
    gas_limit: u64,
) -> Result<Transaction, CryptoError> {
    let tx = Transaction {
        from: key.address(),
        to: Some(STAKING_CONTRACT_ADDRESS),
        value,
        nonce,
        gas_price: U256::zero(),
        gas_limit,
        data: call.encode(),
        signature: [0u8; 65],
    };
    sign_transaction(key, tx)
}

/// Submit a stake for `request.address` and wait for its inclusion.
///
/// Returns the block that carried the transaction. Fails with
/// [`StakingError::NotActivated`] if the transaction executed but the address
/// is still inactive in the post-state.
pub fn stake(
    chain: &dyn Blockchain,
    executor: &dyn StateExecutor,
    request: StakeRequest<'_>,
) -> StakingResult<SealedBlock> {
    let head = chain.head().ok_or(StakingError::NoHead)?;
    let nonce = executor
        .account(&head.state_root, &request.address)
        .map_err(StakingError::from_read)?
        .map(|account| account.nonce)
        .unwrap_or(0);

    let call = StakingCall::Stake {
        node_type: request.node_type.to_string(),
    };
    let tx = build_staking_transaction(
        request.key,
        nonce,
        &call,
        request.amount,
        request.gas_limit,
    )?;
    let tx_hash = tx.hash();

    let header = BlockHeader::child_of(
        &head,
        request.address,
        request.timestamp.max(head.timestamp),
    );
    let mut transition = executor.begin_transition(head.state_root, &header)?;
    let receipt = transition
        .apply(&tx)
        .map_err(|e| StakingError::TransactionFailed {
            tx_hash,
            reason: e.to_string(),
        })?;
    if !receipt.success {
        return Err(StakingError::TransactionFailed {
            tx_hash,
            reason: "execution reverted".to_string(),
        });
    }

    let active = transition
        .stake_entry(&request.address)
        .is_some_and(|entry| entry.active);
    if !active {
        return Err(StakingError::NotActivated(request.address));
    }

    let gas_used = transition.total_gas();
    let state_root = transition.commit()?;

    let mut pending = PendingBlock::new(header);
    pending.header.state_root = state_root;
    pending.header.gas_used = gas_used;
    pending.push(tx, receipt);
    let sealed = pending.seal();

    chain.write_block(sealed.clone())?;

    info!(
        "[da-01] {} {} staked {} as {} in block #{} ({})",
        request.account_label,
        address_to_hex(&request.address),
        request.amount,
        request.node_type,
        sealed.number(),
        hash_to_hex(&sealed.hash())
    );
    Ok(sealed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryChain, InMemoryState, WorldState};
    use crate::querier::ActiveSequencersQuerier;
    use shared_types::{AccountState, ETH};
    use std::sync::Arc;

    fn setup(balance: u128) -> (Arc<InMemoryChain>, InMemoryState, Secp256k1KeyPair) {
        let key = Secp256k1KeyPair::generate();
        let state = InMemoryState::new();
        let root = state.insert_genesis(WorldState::from_alloc(
            [(key.address(), AccountState::with_balance(U256::from(balance)))],
            [],
        ));
        let chain = Arc::new(InMemoryChain::with_genesis(BlockHeader::genesis(
            root, 30_000_000, 1000,
        )));
        (chain, state, key)
    }

    fn request(key: &Secp256k1KeyPair) -> StakeRequest<'_> {
        StakeRequest {
            node_type: "sequencer",
            address: key.address(),
            key,
            amount: U256::from(10 * ETH),
            gas_limit: 1_000_000,
            account_label: "sequencer",
            timestamp: 1002,
        }
    }

    #[test]
    fn test_stake_appends_block_and_activates() {
        let (chain, state, key) = setup(100 * ETH);

        let block = stake(chain.as_ref(), &state, request(&key)).unwrap();

        assert_eq!(block.number(), 1);
        assert_eq!(block.header().miner, key.address());
        assert_eq!(block.block().transactions.len(), 1);
        assert_eq!(chain.height(), 1);

        let querier = ActiveSequencersQuerier::new(chain, Arc::new(state));
        assert!(querier.contains(&key.address()).unwrap());
    }

    #[test]
    fn test_staking_transaction_recovers_to_sender() {
        let key = Secp256k1KeyPair::generate();
        let tx = build_staking_transaction(
            &key,
            0,
            &StakingCall::Unstake,
            U256::zero(),
            100_000,
        )
        .unwrap();
        let signature = shared_crypto::Secp256k1Signature::from_bytes(tx.signature);
        assert_eq!(tx.from, key.address());
        assert_eq!(
            signature.recover_address(&tx.signing_hash()).unwrap(),
            key.address()
        );
    }

    #[test]
    fn test_stake_without_balance_fails_and_leaves_chain() {
        let (chain, state, key) = setup(ETH);

        let result = stake(chain.as_ref(), &state, request(&key));

        assert!(matches!(
            result,
            Err(StakingError::TransactionFailed { .. })
        ));
        assert_eq!(chain.height(), 0);
    }
}
