//! Sequencer bootstrap
//!
//! Gets a fresh sequencer to a funded, staked state before it produces:
//!
//! 1. If the account has no balance, a one-shot [`BootstrapFunder`] appends a
//!    block that sets the balance directly.
//! 2. If the account is not an active sequencer, a staking transaction is
//!    executed in its own block and the stake is confirmed afterwards.
//!
//! Running it again on a funded, staked node appends nothing.

use da_01_staking::{
    stake, ActiveSequencersQuerier, Blockchain, DirectStateWriter, StakeRequest, StateExecutor,
};
use shared_crypto::Secp256k1KeyPair;
use shared_types::{address_to_hex, AccountState, Address, BlockHeader, PendingBlock, U256};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::BootstrapConfig;
use crate::domain::{ConsensusError, ConsensusResult, Role};

/// One-shot capability to write a balance without a transaction.
///
/// Consumed by [`BootstrapFunder::fund`]. Only the bootstrap step ever holds
/// one; the production loop has no access to it.
pub struct BootstrapFunder {
    writer: Arc<dyn DirectStateWriter>,
}

impl BootstrapFunder {
    pub fn new(writer: Arc<dyn DirectStateWriter>) -> Self {
        Self { writer }
    }

    /// Append a block on top of the head that sets `address`'s balance to
    /// exactly `amount`.
    pub fn fund(
        self,
        chain: &dyn Blockchain,
        executor: &dyn StateExecutor,
        address: Address,
        amount: U256,
        timestamp: u64,
    ) -> ConsensusResult<u64> {
        error!(
            "[da-02] Automatic sequencer balance deposit is active for {}; disable bootstrap funding outside development",
            address_to_hex(&address)
        );

        let head = chain
            .head()
            .ok_or_else(|| ConsensusError::Funding("chain has no head".to_string()))?;
        let nonce = executor
            .account(&head.state_root, &address)?
            .map(|account| account.nonce)
            .unwrap_or(0);

        let state_root = self
            .writer
            .set_account_directly(
                head.state_root,
                address,
                AccountState {
                    balance: amount,
                    nonce,
                },
            )
            .map_err(|e| ConsensusError::Funding(e.to_string()))?;

        let mut pending = PendingBlock::new(BlockHeader::child_of(
            &head,
            address,
            timestamp.max(head.timestamp),
        ));
        pending.header.state_root = state_root;
        let sealed = pending.seal();
        let number = sealed.number();

        chain
            .write_block(sealed)
            .map_err(|e| ConsensusError::Funding(e.to_string()))?;

        info!(
            "[da-02] Funded {} with {} wei in block #{}",
            address_to_hex(&address),
            amount,
            number
        );
        Ok(number)
    }
}

/// What a bootstrap run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// A funding block was appended.
    pub funded: bool,
    /// A staking block was appended.
    pub staked: bool,
}

/// Collaborators of a bootstrap run.
pub struct Bootstrap<'a> {
    pub chain: &'a dyn Blockchain,
    pub executor: &'a dyn StateExecutor,
    pub querier: &'a ActiveSequencersQuerier,
    pub identity: &'a Secp256k1KeyPair,
    pub config: &'a BootstrapConfig,
    pub now: u64,
}

impl Bootstrap<'_> {
    /// Fund and stake as needed. Any failure is fatal to sequencer start.
    pub fn run(&self, funder: Option<BootstrapFunder>) -> ConsensusResult<BootstrapReport> {
        let address = self.identity.address();
        let mut report = BootstrapReport::default();

        let head = self
            .chain
            .head()
            .ok_or_else(|| ConsensusError::StateRead("chain has no head".to_string()))?;
        let balance = self
            .executor
            .account(&head.state_root, &address)?
            .map(|account| account.balance)
            .unwrap_or_default();

        if balance.is_zero() {
            match funder {
                Some(funder) => {
                    funder.fund(
                        self.chain,
                        self.executor,
                        address,
                        self.config.funding_amount,
                        self.now,
                    )?;
                    report.funded = true;
                }
                None => warn!(
                    "[da-02] {} has no balance and bootstrap funding is disabled",
                    address_to_hex(&address)
                ),
            }
        }

        if self.querier.contains(&address)? {
            info!(
                "[da-02] {} is already an active sequencer",
                address_to_hex(&address)
            );
            return Ok(report);
        }

        stake(
            self.chain,
            self.executor,
            StakeRequest {
                node_type: Role::Sequencer.as_str(),
                address,
                key: self.identity,
                amount: self.config.stake_amount,
                gas_limit: self.config.stake_gas_limit,
                account_label: Role::Sequencer.as_str(),
                timestamp: self.now,
            },
        )?;

        if !self.querier.contains(&address)? {
            return Err(ConsensusError::StakingTx(format!(
                "{} is not active after staking",
                address_to_hex(&address)
            )));
        }
        report.staked = true;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use da_01_staking::adapters::{InMemoryChain, InMemoryState, WorldState};
    use da_01_staking::StakeEntry;
    use shared_types::ETH;

    struct Fixture {
        chain: Arc<InMemoryChain>,
        state: InMemoryState,
        querier: ActiveSequencersQuerier,
        key: Secp256k1KeyPair,
        config: BootstrapConfig,
    }

    fn fixture(genesis: impl FnOnce(Address) -> WorldState) -> Fixture {
        let key = Secp256k1KeyPair::generate();
        let state = InMemoryState::new();
        let root = state.insert_genesis(genesis(key.address()));
        let chain = Arc::new(InMemoryChain::with_genesis(BlockHeader::genesis(
            root, 30_000_000, 1_000,
        )));
        let querier = ActiveSequencersQuerier::new(chain.clone(), Arc::new(state.clone()));
        Fixture {
            chain,
            state,
            querier,
            key,
            config: BootstrapConfig::default(),
        }
    }

    fn bootstrap(f: &Fixture) -> Bootstrap<'_> {
        Bootstrap {
            chain: f.chain.as_ref(),
            executor: &f.state,
            querier: &f.querier,
            identity: &f.key,
            config: &f.config,
            now: 1_002,
        }
    }

    #[test]
    fn test_fresh_node_is_funded_then_staked() {
        let f = fixture(|_| WorldState::default());
        let funder = BootstrapFunder::new(Arc::new(f.state.clone()));

        let report = bootstrap(&f).run(Some(funder)).unwrap();

        assert_eq!(
            report,
            BootstrapReport {
                funded: true,
                staked: true
            }
        );
        assert_eq!(f.chain.height(), 2);

        let funding = f.chain.block_by_number(1).unwrap();
        let funded = f
            .state
            .account(&funding.header().state_root, &f.key.address())
            .unwrap()
            .unwrap();
        assert_eq!(funded.balance, f.config.funding_amount);
        assert!(f.querier.contains(&f.key.address()).unwrap());
    }

    #[test]
    fn test_staked_node_is_noop() {
        let f = fixture(|address| {
            WorldState::from_alloc(
                [(address, AccountState::with_balance(U256::from(ETH)))],
                [(address, StakeEntry::active(U256::from(10 * ETH)))],
            )
        });
        let funder = BootstrapFunder::new(Arc::new(f.state.clone()));

        let report = bootstrap(&f).run(Some(funder)).unwrap();

        assert_eq!(report, BootstrapReport::default());
        assert_eq!(f.chain.height(), 0);
    }

    #[test]
    fn test_second_run_appends_nothing() {
        let f = fixture(|_| WorldState::default());
        bootstrap(&f)
            .run(Some(BootstrapFunder::new(Arc::new(f.state.clone()))))
            .unwrap();
        let height = f.chain.height();

        let report = bootstrap(&f).run(None).unwrap();
        assert_eq!(report, BootstrapReport::default());
        assert_eq!(f.chain.height(), height);
    }

    #[test]
    fn test_unfunded_without_funder_fails_staking() {
        let f = fixture(|_| WorldState::default());

        let result = bootstrap(&f).run(None);

        assert!(matches!(result, Err(ConsensusError::StakingTx(_))));
        assert_eq!(f.chain.height(), 0);
    }

    #[test]
    fn test_funded_unstaked_node_only_stakes() {
        let f = fixture(|address| {
            WorldState::from_alloc(
                [(address, AccountState::with_balance(U256::from(50 * ETH)))],
                [],
            )
        });

        let report = bootstrap(&f).run(None).unwrap();

        assert_eq!(
            report,
            BootstrapReport {
                funded: false,
                staked: true
            }
        );
        assert_eq!(f.chain.height(), 1);
    }
}
