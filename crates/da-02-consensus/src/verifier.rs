//! Header verification
//!
//! Every block, whether produced locally or read from the DA layer, goes
//! through the same checks: structure against the parent header, then the
//! producer's stake at the parent's state root.

use da_01_staking::{ActiveSequencersQuerier, Blockchain, StateTransition};
use shared_types::{address_to_hex, Address, BlockHeader};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{ConsensusError, ConsensusResult, HeaderError};
use crate::metrics;
use crate::ports::TimeSource;
use crate::validation::HeaderValidator;

/// Stake-gated header verifier.
pub struct HeaderVerifier {
    chain: Arc<dyn Blockchain>,
    querier: ActiveSequencersQuerier,
    time_source: Arc<dyn TimeSource>,
    max_timestamp_drift_secs: u64,
}

impl HeaderVerifier {
    pub fn new(
        chain: Arc<dyn Blockchain>,
        querier: ActiveSequencersQuerier,
        time_source: Arc<dyn TimeSource>,
        max_timestamp_drift_secs: u64,
    ) -> Self {
        Self {
            chain,
            querier,
            time_source,
            max_timestamp_drift_secs,
        }
    }

    /// Verify `header` against its parent in the local chain.
    pub fn verify_header(&self, header: &BlockHeader) -> ConsensusResult<()> {
        let parent = self.parent_of(header)?;
        self.verify_against(&parent, header)
    }

    /// Verify `header` against an explicit parent.
    pub fn verify_against(&self, parent: &BlockHeader, header: &BlockHeader) -> ConsensusResult<()> {
        HeaderValidator::validate(
            header,
            parent,
            self.time_source.now(),
            self.max_timestamp_drift_secs,
        )?;
        self.check_producer(parent, header)
    }

    /// Verify an ordered batch. Headers after the first must each extend the
    /// previous one; the first must extend a stored block.
    pub fn process_headers(&self, headers: &[BlockHeader]) -> ConsensusResult<()> {
        let mut previous: Option<&BlockHeader> = None;

        for (index, header) in headers.iter().enumerate() {
            let result = match previous {
                None => self.verify_header(header),
                Some(prev) if header.parent_hash != prev.hash() => {
                    Err(HeaderError::NotContiguous.into())
                }
                Some(prev) => self.verify_against(prev, header),
            };

            if let Err(err) = result {
                warn!(
                    "[da-02] Header batch rejected at index {} (block #{}): {}",
                    index, header.number, err
                );
                metrics::record_block_rejected(err.reason());
                return Err(ConsensusError::BatchRejected {
                    index,
                    number: header.number,
                    source: Box::new(err),
                });
            }
            previous = Some(header);
        }

        debug!("[da-02] Verified batch of {} headers", headers.len());
        Ok(())
    }

    /// Producer of `header`, once it passes the staking rule.
    pub fn get_block_creator(&self, header: &BlockHeader) -> ConsensusResult<Address> {
        let parent = self.parent_of(header)?;
        self.check_producer(&parent, header)?;
        Ok(header.miner)
    }

    /// Reject an executed transition that leaves its own producer inactive.
    pub fn pre_commit_state(
        &self,
        header: &BlockHeader,
        transition: &dyn StateTransition,
    ) -> ConsensusResult<()> {
        let active = transition
            .stake_entry(&header.miner)
            .is_some_and(|entry| entry.active);
        if !active {
            warn!(
                "[da-02] Block #{} deactivates its producer {}",
                header.number,
                address_to_hex(&header.miner)
            );
            return Err(ConsensusError::ProducerDeactivated(header.miner));
        }
        Ok(())
    }

    fn parent_of(&self, header: &BlockHeader) -> ConsensusResult<BlockHeader> {
        self.chain
            .header_by_hash(&header.parent_hash)
            .ok_or_else(|| HeaderError::UnknownParent(header.parent_hash).into())
    }

    fn check_producer(&self, parent: &BlockHeader, header: &BlockHeader) -> ConsensusResult<()> {
        if !self.querier.contains_at(&parent.state_root, &header.miner)? {
            return Err(ConsensusError::InvalidProducer(header.miner));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use da_01_staking::adapters::{InMemoryChain, InMemoryState, WorldState};
    use da_01_staking::{StakeEntry, StateExecutor};
    use shared_types::{PendingBlock, U256};

    const SEQUENCER: Address = [0x11; 20];
    const STRANGER: Address = [0x22; 20];

    struct FixedTime(u64);

    impl TimeSource for FixedTime {
        fn now(&self) -> u64 {
            self.0
        }
    }

    struct Fixture {
        chain: Arc<InMemoryChain>,
        state: InMemoryState,
        verifier: HeaderVerifier,
        genesis: BlockHeader,
    }

    fn fixture() -> Fixture {
        let state = InMemoryState::new();
        let root = state.insert_genesis(WorldState::from_alloc(
            [],
            [(SEQUENCER, StakeEntry::active(U256::from(10u64)))],
        ));
        let genesis = BlockHeader::genesis(root, 30_000_000, 1_000);
        let chain = Arc::new(InMemoryChain::with_genesis(genesis.clone()));
        let querier = ActiveSequencersQuerier::new(chain.clone(), Arc::new(state.clone()));
        let verifier = HeaderVerifier::new(chain.clone(), querier, Arc::new(FixedTime(2_000)), 15);
        Fixture {
            chain,
            state,
            verifier,
            genesis,
        }
    }

    /// Empty block by `miner` on top of `parent`, with a valid state root.
    fn empty_child(parent: &BlockHeader, miner: Address) -> BlockHeader {
        let mut header = BlockHeader::child_of(parent, miner, parent.timestamp + 2);
        header.state_root = parent.state_root;
        PendingBlock::new(header).seal().header().clone()
    }

    #[test]
    fn test_active_producer_passes() {
        let f = fixture();
        let header = empty_child(&f.genesis, SEQUENCER);
        assert!(f.verifier.verify_header(&header).is_ok());
        assert_eq!(f.verifier.get_block_creator(&header).unwrap(), SEQUENCER);
    }

    #[test]
    fn test_unstaked_producer_rejected() {
        let f = fixture();
        let header = empty_child(&f.genesis, STRANGER);
        assert!(matches!(
            f.verifier.verify_header(&header),
            Err(ConsensusError::InvalidProducer(addr)) if addr == STRANGER
        ));
        assert!(matches!(
            f.verifier.get_block_creator(&header),
            Err(ConsensusError::InvalidProducer(_))
        ));
    }

    #[test]
    fn test_unknown_parent_is_malformed() {
        let f = fixture();
        let mut header = empty_child(&f.genesis, SEQUENCER);
        header.parent_hash = [9u8; 32];
        assert!(matches!(
            f.verifier.verify_header(&header),
            Err(ConsensusError::MalformedHeader(HeaderError::UnknownParent(_)))
        ));
    }

    #[test]
    fn test_missing_parent_state_is_state_read() {
        let f = fixture();
        let header = empty_child(&f.genesis, SEQUENCER);
        f.state.forget(&f.genesis.state_root);
        assert!(matches!(
            f.verifier.verify_header(&header),
            Err(ConsensusError::StateRead(_))
        ));
    }

    #[test]
    fn test_process_headers_stops_at_first_failure() {
        let f = fixture();
        let h1 = empty_child(&f.genesis, SEQUENCER);
        let h2 = empty_child(&h1, STRANGER);
        let h3 = empty_child(&h2, SEQUENCER);

        let err = f
            .verifier
            .process_headers(&[h1.clone(), h2, h3])
            .unwrap_err();
        match err {
            ConsensusError::BatchRejected {
                index,
                number,
                source,
            } => {
                assert_eq!(index, 1);
                assert_eq!(number, 2);
                assert!(matches!(*source, ConsensusError::InvalidProducer(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(f.chain.height(), 0);

        assert!(f.verifier.process_headers(&[h1]).is_ok());
    }

    #[test]
    fn test_process_headers_requires_linkage() {
        let f = fixture();
        let h1 = empty_child(&f.genesis, SEQUENCER);
        let unrelated = empty_child(&f.genesis, SEQUENCER);

        let mut other = unrelated.clone();
        other.extra_data = b"x".to_vec();
        let err = f.verifier.process_headers(&[h1, other]).unwrap_err();
        assert!(matches!(
            err,
            ConsensusError::BatchRejected { index: 1, ref source, .. }
                if matches!(**source, ConsensusError::MalformedHeader(HeaderError::NotContiguous))
        ));
    }

    #[test]
    fn test_pre_commit_state_rejects_self_deactivation() {
        let f = fixture();
        let header = empty_child(&f.genesis, SEQUENCER);
        let transition = f
            .state
            .begin_transition(f.genesis.state_root, &header)
            .unwrap();
        assert!(f
            .verifier
            .pre_commit_state(&header, transition.as_ref())
            .is_ok());

        let stranger_header = empty_child(&f.genesis, STRANGER);
        let transition = f
            .state
            .begin_transition(f.genesis.state_root, &stranger_header)
            .unwrap();
        assert!(matches!(
            f.verifier
                .pre_commit_state(&stranger_header, transition.as_ref()),
            Err(ConsensusError::ProducerDeactivated(_))
        ));
    }
}
