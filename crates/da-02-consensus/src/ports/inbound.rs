//! Driving ports (Inbound API)

use async_trait::async_trait;
use da_01_staking::StateTransition;
use shared_types::{Address, Block, BlockHeader, SealedBlock};
use tokio_util::sync::CancellationToken;

use crate::domain::{ConsensusResult, SyncProgression};

/// Consensus interface the host node drives.
///
/// The verification methods are called by the block-import pipeline for every
/// block, whatever role the node runs. They are synchronous and may run
/// concurrently with the role task.
#[async_trait]
pub trait ConsensusEngine: Send + Sync {
    /// Verify producer and structure of a header against its stored parent.
    fn verify_header(&self, header: &BlockHeader) -> ConsensusResult<()>;

    /// Verify an ordered, contiguous batch. Stops at the first failure.
    fn process_headers(&self, headers: &[BlockHeader]) -> ConsensusResult<()>;

    /// Producer of `header`, once it passes the staking rule.
    fn get_block_creator(&self, header: &BlockHeader) -> ConsensusResult<Address>;

    /// Last check before an executed transition is committed.
    fn pre_commit_state(
        &self,
        header: &BlockHeader,
        transition: &dyn StateTransition,
    ) -> ConsensusResult<()>;

    /// Not used: headers are filled in by the sequencer.
    fn prepare(&self, header: &mut BlockHeader) -> ConsensusResult<()>;

    /// Not used: blocks are sealed by the sequencer.
    fn seal(&self, block: Block, cancel: CancellationToken) -> ConsensusResult<SealedBlock>;

    /// Always `None`; sync progress comes from the DA layer.
    fn get_sync_progression(&self) -> Option<SyncProgression>;

    /// No-op.
    fn initialize(&self) -> ConsensusResult<()>;

    /// Run the role: bootstrap if needed, then spawn the role task.
    async fn start(&self) -> ConsensusResult<()>;

    /// Signal the role task to stop. Idempotent.
    fn close(&self) -> ConsensusResult<()>;
}
