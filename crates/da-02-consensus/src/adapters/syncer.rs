//! Syncer for a node without peers

use async_trait::async_trait;
use parking_lot::RwLock;
use std::time::Duration;
use tracing::debug;

use crate::ports::Syncer;

/// Records the start request and does nothing else
#[derive(Default)]
pub struct StandaloneSyncer {
    started_with: RwLock<Option<Duration>>,
}

impl StandaloneSyncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeout passed to the last `start` call
    pub fn started_with(&self) -> Option<Duration> {
        *self.started_with.read()
    }
}

#[async_trait]
impl Syncer for StandaloneSyncer {
    async fn start(&self, timeout: Duration) -> Result<(), String> {
        debug!("[da-02] Standalone syncer started (timeout {:?})", timeout);
        *self.started_with.write() = Some(timeout);
        Ok(())
    }
}
