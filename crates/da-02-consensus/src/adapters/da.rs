//! In-memory DA layer
//!
//! An ordered broadcast log. Every connected client sees the blocks published
//! after it connected, in publication order.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Block, SealedBlock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use crate::domain::DaError;
use crate::ports::{DaClient, DaConnector};

const CHANNEL_CAPACITY: usize = 1024;

struct DaHub {
    published: RwLock<Vec<Block>>,
    sender: broadcast::Sender<Block>,
    available: AtomicBool,
    endpoints: RwLock<Vec<String>>,
}

/// In-memory DA network shared by every node of a test or dev setup
#[derive(Clone)]
pub struct InMemoryDaLayer {
    hub: Arc<DaHub>,
}

impl InMemoryDaLayer {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            hub: Arc::new(DaHub {
                published: RwLock::new(Vec::new()),
                sender,
                available: AtomicBool::new(true),
                endpoints: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Publish a block directly, bypassing any node.
    pub fn publish(&self, block: Block) {
        self.hub.published.write().push(block.clone());
        let _ = self.hub.sender.send(block);
    }

    /// Every block published so far
    pub fn published(&self) -> Vec<Block> {
        self.hub.published.read().clone()
    }

    /// Make submissions and reads fail while `false`
    pub fn set_available(&self, available: bool) {
        self.hub.available.store(available, Ordering::SeqCst);
    }

    /// Endpoints clients connected to
    pub fn endpoints(&self) -> Vec<String> {
        self.hub.endpoints.read().clone()
    }

    fn is_available(&self) -> bool {
        self.hub.available.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryDaLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl DaConnector for InMemoryDaLayer {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn DaClient>, DaError> {
        self.hub.endpoints.write().push(endpoint.to_string());
        Ok(Arc::new(InMemoryDaClient {
            layer: self.clone(),
            receiver: Mutex::new(self.hub.sender.subscribe()),
        }))
    }
}

/// Client of an [`InMemoryDaLayer`]
pub struct InMemoryDaClient {
    layer: InMemoryDaLayer,
    receiver: Mutex<broadcast::Receiver<Block>>,
}

#[async_trait]
impl DaClient for InMemoryDaClient {
    async fn submit_block(&self, block: &SealedBlock) -> Result<(), DaError> {
        if !self.layer.is_available() {
            return Err(DaError::Unavailable("DA layer is down".to_string()));
        }
        self.layer.publish(block.block().clone());
        Ok(())
    }

    async fn next_block(&self) -> Result<Option<Block>, DaError> {
        if !self.layer.is_available() {
            return Err(DaError::Unavailable("DA layer is down".to_string()));
        }
        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Ok(block) => Ok(Some(block)),
            Err(broadcast::error::RecvError::Closed) => Ok(None),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Err(DaError::Unavailable(
                format!("client lagged behind by {} blocks", skipped),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{BlockHeader, PendingBlock, ZERO_HASH};

    fn sealed(number: u64) -> SealedBlock {
        let mut header = BlockHeader::genesis(ZERO_HASH, 30_000_000, 1000);
        header.number = number;
        PendingBlock::new(header).seal()
    }

    #[tokio::test]
    async fn test_clients_see_blocks_in_order() {
        let layer = InMemoryDaLayer::new();
        let producer = layer.connect("ws://da/v1/json-rpc").unwrap();
        let consumer = layer.connect("ws://da/v1/json-rpc").unwrap();

        producer.submit_block(&sealed(1)).await.unwrap();
        producer.submit_block(&sealed(2)).await.unwrap();

        assert_eq!(consumer.next_block().await.unwrap().unwrap().number(), 1);
        assert_eq!(consumer.next_block().await.unwrap().unwrap().number(), 2);
        assert_eq!(layer.published().len(), 2);
        assert_eq!(layer.endpoints().len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_layer_fails() {
        let layer = InMemoryDaLayer::new();
        let client = layer.connect("ws://da/v1/json-rpc").unwrap();
        layer.set_available(false);

        assert!(matches!(
            client.submit_block(&sealed(1)).await,
            Err(DaError::Unavailable(_))
        ));
        assert!(client.next_block().await.is_err());
        assert!(layer.published().is_empty());
    }
}
