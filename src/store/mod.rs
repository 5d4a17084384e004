//! Block Store
//!
//! Content-addressed storage for encoded DAG nodes. Blocks are keyed by their
//! ContentId, so re-putting identical content is a safe no-op.

pub mod memory;
pub mod persistence;

pub use memory::MemoryBlockStore;
pub use persistence::SledBlockStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;
use crate::tree::node::Node;
use crate::types::ContentId;
use tracing::info;

/// Block store interface
pub trait BlockStore {
    /// Store an encoded block under its identifier
    fn put_block(&self, id: &ContentId, block: &[u8]) -> Result<(), StoreError>;

    fn get(&self, id: &ContentId) -> Result<Option<Vec<u8>>, StoreError>;

    fn contains(&self, id: &ContentId) -> Result<bool, StoreError>;

    /// Number of distinct blocks held
    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Store a sealed node and return its identifier
    fn put(&self, node: &Node) -> Result<ContentId, StoreError> {
        let id = node.id();
        self.put_block(&id, node.block())?;
        Ok(id)
    }

    /// Flush pending writes (no-op for volatile stores)
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Open the block store described by the configuration
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn BlockStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory block store");
            Ok(Box::new(MemoryBlockStore::new()))
        }
        StoreBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                StoreError::Backend("sled store requires a directory path".to_string())
            })?;
            std::fs::create_dir_all(path)?;
            info!(path = %path.display(), "Using persistent block store");
            Ok(Box::new(SledBlockStore::new(path, config.sync_writes)?))
        }
    }
}
