//! Volatile block store backed by a hash map

use crate::error::StoreError;
use crate::store::BlockStore;
use crate::types::ContentId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory implementation of BlockStore
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<ContentId, Vec<u8>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes held across all blocks
    pub fn total_bytes(&self) -> u64 {
        self.blocks.read().values().map(|b| b.len() as u64).sum()
    }
}

impl BlockStore for MemoryBlockStore {
    fn put_block(&self, id: &ContentId, block: &[u8]) -> Result<(), StoreError> {
        let mut blocks = self.blocks.write();
        if !blocks.contains_key(id) {
            blocks.insert(*id, block.to_vec());
        }
        Ok(())
    }

    fn get(&self, id: &ContentId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blocks.read().get(id).cloned())
    }

    fn contains(&self, id: &ContentId) -> Result<bool, StoreError> {
        Ok(self.blocks.read().contains_key(id))
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.blocks.read().len())
    }
}
