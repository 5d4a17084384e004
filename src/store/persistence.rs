//! Persistence layer for the block store

use crate::error::StoreError;
use crate::store::BlockStore;
use crate::types::ContentId;
use std::path::Path;

/// Sled-based implementation of BlockStore
///
/// Keys are the raw 32-byte ContentIds; values are encoded node blocks.
pub struct SledBlockStore {
    db: sled::Db,
    sync_writes: bool,
}

impl SledBlockStore {
    /// Open (or create) a sled database at the given directory
    ///
    /// With `sync_writes` every put is flushed before returning.
    pub fn new<P: AsRef<Path>>(path: P, sync_writes: bool) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| {
            StoreError::Backend(format!("Failed to open sled database: {}", e))
        })?;
        Ok(Self { db, sync_writes })
    }
}

impl BlockStore for SledBlockStore {
    fn put_block(&self, id: &ContentId, block: &[u8]) -> Result<(), StoreError> {
        let key = id.as_bytes().as_slice();
        if self.db.contains_key(key)? {
            return Ok(());
        }

        self.db.insert(key, block).map_err(|e| {
            StoreError::Backend(format!("Failed to put block {}: {}", id, e))
        })?;

        if self.sync_writes {
            self.db.flush()?;
        }
        Ok(())
    }

    fn get(&self, id: &ContentId) -> Result<Option<Vec<u8>>, StoreError> {
        let value = self.db.get(id.as_bytes().as_slice()).map_err(|e| {
            StoreError::Backend(format!("Failed to get block {}: {}", id, e))
        })?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn contains(&self, id: &ContentId) -> Result<bool, StoreError> {
        Ok(self.db.contains_key(id.as_bytes().as_slice())?)
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.db.len())
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().map_err(|e| {
            StoreError::Backend(format!("Failed to flush database: {}", e))
        })?;
        Ok(())
    }
}
