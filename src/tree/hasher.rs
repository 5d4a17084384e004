//! Content identifier computation using BLAKE3

use crate::types::ContentId;
use blake3::Hasher;

/// Compute the ContentId of an encoded node block
///
/// ContentId = hash(block)
///
/// The block already carries the node's kind tag, so a leaf and a parent can
/// never share an identifier even when their payload bytes coincide.
pub fn compute_content_id(block: &[u8]) -> ContentId {
    let mut hasher = Hasher::new();
    hasher.update(block);
    ContentId::from_bytes(*hasher.finalize().as_bytes())
}

/// Check a block against the identifier it was stored under
pub fn verify_block(id: &ContentId, block: &[u8]) -> bool {
    compute_content_id(block) == *id
}
