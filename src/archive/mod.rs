//! Portable block archive
//!
//! Layout:
//!
//! ```text
//! magic "DAGPCAR1"
//! u64 LE header length | bincode(ArchiveHeader)
//! repeated: u64 LE section length | 32-byte ContentId | block bytes
//! ```
//!
//! The section length covers the id and the block. Blocks appear once each,
//! depth-first from the roots, parents before their children.

pub mod reader;
pub mod writer;

pub use reader::{
    extract_archive, list_entries, verify_archive, ArchiveReader, BlockRecord, EntryInfo,
    ExtractReport, IndexedArchive, VerifyReport,
};
pub use writer::{write_archive, ArchiveSummary};

use crate::types::ContentId;
use serde::{Deserialize, Serialize};

pub const ARCHIVE_MAGIC: [u8; 8] = *b"DAGPCAR1";
pub const ARCHIVE_VERSION: u32 = 1;

/// Bytes taken by the identifier at the front of every section
pub const ID_LEN: u64 = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveHeader {
    pub version: u32,
    pub roots: Vec<ContentId>,
}

impl ArchiveHeader {
    pub fn new(roots: Vec<ContentId>) -> Self {
        Self {
            version: ARCHIVE_VERSION,
            roots,
        }
    }
}
