//! Archive writer
//!
//! Output goes to a `.tmp` sibling first and is renamed into place only after
//! every block is written, so a failed run never leaves a partial archive.

use crate::archive::{ArchiveHeader, ARCHIVE_MAGIC, ID_LEN};
use crate::error::ArchiveError;
use crate::store::BlockStore;
use crate::tree::node::NodeBody;
use crate::types::ContentId;
use serde::Serialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// What was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub roots: Vec<ContentId>,
    pub blocks: usize,
    /// Archive file size in bytes
    pub bytes: u64,
}

/// Write every block reachable from `roots` to an archive at `path`
#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_archive(
    path: &Path,
    roots: &[ContentId],
    store: &dyn BlockStore,
) -> Result<ArchiveSummary, ArchiveError> {
    let tmp = temp_path(path);

    let result = write_blocks(&tmp, roots, store)
        .and_then(|stats| fs::rename(&tmp, path).map(|_| stats).map_err(ArchiveError::from));

    match result {
        Ok((blocks, bytes)) => {
            info!(blocks, bytes, "Archive written");
            Ok(ArchiveSummary {
                path: path.to_path_buf(),
                roots: roots.to_vec(),
                blocks,
                bytes,
            })
        }
        Err(err) => {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if tmp.exists() {
                    warn!(path = %tmp.display(), error = %cleanup, "Failed to remove partial archive");
                }
            }
            Err(err)
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("archive"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_blocks(
    path: &Path,
    roots: &[ContentId],
    store: &dyn BlockStore,
) -> Result<(usize, u64), ArchiveError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0u64;

    let header = bincode::serialize(&ArchiveHeader::new(roots.to_vec()))
        .map_err(|e| ArchiveError::Corrupt(format!("Failed to encode header: {}", e)))?;
    writer.write_all(&ARCHIVE_MAGIC)?;
    writer.write_all(&(header.len() as u64).to_le_bytes())?;
    writer.write_all(&header)?;
    written += ARCHIVE_MAGIC.len() as u64 + 8 + header.len() as u64;

    // Depth-first, pre-order: children pushed in reverse so the first link
    // is visited first.
    let mut seen: HashSet<ContentId> = HashSet::new();
    let mut stack: Vec<ContentId> = roots.iter().rev().copied().collect();
    let mut blocks = 0usize;

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }

        let block = store.get(&id)?.ok_or(ArchiveError::MissingBlock(id))?;
        writer.write_all(&(ID_LEN + block.len() as u64).to_le_bytes())?;
        writer.write_all(id.as_bytes())?;
        writer.write_all(&block)?;
        written += 8 + ID_LEN + block.len() as u64;
        blocks += 1;

        let body = NodeBody::decode(&block)?;
        stack.extend(body.links().iter().rev().map(|link| link.id));
    }

    writer.flush()?;
    writer.get_ref().sync_all()?;
    debug!(blocks, bytes = written, "Blocks written");
    Ok((blocks, written))
}
