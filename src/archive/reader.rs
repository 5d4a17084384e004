//! Archive reader, verification and extraction

use crate::archive::{ArchiveHeader, ARCHIVE_MAGIC, ARCHIVE_VERSION, ID_LEN};
use crate::error::ArchiveError;
use crate::tree::hasher;
use crate::tree::node::{NodeBody, NodeKind};
use crate::types::ContentId;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Upper bound on the encoded header size
const MAX_HEADER_LEN: u64 = 64 << 20;

/// One block section as read from an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub id: ContentId,
    /// Offset of the block bytes within the archive
    pub offset: u64,
    pub block: Vec<u8>,
}

impl BlockRecord {
    /// Whether the block hashes to the id it was written under
    pub fn is_valid(&self) -> bool {
        hasher::verify_block(&self.id, &self.block)
    }
}

/// Sequential reader over block sections
pub struct ArchiveReader<R> {
    reader: R,
    header: ArchiveHeader,
    offset: u64,
    done: bool,
}

impl<R: Read> ArchiveReader<R> {
    /// Read and check the magic and header
    pub fn new(mut reader: R) -> Result<Self, ArchiveError> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => ArchiveError::BadMagic,
            _ => ArchiveError::Io(e),
        })?;
        if magic != ARCHIVE_MAGIC {
            return Err(ArchiveError::BadMagic);
        }

        let header_len = read_u64(&mut reader)?
            .ok_or_else(|| ArchiveError::Corrupt("missing header".to_string()))?;
        if header_len > MAX_HEADER_LEN {
            return Err(ArchiveError::Corrupt(format!(
                "header length {} exceeds limit",
                header_len
            )));
        }
        let bytes = read_exact_len(&mut reader, header_len, "header")?;
        let header: ArchiveHeader = bincode::deserialize(&bytes)
            .map_err(|e| ArchiveError::Corrupt(format!("undecodable header: {}", e)))?;
        if header.version != ARCHIVE_VERSION {
            return Err(ArchiveError::UnsupportedVersion(header.version));
        }

        Ok(Self {
            reader,
            header,
            offset: ARCHIVE_MAGIC.len() as u64 + 8 + header_len,
            done: false,
        })
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    pub fn roots(&self) -> &[ContentId] {
        &self.header.roots
    }

    /// Current byte offset into the archive
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next block section; `None` at a clean end of archive
    pub fn next_block(&mut self) -> Result<Option<BlockRecord>, ArchiveError> {
        let Some(section_len) = read_u64(&mut self.reader)? else {
            return Ok(None);
        };
        if section_len < ID_LEN {
            return Err(ArchiveError::Corrupt(format!(
                "section at offset {} is shorter than an id",
                self.offset
            )));
        }

        let mut id = [0u8; 32];
        self.reader.read_exact(&mut id).map_err(|e| truncated(e, "block id"))?;
        let block = read_exact_len(&mut self.reader, section_len - ID_LEN, "block")?;

        let record = BlockRecord {
            id: ContentId::from_bytes(id),
            offset: self.offset + 8 + ID_LEN,
            block,
        };
        self.offset += 8 + section_len;
        Ok(Some(record))
    }
}

impl<R: Read> Iterator for ArchiveReader<R> {
    type Item = Result<BlockRecord, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_block() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Read a little-endian u64; `None` if the stream ends before the first byte
fn read_u64<R: Read>(reader: &mut R) -> Result<Option<u64>, ArchiveError> {
    let mut buf = [0u8; 8];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(ArchiveError::Corrupt("truncated section length".to_string()));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ArchiveError::Io(e)),
        }
    }
    Ok(Some(u64::from_le_bytes(buf)))
}

/// Read exactly `len` bytes without trusting `len` for preallocation
fn read_exact_len<R: Read>(reader: &mut R, len: u64, what: &str) -> Result<Vec<u8>, ArchiveError> {
    let mut buf = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        return Err(ArchiveError::Corrupt(format!("truncated {}", what)));
    }
    Ok(buf)
}

fn truncated(err: io::Error, what: &str) -> ArchiveError {
    match err.kind() {
        ErrorKind::UnexpectedEof => ArchiveError::Corrupt(format!("truncated {}", what)),
        _ => ArchiveError::Io(err),
    }
}

#[derive(Debug, Clone, Copy)]
struct BlockLocation {
    offset: u64,
    len: u64,
}

/// Archive opened with an in-memory index of block offsets
///
/// Only the index is held in memory; block bytes are read on demand.
pub struct IndexedArchive {
    file: BufReader<File>,
    header: ArchiveHeader,
    index: HashMap<ContentId, BlockLocation>,
    sections: usize,
    duplicates: usize,
    corrupt: Vec<ContentId>,
}

impl IndexedArchive {
    /// Scan the archive once, hashing every block
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path)?;
        let mut reader = ArchiveReader::new(BufReader::new(file))?;

        let mut index = HashMap::new();
        let mut sections = 0;
        let mut duplicates = 0;
        let mut corrupt = Vec::new();

        // The first intact copy of a block wins; `corrupt` keeps only ids
        // with no intact copy anywhere in the file.
        while let Some(record) = reader.next_block()? {
            sections += 1;
            let valid = record.is_valid();
            if !valid {
                warn!(id = %record.id, offset = record.offset, "Block hash mismatch");
            }
            let location = BlockLocation {
                offset: record.offset,
                len: record.block.len() as u64,
            };
            match index.entry(record.id) {
                Entry::Vacant(slot) => {
                    slot.insert(location);
                    if !valid {
                        corrupt.push(record.id);
                    }
                }
                Entry::Occupied(mut slot) => {
                    duplicates += 1;
                    if valid && corrupt.contains(&record.id) {
                        slot.insert(location);
                        corrupt.retain(|id| *id != record.id);
                    }
                }
            }
        }

        let header = reader.header().clone();
        debug!(sections, distinct = index.len(), "Indexed archive");
        Ok(Self {
            file: reader.into_inner(),
            header,
            index,
            sections,
            duplicates,
            corrupt,
        })
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    pub fn roots(&self) -> &[ContentId] {
        &self.header.roots
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.index.contains_key(id)
    }

    /// Number of distinct blocks
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Read a block and check it against its id
    pub fn get(&mut self, id: &ContentId) -> Result<Vec<u8>, ArchiveError> {
        let location = *self.index.get(id).ok_or(ArchiveError::MissingBlock(*id))?;
        self.file.seek(SeekFrom::Start(location.offset))?;
        let block = read_exact_len(&mut self.file, location.len, "block")?;
        if !hasher::verify_block(id, &block) {
            return Err(ArchiveError::Corrupt(format!("block {} fails its hash", id)));
        }
        Ok(block)
    }

    /// Read and decode a block
    pub fn node(&mut self, id: &ContentId) -> Result<NodeBody, ArchiveError> {
        let block = self.get(id)?;
        Ok(NodeBody::decode(&block)?)
    }

    /// Stream the file data under `id` (leaf bytes in link order) to `out`
    pub fn write_data<W: Write>(&mut self, id: &ContentId, out: &mut W) -> Result<u64, ArchiveError> {
        match self.node(id)? {
            NodeBody::Raw(data) => {
                out.write_all(&data)?;
                Ok(data.len() as u64)
            }
            NodeBody::File { links, .. } => {
                let mut written = 0;
                for link in links {
                    written += self.write_data(&link.id, out)?;
                }
                Ok(written)
            }
            NodeBody::Directory { .. } => Err(ArchiveError::Corrupt(format!(
                "directory {} linked as file data",
                id
            ))),
        }
    }
}

/// Outcome of checking an archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub roots: Vec<ContentId>,
    /// Block sections in the file
    pub blocks: usize,
    pub duplicate_blocks: usize,
    /// Blocks whose bytes do not hash to their id, or cannot be decoded
    pub corrupt_blocks: Vec<ContentId>,
    /// Links pointing at blocks absent from the archive
    pub missing_blocks: Vec<ContentId>,
    /// Parents whose recorded size disagrees with their links or children
    pub size_mismatches: Vec<ContentId>,
    /// Distinct blocks not reachable from any root
    pub unreachable_blocks: usize,
    /// Bytes of file data under the roots
    pub total_size: u64,
}

impl VerifyReport {
    pub fn is_valid(&self) -> bool {
        !self.roots.is_empty()
            && self.corrupt_blocks.is_empty()
            && self.missing_blocks.is_empty()
            && self.size_mismatches.is_empty()
    }
}

/// Check every block hash, link reachability and size accounting
#[instrument(skip_all, fields(path = %path.display()))]
pub fn verify_archive(path: &Path) -> Result<VerifyReport, ArchiveError> {
    let mut archive = IndexedArchive::open(path)?;
    let corrupt: HashSet<ContentId> = archive.corrupt.iter().copied().collect();

    let mut report = VerifyReport {
        roots: archive.roots().to_vec(),
        blocks: archive.sections,
        duplicate_blocks: archive.duplicates,
        corrupt_blocks: archive.corrupt.clone(),
        ..VerifyReport::default()
    };

    let mut visited: HashSet<ContentId> = HashSet::new();
    let mut stack: Vec<(ContentId, Option<u64>)> =
        archive.roots().iter().rev().map(|id| (*id, None)).collect();

    while let Some((id, expected_size)) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        if !archive.contains(&id) {
            report.missing_blocks.push(id);
            continue;
        }
        if corrupt.contains(&id) {
            continue;
        }

        let body = match archive.node(&id) {
            Ok(body) => body,
            Err(ArchiveError::Dag(_)) => {
                report.corrupt_blocks.push(id);
                continue;
            }
            Err(e) => return Err(e),
        };

        let linked: u64 = body.links().iter().map(|l| l.size).sum();
        let mismatched = expected_size.is_some_and(|size| size != body.size())
            || (body.kind() != NodeKind::Raw && linked != body.size());
        if mismatched {
            report.size_mismatches.push(id);
        }

        stack.extend(body.links().iter().rev().map(|l| (l.id, Some(l.size))));
    }

    for root in archive.roots().to_vec() {
        if corrupt.contains(&root) || !archive.contains(&root) {
            continue;
        }
        if let Ok(body) = archive.node(&root) {
            report.total_size += body.size();
        }
    }

    report.unreachable_blocks = archive
        .index
        .keys()
        .filter(|id| !visited.contains(id))
        .count();

    info!(
        blocks = report.blocks,
        corrupt = report.corrupt_blocks.len(),
        missing = report.missing_blocks.len(),
        valid = report.is_valid(),
        "Archive verified"
    );
    Ok(report)
}

/// One named entry under an archive root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub name: String,
    pub id: ContentId,
    pub kind: NodeKind,
    pub size: u64,
    /// Links held by the entry's own node
    pub links: usize,
}

/// Named entries of every root directory, in link order
pub fn list_entries(path: &Path) -> Result<Vec<EntryInfo>, ArchiveError> {
    let mut archive = IndexedArchive::open(path)?;
    let mut entries = Vec::new();

    for root in archive.roots().to_vec() {
        let body = archive.node(&root)?;
        for link in body.links() {
            let child = archive.node(&link.id)?;
            entries.push(EntryInfo {
                name: link.name.clone().unwrap_or_else(|| link.id.to_hex()),
                id: link.id,
                kind: child.kind(),
                size: link.size,
                links: child.links().len(),
            });
        }
    }
    Ok(entries)
}

/// What extraction produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Rebuild the entries of every root under `dest`
///
/// File-kind entries become one file holding their concatenated data;
/// directory entries become directories.
#[instrument(skip_all, fields(archive = %path.display(), dest = %dest.display()))]
pub fn extract_archive(path: &Path, dest: &Path) -> Result<ExtractReport, ArchiveError> {
    let mut archive = IndexedArchive::open(path)?;
    if !archive.corrupt.is_empty() {
        return Err(ArchiveError::Corrupt(format!(
            "{} block(s) fail their hash",
            archive.corrupt.len()
        )));
    }

    fs::create_dir_all(dest)?;
    let mut report = ExtractReport::default();
    for root in archive.roots().to_vec() {
        extract_directory(&mut archive, &root, dest, &mut report)?;
    }

    info!(
        files = report.files,
        directories = report.directories,
        bytes = report.bytes,
        "Archive extracted"
    );
    Ok(report)
}

fn extract_directory(
    archive: &mut IndexedArchive,
    id: &ContentId,
    dir: &Path,
    report: &mut ExtractReport,
) -> Result<(), ArchiveError> {
    let body = archive.node(id)?;
    let NodeBody::Directory { links, .. } = body else {
        return Err(ArchiveError::Corrupt(format!("root {} is not a directory", id)));
    };

    for link in links {
        let name = link
            .name
            .as_deref()
            .ok_or_else(|| ArchiveError::Corrupt(format!("unnamed entry {}", link.id)))?;
        let target = safe_join(dir, name)?;

        if archive.node(&link.id)?.kind() == NodeKind::Directory {
            fs::create_dir_all(&target)?;
            report.directories += 1;
            extract_directory(archive, &link.id, &target, report)?;
        } else {
            let mut out = BufWriter::new(File::create(&target)?);
            let written = archive.write_data(&link.id, &mut out)?;
            out.flush()?;
            debug!(path = %target.display(), bytes = written, "Extracted file");
            report.files += 1;
            report.bytes += written;
        }
    }
    Ok(())
}

/// Join an entry name onto `dir`, refusing anything but a single plain name
fn safe_join(dir: &Path, name: &str) -> Result<PathBuf, ArchiveError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if !name.contains(['/', '\\']) => Ok(dir.join(part)),
        _ => Err(ArchiveError::Corrupt(format!("unsafe entry name {:?}", name))),
    }
}
