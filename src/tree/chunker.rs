//! Fixed-size leaf chunker for splitting a byte stream into chunks.

use crate::error::DagError;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::iter::FusedIterator;
use std::path::Path;

/// A contiguous byte range of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position within the file
    pub index: u64,
    /// Byte offset within the file
    pub offset: u64,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Upper bound on the buffer reserved before a chunk is read
const MAX_PREALLOC: usize = 1 << 20;

/// Lazy chunk sequence over a reader
///
/// Every chunk except the last holds exactly `chunk_size` bytes, even when
/// the reader hands back short reads. An empty source yields no chunks. A
/// read error is yielded once and the sequence ends.
pub struct Chunker<R> {
    reader: R,
    chunk_size: usize,
    next_index: u64,
    offset: u64,
    done: bool,
}

impl<R: Read> Chunker<R> {
    /// `chunk_size` must be non-zero; configuration validation guarantees it.
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            next_index: 0,
            offset: 0,
            done: false,
        }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl Chunker<BufReader<File>> {
    /// Open a file for chunking
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self, DagError> {
        let file = File::open(path).map_err(|e| DagError::io(path, e))?;
        Ok(Self::new(BufReader::new(file), chunk_size))
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // Capacity is capped so an oversized chunk_size over a short source
        // only costs what is actually read.
        let mut buf = Vec::with_capacity(self.chunk_size.min(MAX_PREALLOC));
        let limit = u64::try_from(self.chunk_size).unwrap_or(u64::MAX);
        if let Err(e) = (&mut self.reader).take(limit).read_to_end(&mut buf) {
            self.done = true;
            return Some(Err(e));
        }

        let filled = buf.len();
        if filled == 0 {
            self.done = true;
            return None;
        }

        if filled < self.chunk_size {
            // Short fill only happens at end of stream.
            self.done = true;
        }

        let chunk = Chunk {
            index: self.next_index,
            offset: self.offset,
            data: buf,
        };
        self.next_index += 1;
        self.offset += filled as u64;
        Some(Ok(chunk))
    }
}

impl<R: Read> FusedIterator for Chunker<R> {}
