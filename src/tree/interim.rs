//! Interim assembler: chunking and packing for a single file
//!
//! Leaves accumulate until their bytes reach the breakpoint, at which point
//! they are reduced to one interim node and dropped from memory. Files no
//! larger than the breakpoint are never split.

use crate::audit::AuditNode;
use crate::error::DagError;
use crate::progress::Progress;
use crate::store::BlockStore;
use crate::tree::chunker::{Chunk, Chunker};
use crate::tree::node::{Node, NodeHandle};
use crate::tree::packer::Packer;
use crate::tree::walker::FileEntry;
use tracing::{debug, instrument, trace};

/// Shared parameters for one build
#[derive(Clone, Copy)]
pub struct Assembly<'a> {
    pub packer: Packer,
    pub store: &'a dyn BlockStore,
    pub chunk_size: usize,
    pub breakpoint: u64,
}

/// Top-level children of one file, ready for reduction into its root
#[derive(Debug, Clone)]
pub struct FileOutput {
    pub children: Vec<NodeHandle>,
    pub interims: usize,
    pub leaves: usize,
    pub size: u64,
    /// Audit entries matching `children`
    pub audit: Vec<AuditNode>,
}

/// Per-file accumulator
pub struct InterimAssembler<'a> {
    ctx: Assembly<'a>,
    needs_split: bool,
    pending: Vec<NodeHandle>,
    pending_audit: Vec<AuditNode>,
    running: u64,
    children: Vec<NodeHandle>,
    audit: Vec<AuditNode>,
    interims: usize,
    leaves: usize,
    size: u64,
}

impl<'a> InterimAssembler<'a> {
    /// `file_size` decides once whether interim splitting applies at all
    pub fn new(ctx: Assembly<'a>, file_size: u64) -> Self {
        Self {
            ctx,
            needs_split: file_size > ctx.breakpoint,
            pending: Vec::new(),
            pending_audit: Vec::new(),
            running: 0,
            children: Vec::new(),
            audit: Vec::new(),
            interims: 0,
            leaves: 0,
            size: 0,
        }
    }

    /// Seal and store one chunk as a leaf; flush an interim when due.
    ///
    /// The chunk buffer moves into the leaf and is freed once stored.
    pub fn push_chunk(&mut self, chunk: Chunk) -> Result<(), DagError> {
        let ordinal = chunk.index + 1;
        let len = chunk.len() as u64;

        let handle = {
            let leaf = Node::leaf(chunk.into_data())?;
            self.ctx.store.put(&leaf)?;
            leaf.handle()
        };
        trace!(chunk = ordinal, bytes = len, id = %handle.id, "Stored leaf");

        self.pending.push(handle);
        self.pending_audit
            .push(AuditNode::leaf(format!("chunk_{}", ordinal), handle.id));
        self.running += len;
        self.size += len;
        self.leaves += 1;

        if self.running >= self.ctx.breakpoint && self.needs_split {
            self.flush_interim()?;
        }
        Ok(())
    }

    fn flush_interim(&mut self) -> Result<(), DagError> {
        let pending = std::mem::take(&mut self.pending);
        let nodes = std::mem::take(&mut self.pending_audit);
        let leaves = pending.len();

        let reduction = self.ctx.packer.reduce(pending, self.ctx.store)?;
        self.interims += 1;
        debug!(
            interim = self.interims,
            leaves,
            bytes = self.running,
            id = %reduction.root.id,
            "Flushed file interim"
        );

        self.children.push(reduction.root);
        self.audit.push(AuditNode::group(
            format!("interim_{}", self.interims),
            reduction.root.id,
            nodes,
        ));
        self.running = 0;
        Ok(())
    }

    /// Resolve what is left at end of stream into the file's children
    pub fn finish(mut self) -> Result<FileOutput, DagError> {
        if self.interims > 0 {
            match self.pending.len() {
                0 => {}
                1 => {
                    self.children.append(&mut self.pending);
                    self.audit.append(&mut self.pending_audit);
                }
                _ => self.flush_interim()?,
            }
        } else if self.pending.is_empty() {
            let leaf = Node::leaf(Vec::new())?;
            self.ctx.store.put(&leaf)?;
            self.leaves = 1;
            self.children.push(leaf.handle());
            self.audit.push(AuditNode::leaf("chunk_1", leaf.id()));
        } else {
            self.children = std::mem::take(&mut self.pending);
            self.audit = std::mem::take(&mut self.pending_audit);
        }

        Ok(FileOutput {
            children: self.children,
            interims: self.interims,
            leaves: self.leaves,
            size: self.size,
            audit: self.audit,
        })
    }
}

/// Chunk one file and assemble its top-level children
#[instrument(skip_all, fields(file = %entry.path.display(), size = entry.size))]
pub fn assemble_file(
    ctx: Assembly<'_>,
    entry: &FileEntry,
    progress: &mut Progress,
) -> Result<FileOutput, DagError> {
    progress.start_file(&entry.path);
    let chunker = Chunker::open(&entry.path, ctx.chunk_size)?;
    let mut assembler = InterimAssembler::new(ctx, entry.size);

    for chunk in chunker {
        let chunk = chunk.map_err(|e| DagError::io(&entry.path, e))?;
        progress.advance(chunk.len() as u64);
        assembler.push_chunk(chunk)?;
    }

    let output = assembler.finish()?;
    debug!(
        leaves = output.leaves,
        interims = output.interims,
        children = output.children.len(),
        "Assembled file"
    );
    Ok(output)
}
