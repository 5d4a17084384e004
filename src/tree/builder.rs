//! Tree builder: drives the per-file assembler over every input folder
//!
//! Each top-level folder gets its own accumulator of file roots. The same
//! breakpoint that splits large files also splits large folders into folder
//! interims. Every folder resolves to one named root, and the named roots are
//! collected into the archive root.

use crate::audit::{AuditNode, AuditTree};
use crate::error::DagError;
use crate::progress::Progress;
use crate::store::BlockStore;
use crate::tree::interim::{assemble_file, Assembly};
use crate::tree::node::{NamedEntry, Node, NodeHandle};
use crate::tree::packer::Packer;
use crate::tree::root::build_root;
use crate::tree::walker::{FolderPlan, InputPlan, Walker, WalkerConfig};
use crate::types::{
    DEFAULT_BREAKPOINT, DEFAULT_CHUNK_SIZE, DEFAULT_LINKS_PER_BLOCK, MAX_CHUNK_SIZE,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// What to do when a file or folder cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Any failure ends the run
    #[default]
    Abort,
    /// Read failures leave the file or folder out and the run continues
    Skip,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(ErrorPolicy::Abort),
            "skip" => Ok(ErrorPolicy::Skip),
            other => Err(format!("Unknown error policy '{}' (expected abort or skip)", other)),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Abort => f.write_str("abort"),
            ErrorPolicy::Skip => f.write_str("skip"),
        }
    }
}

/// How a folder that produced no content appears in the archive root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyFolderPolicy {
    /// Leave the folder out of the archive root
    #[default]
    Omit,
    /// Link an empty directory node under the folder's name
    #[serde(rename = "empty-dir")]
    EmptyDirectory,
}

impl FromStr for EmptyFolderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "omit" => Ok(EmptyFolderPolicy::Omit),
            "empty-dir" | "empty_dir" => Ok(EmptyFolderPolicy::EmptyDirectory),
            other => Err(format!(
                "Unknown empty folder policy '{}' (expected omit or empty-dir)",
                other
            )),
        }
    }
}

impl fmt::Display for EmptyFolderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyFolderPolicy::Omit => f.write_str("omit"),
            EmptyFolderPolicy::EmptyDirectory => f.write_str("empty-dir"),
        }
    }
}

/// Packing parameters and policies for one build
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub chunk_size: u64,
    pub breakpoint: u64,
    pub max_links: usize,
    pub error_policy: ErrorPolicy,
    pub empty_folders: EmptyFolderPolicy,
    pub walker: WalkerConfig,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            breakpoint: DEFAULT_BREAKPOINT,
            max_links: DEFAULT_LINKS_PER_BLOCK,
            error_policy: ErrorPolicy::default(),
            empty_folders: EmptyFolderPolicy::default(),
            walker: WalkerConfig::default(),
        }
    }
}

/// A file or folder left out under the skip policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub path: PathBuf,
    pub reason: String,
}

/// Counters describing a finished build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub folders: usize,
    pub files: usize,
    pub leaves: usize,
    pub file_interims: usize,
    pub folder_interims: usize,
    pub bytes: u64,
    pub skipped_files: usize,
    pub skipped_folders: usize,
}

/// Result of a build
#[derive(Debug)]
pub struct BuildOutput {
    /// Archive root (already in the store)
    pub root: Node,
    /// Named folder roots linked from the archive root
    pub entries: Vec<NamedEntry>,
    pub audit: AuditTree,
    pub skipped: Vec<Skipped>,
    pub stats: BuildStats,
}

/// Tree builder for constructing the DAG of an input directory
pub struct TreeBuilder<'a> {
    root: PathBuf,
    options: IngestOptions,
    store: &'a dyn BlockStore,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(root: PathBuf, store: &'a dyn BlockStore) -> Self {
        Self {
            root,
            options: IngestOptions::default(),
            store,
        }
    }

    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Walk the input root and build its DAG
    #[instrument(skip(self), fields(input = %self.root.display()))]
    pub fn build(&self) -> Result<BuildOutput, DagError> {
        let walker = Walker::with_config(self.root.clone(), self.options.walker.clone());
        let plan = walker.walk()?;
        debug!(
            folders = plan.folders.len(),
            files = plan.file_count(),
            ignored = plan.ignored.len(),
            "Planned input"
        );
        self.build_plan(plan)
    }

    /// Build the DAG for an already planned traversal
    pub fn build_plan(&self, plan: InputPlan) -> Result<BuildOutput, DagError> {
        let start = Instant::now();
        let ctx = Assembly {
            packer: Packer::new(self.options.max_links)?,
            store: self.store,
            chunk_size: checked_chunk_size(self.options.chunk_size)?,
            breakpoint: self.options.breakpoint,
        };
        info!(
            total_bytes = plan.total_bytes(),
            chunk_size = self.options.chunk_size,
            breakpoint = self.options.breakpoint,
            max_links = self.options.max_links,
            "Starting tree build"
        );

        let mut progress = Progress::new(plan.total_bytes());
        let mut run = RunState::default();

        for folder in plan.folders {
            self.build_folder(ctx, folder, &mut progress, &mut run)?;
        }

        let root = build_root(&run.entries)?;
        self.store.put(&root)?;
        run.audit.root = Some(root.id());

        info!(
            root = %root.id(),
            folders = run.stats.folders,
            files = run.stats.files,
            bytes = run.stats.bytes,
            skipped = run.skipped.len(),
            duration_ms = start.elapsed().as_millis(),
            "Tree build complete"
        );

        Ok(BuildOutput {
            root,
            entries: run.entries,
            audit: run.audit,
            skipped: run.skipped,
            stats: run.stats,
        })
    }

    #[instrument(skip_all, fields(folder = %folder.name))]
    fn build_folder(
        &self,
        ctx: Assembly<'_>,
        folder: FolderPlan,
        progress: &mut Progress,
        run: &mut RunState,
    ) -> Result<(), DagError> {
        if let Some(err) = folder.error {
            let reason = self.handle_failure(&folder.path, err, &mut run.skipped)?;
            run.audit.folders.push(AuditNode::skipped(&folder.name, reason));
            run.stats.skipped_folders += 1;
            return Ok(());
        }

        let mut assembler = FolderAssembler::new(ctx, &folder.name, folder.total_bytes());
        let mut skipped_audit = Vec::new();

        for (path, err) in folder.failures {
            let reason = self.handle_failure(&path, err, &mut run.skipped)?;
            skipped_audit.push(AuditNode::skipped(audit_file_path(&folder.name, &path), reason));
            run.stats.skipped_files += 1;
        }

        for file in &folder.files {
            let file_path = format!("{}/{}", folder.name, file.name);
            let file_start = progress.processed_bytes();
            let output = match assemble_file(ctx, file, progress) {
                Ok(output) => output,
                Err(err) => {
                    let reason = self.handle_failure(&file.path, err, &mut run.skipped)?;
                    progress.skip_rest(file.size, file_start);
                    skipped_audit.push(AuditNode::skipped(file_path, reason));
                    run.stats.skipped_files += 1;
                    continue;
                }
            };

            // Each file enters the folder as a single file root.
            let reduction = ctx.packer.reduce(output.children, ctx.store)?;
            run.stats.files += 1;
            run.stats.leaves += output.leaves;
            run.stats.file_interims += output.interims;
            run.stats.bytes += output.size;

            let audit = AuditNode::group(file_path, reduction.root.id, output.audit);
            assembler.push_file(reduction.root, output.size, audit)?;
        }

        let folder_interims = assembler.interim_count();
        match assembler.finish(self.options.empty_folders)? {
            Some((node, mut nodes)) => {
                nodes.append(&mut skipped_audit);
                info!(
                    root = %node.id,
                    size = node.size,
                    interims = folder_interims,
                    "Folder complete"
                );
                run.stats.folders += 1;
                run.stats.folder_interims += folder_interims;
                run.entries.push(NamedEntry::new(folder.name.clone(), node));
                run.audit
                    .folders
                    .push(AuditNode::group(folder.name, node.id, nodes));
            }
            None => {
                info!("Folder produced no content; omitted");
                let mut omitted = AuditNode::skipped(folder.name, "no content");
                omitted.nodes = skipped_audit;
                run.audit.folders.push(omitted);
            }
        }
        Ok(())
    }

    /// Apply the error policy; returns the skip reason when the run continues
    fn handle_failure(
        &self,
        path: &Path,
        err: DagError,
        skipped: &mut Vec<Skipped>,
    ) -> Result<String, DagError> {
        match self.options.error_policy {
            ErrorPolicy::Skip if err.is_skippable() => {
                let reason = err.to_string();
                warn!(path = %path.display(), error = %reason, "Skipping unreadable entry");
                skipped.push(Skipped {
                    path: path.to_path_buf(),
                    reason: reason.clone(),
                });
                Ok(reason)
            }
            _ => Err(err),
        }
    }
}

#[derive(Default)]
struct RunState {
    entries: Vec<NamedEntry>,
    audit: AuditTree,
    skipped: Vec<Skipped>,
    stats: BuildStats,
}

fn checked_chunk_size(chunk_size: u64) -> Result<usize, DagError> {
    if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
        return Err(DagError::InvalidChunkSize(chunk_size));
    }
    usize::try_from(chunk_size).map_err(|_| DagError::InvalidChunkSize(chunk_size))
}

fn audit_file_path(folder: &str, path: &Path) -> String {
    match path.file_name() {
        Some(name) => format!("{}/{}", folder, name.to_string_lossy()),
        None => folder.to_string(),
    }
}

/// Per-folder accumulator of file roots
struct FolderAssembler<'a> {
    ctx: Assembly<'a>,
    name: String,
    needs_split: bool,
    pending: Vec<NodeHandle>,
    pending_audit: Vec<AuditNode>,
    interims: Vec<NodeHandle>,
    interim_audit: Vec<AuditNode>,
    running: u64,
}

impl<'a> FolderAssembler<'a> {
    fn new(ctx: Assembly<'a>, name: &str, folder_size: u64) -> Self {
        Self {
            ctx,
            name: name.to_string(),
            needs_split: folder_size > ctx.breakpoint,
            pending: Vec::new(),
            pending_audit: Vec::new(),
            interims: Vec::new(),
            interim_audit: Vec::new(),
            running: 0,
        }
    }

    fn interim_count(&self) -> usize {
        self.interims.len()
    }

    fn push_file(&mut self, root: NodeHandle, size: u64, audit: AuditNode) -> Result<(), DagError> {
        self.pending.push(root);
        self.pending_audit.push(audit);
        self.running += size;

        if self.running >= self.ctx.breakpoint && self.needs_split {
            self.flush_interim()?;
        }
        Ok(())
    }

    fn flush_interim(&mut self) -> Result<(), DagError> {
        let pending = std::mem::take(&mut self.pending);
        let nodes = std::mem::take(&mut self.pending_audit);
        let reduction = self.ctx.packer.reduce(pending, self.ctx.store)?;

        self.interims.push(reduction.root);
        let path = format!("{}/interim_{}", self.name, self.interims.len());
        debug!(path = %path, bytes = self.running, id = %reduction.root.id, "Flushed folder interim");
        self.interim_audit
            .push(AuditNode::group(path, reduction.root.id, nodes));
        self.running = 0;
        Ok(())
    }

    /// Resolve leftover state into the folder root and its audit children.
    ///
    /// Returns `None` when the folder is omitted.
    fn finish(
        mut self,
        empty_folders: EmptyFolderPolicy,
    ) -> Result<Option<(NodeHandle, Vec<AuditNode>)>, DagError> {
        let has_interims = !self.interims.is_empty();

        let root = match (self.pending.len(), has_interims) {
            (0, false) => match empty_folders {
                EmptyFolderPolicy::Omit => return Ok(None),
                EmptyFolderPolicy::EmptyDirectory => {
                    let empty = Node::directory(Vec::new())?;
                    self.ctx.store.put(&empty)?;
                    empty.handle()
                }
            },
            (0, true) => self.reduce_interims()?,
            (1, false) => {
                self.interim_audit = std::mem::take(&mut self.pending_audit);
                self.pending[0]
            }
            (1, true) => {
                self.interims.append(&mut self.pending);
                self.interim_audit.append(&mut self.pending_audit);
                self.reduce_interims()?
            }
            (_, false) => {
                let pending = std::mem::take(&mut self.pending);
                self.interim_audit = std::mem::take(&mut self.pending_audit);
                self.ctx.packer.reduce(pending, self.ctx.store)?.root
            }
            (_, true) => {
                self.flush_interim()?;
                self.reduce_interims()?
            }
        };

        Ok(Some((root, self.interim_audit)))
    }

    fn reduce_interims(&mut self) -> Result<NodeHandle, DagError> {
        let interims = std::mem::take(&mut self.interims);
        Ok(self.ctx.packer.reduce(interims, self.ctx.store)?.root)
    }
}
