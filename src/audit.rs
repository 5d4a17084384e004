//! Audit log of packing decisions
//!
//! The audit tree mirrors how chunks were grouped into interims, files and
//! folder roots. It is descriptive only: nothing reads it back to build or
//! verify a DAG.

use crate::types::ContentId;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One entry of the audit tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditNode {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<AuditNode>,
    /// Reason the entry was left out of the DAG
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl AuditNode {
    pub fn leaf(path: impl Into<String>, id: ContentId) -> Self {
        Self::group(path, id, Vec::new())
    }

    pub fn group(path: impl Into<String>, id: ContentId, nodes: Vec<AuditNode>) -> Self {
        Self {
            path: path.into(),
            cid: Some(id.to_hex()),
            nodes,
            skipped: None,
        }
    }

    pub fn skipped(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            cid: None,
            nodes: Vec::new(),
            skipped: Some(reason.into()),
        }
    }

    /// Count of entries in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self.nodes.iter().map(AuditNode::count).sum::<usize>()
    }
}

/// Audit tree for a whole build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditTree {
    pub root: Option<ContentId>,
    pub folders: Vec<AuditNode>,
}

#[derive(Serialize)]
struct RootLine<'a> {
    root: &'a str,
}

/// Audit log location next to an archive: `<stem>.jsonl`
pub fn audit_path_for(archive: &Path) -> PathBuf {
    archive.with_extension("jsonl")
}

/// Write the tree as JSON Lines: the root id first, then one line per folder
pub fn write_audit_log(path: &Path, tree: &AuditTree) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    let root = tree.root.map(|id| id.to_hex()).unwrap_or_default();
    serde_json::to_writer(&mut writer, &RootLine { root: &root })?;
    writer.write_all(b"\n")?;

    for folder in &tree.folders {
        serde_json::to_writer(&mut writer, folder)?;
        writer.write_all(b"\n")?;
    }

    writer.flush()
}
