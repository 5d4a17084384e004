//! DAG node model
//!
//! A node is either a `Raw` leaf holding chunk bytes or a parent (`File` or
//! `Directory`) holding an ordered list of links. Nodes are sealed on
//! construction: the body is encoded once and the ContentId is the hash of
//! that encoding.

use crate::error::DagError;
use crate::tree::hasher;
use crate::types::ContentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Explicit kind tag of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Leaf holding raw chunk bytes
    Raw,
    /// Parent whose children concatenate into file data
    File,
    /// Parent whose links carry names
    Directory,
}

impl NodeKind {
    /// Raw and File nodes can be concatenated into a file parent.
    pub fn is_file_data(self) -> bool {
        matches!(self, NodeKind::Raw | NodeKind::File)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Raw => "raw",
            NodeKind::File => "file",
            NodeKind::Directory => "directory",
        };
        f.write_str(name)
    }
}

/// Reference from a parent to one child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: ContentId,
    /// Recorded size of the child (bytes of file data beneath it)
    pub size: u64,
    pub name: Option<String>,
}

impl Link {
    pub fn unnamed(id: ContentId, size: u64) -> Self {
        Self {
            id,
            size,
            name: None,
        }
    }

    pub fn named(id: ContentId, size: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            size,
            name: Some(name.into()),
        }
    }
}

/// Encoded form of a node. A block is `bincode(NodeBody)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeBody {
    Raw(Vec<u8>),
    File { total_size: u64, links: Vec<Link> },
    Directory { total_size: u64, links: Vec<Link> },
}

impl NodeBody {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeBody::Raw(_) => NodeKind::Raw,
            NodeBody::File { .. } => NodeKind::File,
            NodeBody::Directory { .. } => NodeKind::Directory,
        }
    }

    /// Recorded size: byte length for leaves, total size for parents
    pub fn size(&self) -> u64 {
        match self {
            NodeBody::Raw(data) => data.len() as u64,
            NodeBody::File { total_size, .. } | NodeBody::Directory { total_size, .. } => {
                *total_size
            }
        }
    }

    pub fn links(&self) -> &[Link] {
        match self {
            NodeBody::Raw(_) => &[],
            NodeBody::File { links, .. } | NodeBody::Directory { links, .. } => links,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, DagError> {
        bincode::serialize(self).map_err(|e| DagError::Encoding(e.to_string()))
    }

    pub fn decode(block: &[u8]) -> Result<Self, DagError> {
        bincode::deserialize(block)
            .map_err(|e| DagError::Encoding(format!("Failed to decode node block: {}", e)))
    }
}

/// A sealed node: its identifier, bookkeeping, and encoded block
#[derive(Debug, Clone)]
pub struct Node {
    id: ContentId,
    kind: NodeKind,
    size: u64,
    links: Vec<Link>,
    block: Vec<u8>,
}

impl Node {
    /// Seal a leaf. The chunk buffer is consumed and freed once encoded.
    pub fn leaf(data: Vec<u8>) -> Result<Self, DagError> {
        let size = data.len() as u64;
        let block = NodeBody::Raw(data).encode()?;
        Ok(Self::seal(NodeKind::Raw, size, Vec::new(), block))
    }

    /// Seal a file-kind parent over the given links
    pub fn file(links: Vec<Link>) -> Result<Self, DagError> {
        let total_size = links.iter().map(|l| l.size).sum();
        Self::parent(NodeBody::File { total_size, links })
    }

    /// Seal a directory-kind parent over the given (named) links
    pub fn directory(links: Vec<Link>) -> Result<Self, DagError> {
        let total_size = links.iter().map(|l| l.size).sum();
        Self::parent(NodeBody::Directory { total_size, links })
    }

    fn parent(body: NodeBody) -> Result<Self, DagError> {
        let block = body.encode()?;
        let kind = body.kind();
        let size = body.size();
        let links = match body {
            NodeBody::File { links, .. } | NodeBody::Directory { links, .. } => links,
            NodeBody::Raw(_) => Vec::new(),
        };
        Ok(Self::seal(kind, size, links, block))
    }

    fn seal(kind: NodeKind, size: u64, links: Vec<Link>, block: Vec<u8>) -> Self {
        let id = hasher::compute_content_id(&block);
        Self {
            id,
            kind,
            size,
            links,
            block,
        }
    }

    pub fn id(&self) -> ContentId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Links of a parent; empty for leaves
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Encoded block bytes, exactly what the store and archive hold
    pub fn block(&self) -> &[u8] {
        &self.block
    }

    /// Drop the block and keep only what a parent needs to link to this node
    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            id: self.id,
            kind: self.kind,
            size: self.size,
        }
    }
}

/// Lightweight reference to a stored node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub id: ContentId,
    pub kind: NodeKind,
    pub size: u64,
}

/// Anything a parent can link to
///
/// The packer only needs a child's identifier, kind and recorded size, so
/// both sealed nodes and bare handles qualify.
pub trait Linkable {
    fn content_id(&self) -> ContentId;
    fn node_kind(&self) -> NodeKind;
    fn recorded_size(&self) -> u64;
}

impl Linkable for Node {
    fn content_id(&self) -> ContentId {
        self.id
    }

    fn node_kind(&self) -> NodeKind {
        self.kind
    }

    fn recorded_size(&self) -> u64 {
        self.size
    }
}

impl Linkable for NodeHandle {
    fn content_id(&self) -> ContentId {
        self.id
    }

    fn node_kind(&self) -> NodeKind {
        self.kind
    }

    fn recorded_size(&self) -> u64 {
        self.size
    }
}

/// A node paired with a human-readable name (folder roots)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntry {
    pub name: String,
    pub node: NodeHandle,
}

impl NamedEntry {
    pub fn new(name: impl Into<String>, node: NodeHandle) -> Self {
        Self {
            name: name.into(),
            node,
        }
    }
}
