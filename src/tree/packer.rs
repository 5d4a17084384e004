//! Node packer: groups ordered children into bounded parents
//!
//! Packing is greedy and order-preserving. A parent is sealed as soon as it
//! holds `max_links` children; the next child starts a new parent. Feeding the
//! output back in until one node remains is root reduction, which gives the
//! DAG its intermediate levels.

use crate::error::DagError;
use crate::store::BlockStore;
use crate::tree::node::{Link, Linkable, Node, NodeHandle, NodeKind};
use tracing::{debug, trace};

/// Result of collapsing a sequence to one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reduction {
    pub root: NodeHandle,
    /// Number of pack passes applied (0 when the input was already one node)
    pub levels: usize,
}

/// Fan-out bounded packer
#[derive(Debug, Clone, Copy)]
pub struct Packer {
    max_links: usize,
}

impl Packer {
    pub fn new(max_links: usize) -> Result<Self, DagError> {
        if max_links < 2 {
            return Err(DagError::InvalidFanOut(max_links));
        }
        Ok(Self { max_links })
    }

    pub fn max_links(&self) -> usize {
        self.max_links
    }

    /// Pack children into file-kind parents of at most `max_links` links.
    ///
    /// The last parent is sealed even when it holds a single child, so one
    /// input still produces one wrapping parent. Empty input produces nothing.
    pub fn pack<L: Linkable>(&self, children: &[L]) -> Result<Vec<Node>, DagError> {
        let mut parents = Vec::with_capacity(children.len().div_ceil(self.max_links));
        let mut current: Vec<Link> = Vec::with_capacity(self.max_links.min(children.len()));

        for child in children {
            let kind = child.node_kind();
            if !kind.is_file_data() {
                return Err(DagError::InvalidNodeKind {
                    id: child.content_id(),
                    kind,
                });
            }

            if current.len() == self.max_links {
                let links = std::mem::replace(&mut current, Vec::with_capacity(self.max_links));
                parents.push(Node::file(links)?);
            }
            current.push(Link::unnamed(child.content_id(), child.recorded_size()));
        }

        if !current.is_empty() {
            parents.push(Node::file(current)?);
        }

        trace!(
            children = children.len(),
            parents = parents.len(),
            "Packed children"
        );
        Ok(parents)
    }

    /// Collapse a sequence into exactly one node.
    ///
    /// Every parent produced along the way is written to `store`. A single
    /// input is returned as is. Kinds are checked even then, so a directory
    /// node can never slip through as file data.
    pub fn reduce(
        &self,
        children: Vec<NodeHandle>,
        store: &dyn BlockStore,
    ) -> Result<Reduction, DagError> {
        let mut level = children;
        let mut levels = 0;

        if let Some(bad) = level.iter().find(|h| !h.kind.is_file_data()) {
            return Err(DagError::InvalidNodeKind {
                id: bad.id,
                kind: bad.kind,
            });
        }

        loop {
            match level.len() {
                0 => return Err(DagError::EmptyReduction),
                1 => {
                    let root = level[0];
                    if levels > 0 {
                        debug!(levels, root = %root.id, "Reduced to single root");
                    }
                    return Ok(Reduction { root, levels });
                }
                _ => {
                    let parents = self.pack(&level)?;
                    let mut next = Vec::with_capacity(parents.len());
                    for parent in &parents {
                        store.put(parent)?;
                        next.push(parent.handle());
                    }
                    level = next;
                    levels += 1;
                }
            }
        }
    }
}
