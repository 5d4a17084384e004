//! Root builder: named folder roots to one directory node

use crate::error::DagError;
use crate::tree::node::{Link, NamedEntry, Node};
use crate::types::DEFAULT_LINKS_PER_BLOCK;
use tracing::warn;

/// Build the archive root from named entries, keeping their order.
///
/// No fan-out limit applies here; every entry becomes one named link.
pub fn build_root(entries: &[NamedEntry]) -> Result<Node, DagError> {
    if entries.len() > DEFAULT_LINKS_PER_BLOCK {
        warn!(
            entries = entries.len(),
            limit = DEFAULT_LINKS_PER_BLOCK,
            "Archive root exceeds the usual links per block"
        );
    }

    let links = entries
        .iter()
        .map(|entry| Link::named(entry.node.id, entry.node.size, entry.name.clone()))
        .collect();
    Node::directory(links)
}
