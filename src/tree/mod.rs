//! Merkle DAG construction
//!
//! Files are chunked into leaves, leaves are packed into bounded parents, and
//! parents are reduced level by level until each file, folder and finally the
//! whole input has one root. Every node is addressed by the hash of its own
//! encoded block.

pub mod builder;
pub mod chunker;
pub mod hasher;
pub mod interim;
pub mod node;
pub mod packer;
pub mod root;
pub mod walker;

pub use builder::{
    BuildOutput, BuildStats, EmptyFolderPolicy, ErrorPolicy, IngestOptions, Skipped, TreeBuilder,
};
pub use node::{Link, NamedEntry, Node, NodeBody, NodeHandle, NodeKind};
pub use packer::{Packer, Reduction};
