//! dagprep: Merkle DAG preparation for directory trees
//!
//! Splits files into fixed-size leaf blocks, packs them into bounded-fan-out
//! parents with periodic interim nodes, links one root per top-level folder
//! under a single archive root, and exports the reachable blocks to a
//! portable archive that can be verified and extracted.

pub mod archive;
pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod tree;
pub mod types;
