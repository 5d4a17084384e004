//! Property-based tests for packing invariants

mod chunking;
mod packing;
