//! Shared test utilities for integration tests

use dagprep::store::{BlockStore, MemoryBlockStore};
use dagprep::tree::builder::{BuildOutput, IngestOptions, TreeBuilder};
use dagprep::tree::node::NodeBody;
use dagprep::types::ContentId;
use std::fs;
use std::path::{Path, PathBuf};

/// Options scaled down so tests work in KiB instead of MiB
pub fn kib_options(max_links: usize) -> IngestOptions {
    IngestOptions {
        chunk_size: 1024,
        breakpoint: 10 * 1024,
        max_links,
        ..IngestOptions::default()
    }
}

/// Deterministic, non-repeating bytes so distinct chunks hash differently
pub fn patterned(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u32).wrapping_mul(31).wrapping_add(seed as u32) as u8 ^ (i / 256) as u8)
        .collect()
}

/// Create `<root>/<folder>/<file>` with the given contents
pub fn write_file(root: &Path, folder: &str, file: &str, data: &[u8]) -> PathBuf {
    let dir = root.join(folder);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file);
    fs::write(&path, data).unwrap();
    path
}

pub fn build(input: &Path, store: &MemoryBlockStore, options: IngestOptions) -> BuildOutput {
    TreeBuilder::new(input.to_path_buf(), store)
        .with_options(options)
        .build()
        .unwrap()
}

pub fn body(store: &dyn BlockStore, id: &ContentId) -> NodeBody {
    NodeBody::decode(&store.get(id).unwrap().unwrap()).unwrap()
}
