//! Error and empty-folder policies

use super::test_utils::{kib_options, patterned, write_file};
use dagprep::error::DagError;
use dagprep::store::{BlockStore, MemoryBlockStore};
use dagprep::tree::builder::{EmptyFolderPolicy, ErrorPolicy, IngestOptions, TreeBuilder};
use dagprep::tree::node::{Node, NodeKind};
use dagprep::tree::walker::{Walker, WalkerConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Plan the input, then delete one file so reading it fails mid-build
fn build_with_vanished_file(
    input: &Path,
    store: &MemoryBlockStore,
    options: IngestOptions,
) -> Result<dagprep::tree::BuildOutput, DagError> {
    let plan = Walker::with_config(input.to_path_buf(), WalkerConfig::default())
        .walk()
        .unwrap();
    fs::remove_file(input.join("docs").join("gone.txt")).unwrap();
    TreeBuilder::new(input.to_path_buf(), store)
        .with_options(options)
        .build_plan(plan)
}

fn sample(root: &Path) {
    write_file(root, "docs", "gone.txt", b"soon removed");
    write_file(root, "docs", "kept.txt", &patterned(2048, 3));
    write_file(root, "media", "song.mp3", &patterned(1500, 4));
}

#[test]
fn test_abort_policy_stops_on_unreadable_file() {
    let temp_dir = TempDir::new().unwrap();
    sample(temp_dir.path());
    let store = MemoryBlockStore::new();

    let result = build_with_vanished_file(temp_dir.path(), &store, kib_options(174));
    match result {
        Err(DagError::Io { path, .. }) => assert!(path.ends_with("gone.txt")),
        other => panic!("expected io failure, got {:?}", other.map(|o| o.root.id())),
    }
}

#[test]
fn test_skip_policy_continues_and_records() {
    let temp_dir = TempDir::new().unwrap();
    sample(temp_dir.path());
    let store = MemoryBlockStore::new();
    let options = IngestOptions {
        error_policy: ErrorPolicy::Skip,
        ..kib_options(174)
    };

    let output = build_with_vanished_file(temp_dir.path(), &store, options).unwrap();
    assert_eq!(output.skipped.len(), 1);
    assert!(output.skipped[0].path.ends_with("gone.txt"));
    assert_eq!(output.stats.files, 2);
    assert_eq!(output.stats.skipped_files, 1);
    assert_eq!(output.entries.len(), 2);
    assert_eq!(output.entries[0].node.size, 2048);

    let docs = &output.audit.folders[0];
    let skipped: Vec<&str> = docs
        .nodes
        .iter()
        .filter(|n| n.skipped.is_some())
        .map(|n| n.path.as_str())
        .collect();
    assert_eq!(skipped, vec!["docs/gone.txt"]);
}

#[test]
fn test_missing_input_is_fatal_even_when_skipping() {
    let temp_dir = TempDir::new().unwrap();
    let store = MemoryBlockStore::new();
    let options = IngestOptions {
        error_policy: ErrorPolicy::Skip,
        ..kib_options(174)
    };

    let result = TreeBuilder::new(temp_dir.path().join("absent"), &store)
        .with_options(options)
        .build();
    assert!(matches!(result, Err(DagError::Io { .. })));
}

#[test]
fn test_empty_folder_omitted_by_default() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("empty")).unwrap();
    write_file(temp_dir.path(), "full", "a.txt", b"a");

    let store = MemoryBlockStore::new();
    let output = TreeBuilder::new(temp_dir.path().to_path_buf(), &store)
        .with_options(kib_options(174))
        .build()
        .unwrap();

    let names: Vec<&str> = output.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["full"]);
    assert_eq!(output.audit.folders[0].path, "empty");
    assert_eq!(output.audit.folders[0].skipped.as_deref(), Some("no content"));
}

#[test]
fn test_empty_folder_as_empty_directory() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("empty")).unwrap();

    let store = MemoryBlockStore::new();
    let options = IngestOptions {
        empty_folders: EmptyFolderPolicy::EmptyDirectory,
        ..kib_options(174)
    };
    let output = TreeBuilder::new(temp_dir.path().to_path_buf(), &store)
        .with_options(options)
        .build()
        .unwrap();

    assert_eq!(output.entries.len(), 1);
    let entry = output.entries[0].node;
    assert_eq!(entry.kind, NodeKind::Directory);
    assert_eq!(entry.size, 0);
    assert_eq!(entry.id, Node::directory(Vec::new()).unwrap().id());
    assert!(store.contains(&entry.id).unwrap());
}

#[test]
fn test_folder_of_empty_files_is_not_empty() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "zeros", "blank.txt", b"");

    let store = MemoryBlockStore::new();
    let output = TreeBuilder::new(temp_dir.path().to_path_buf(), &store)
        .with_options(kib_options(174))
        .build()
        .unwrap();

    assert_eq!(output.entries.len(), 1);
    assert_eq!(output.entries[0].node.id, Node::leaf(Vec::new()).unwrap().id());
    assert_eq!(output.stats.leaves, 1);
}
