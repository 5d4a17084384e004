//! Integration tests for DAG determinism

use super::test_utils::{build, kib_options, patterned, write_file};
use dagprep::config::{StoreBackend, StoreConfig};
use dagprep::store::{open_store, BlockStore, MemoryBlockStore};
use dagprep::tree::builder::TreeBuilder;
use std::path::Path;
use tempfile::TempDir;

fn populate(root: &Path) {
    write_file(root, "a", "one.bin", &patterned(5000, 1));
    write_file(root, "a", "two.bin", &patterned(700, 2));
    write_file(root, "b", "three.bin", &patterned(21 * 1024, 3));
}

/// Same input twice produces the same root
#[test]
fn test_same_input_same_root() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path());

    let first = build(temp_dir.path(), &MemoryBlockStore::new(), kib_options(4));
    let second = build(temp_dir.path(), &MemoryBlockStore::new(), kib_options(4));
    assert_eq!(first.root.id(), second.root.id());
    assert_eq!(first.audit, second.audit);
}

/// Identical trees in different locations produce the same root
#[test]
fn test_location_independent() {
    let left = TempDir::new().unwrap();
    let right = TempDir::new().unwrap();
    populate(left.path());
    populate(right.path());

    let a = build(left.path(), &MemoryBlockStore::new(), kib_options(174));
    let b = build(right.path(), &MemoryBlockStore::new(), kib_options(174));
    assert_eq!(a.root.id(), b.root.id());
}

/// The persistent backend yields the same ids as the in-memory one
#[test]
fn test_backend_independent() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input");
    populate(&input);

    let memory = build(&input, &MemoryBlockStore::new(), kib_options(174));

    let sled = open_store(&StoreConfig {
        backend: StoreBackend::Sled,
        path: Some(temp_dir.path().join("blocks")),
        ..StoreConfig::default()
    })
    .unwrap();
    let persisted = TreeBuilder::new(input.clone(), sled.as_ref())
        .with_options(kib_options(174))
        .build()
        .unwrap();

    assert_eq!(memory.root.id(), persisted.root.id());
    assert!(sled.contains(&persisted.root.id()).unwrap());
}

/// Changing one byte changes the root
#[test]
fn test_content_change_changes_root() {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path());
    let before = build(temp_dir.path(), &MemoryBlockStore::new(), kib_options(174));

    let mut data = patterned(700, 2);
    data[350] ^= 1;
    write_file(temp_dir.path(), "a", "two.bin", &data);
    let after = build(temp_dir.path(), &MemoryBlockStore::new(), kib_options(174));

    assert_ne!(before.root.id(), after.root.id());
    assert_eq!(before.entries[1].node.id, after.entries[1].node.id);
}

/// File order within a folder is part of its identity
#[test]
fn test_order_sensitive() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "f", "1.bin", b"first");
    write_file(temp_dir.path(), "f", "2.bin", b"second");
    let before = build(temp_dir.path(), &MemoryBlockStore::new(), kib_options(174));

    write_file(temp_dir.path(), "f", "1.bin", b"second");
    write_file(temp_dir.path(), "f", "2.bin", b"first");
    let after = build(temp_dir.path(), &MemoryBlockStore::new(), kib_options(174));

    assert_eq!(before.entries[0].node.size, after.entries[0].node.size);
    assert_ne!(before.entries[0].node.id, after.entries[0].node.id);
}
