//! End-to-end packing scenarios, scaled from MiB to KiB

use super::test_utils::{body, build, kib_options, patterned, write_file};
use dagprep::archive::{list_entries, verify_archive};
use dagprep::config::StoreConfig;
use dagprep::pipeline::{run_build, BuildRequest};
use dagprep::store::{BlockStore, MemoryBlockStore};
use dagprep::tree::node::{Node, NodeKind};
use dagprep::tree::packer::Packer;
use tempfile::TempDir;

/// 2.5 units of data: three leaves, no interim, one file root with 3 links
#[test]
fn test_small_file_packs_without_interims() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "docs", "report.pdf", &patterned(2560, 1));

    let store = MemoryBlockStore::new();
    let output = build(temp_dir.path(), &store, kib_options(174));

    assert_eq!(output.stats.leaves, 3);
    assert_eq!(output.stats.file_interims, 0);
    assert_eq!(output.stats.folder_interims, 0);

    let folder = output.entries[0].node;
    assert_eq!(folder.kind, NodeKind::File);
    assert_eq!(folder.size, 2560);

    let file_root = body(&store, &folder.id);
    let sizes: Vec<u64> = file_root.links().iter().map(|l| l.size).collect();
    assert_eq!(sizes, vec![1024, 1024, 512]);
}

/// 25 units of data: interims at 10 and 20 plus a 5-unit leftover interim
#[test]
fn test_large_file_flushes_interims() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "video", "clip.mp4", &patterned(25 * 1024, 2));

    let store = MemoryBlockStore::new();
    let output = build(temp_dir.path(), &store, kib_options(174));

    assert_eq!(output.stats.leaves, 25);
    assert_eq!(output.stats.file_interims, 3);

    let file_root = body(&store, &output.entries[0].node.id);
    let sizes: Vec<u64> = file_root.links().iter().map(|l| l.size).collect();
    assert_eq!(sizes, vec![10 * 1024, 10 * 1024, 5 * 1024]);

    for link in file_root.links() {
        let interim = body(&store, &link.id);
        assert_eq!(interim.kind(), NodeKind::File);
        assert_eq!(interim.size(), link.size);
    }

    // The folder alone passes the breakpoint, so its single file sits
    // under a folder interim that reduces to the file root itself.
    let folder_audit = &output.audit.folders[0];
    assert_eq!(folder_audit.nodes[0].path, "video/interim_1");
    assert_eq!(folder_audit.nodes[0].cid, folder_audit.cid);
    let file_audit = &folder_audit.nodes[0].nodes[0];
    assert_eq!(file_audit.path, "video/clip.mp4");
    let interims: Vec<&str> = file_audit.nodes.iter().map(|n| n.path.as_str()).collect();
    assert_eq!(interims, vec!["interim_1", "interim_2", "interim_3"]);
    assert_eq!(file_audit.nodes[0].nodes.len(), 10);
}

/// A folder holding one small file is represented by that file's root
#[test]
fn test_single_file_folder_root_is_file_root() {
    let temp_dir = TempDir::new().unwrap();
    let data = b"just a few bytes".to_vec();
    write_file(temp_dir.path(), "notes", "todo.txt", &data);

    let store = MemoryBlockStore::new();
    let output = build(temp_dir.path(), &store, kib_options(174));

    let leaf = Node::leaf(data).unwrap();
    assert_eq!(output.entries[0].name, "notes");
    assert_eq!(output.entries[0].node.id, leaf.id());

    let folder_audit = &output.audit.folders[0];
    assert_eq!(folder_audit.path, "notes");
    assert_eq!(folder_audit.nodes[0].path, "notes/todo.txt");
    assert_eq!(folder_audit.nodes[0].cid, Some(leaf.id().to_hex()));
}

/// Empty input still produces an archive whose root has no links
#[test]
fn test_empty_input_writes_empty_root() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input");
    std::fs::create_dir_all(&input).unwrap();

    let request = BuildRequest {
        input,
        output: temp_dir.path().join("empty.car"),
        ingest: kib_options(174),
        store: StoreConfig::default(),
        audit_log: true,
    };
    let report = run_build(&request).unwrap();

    assert_eq!(report.stats.folders, 0);
    assert_eq!(report.archive.blocks, 1);
    assert!(list_entries(&request.output).unwrap().is_empty());

    let verify = verify_archive(&request.output).unwrap();
    assert!(verify.is_valid());
    assert_eq!(verify.total_size, 0);
}

/// Ten leaves with three links per parent reduce through 4, 2 and 1 parents
#[test]
fn test_reduction_depth_with_small_fan_out() {
    let store = MemoryBlockStore::new();
    let leaves: Vec<Node> = (0..10u8).map(|i| Node::leaf(vec![i; 8]).unwrap()).collect();
    for leaf in &leaves {
        store.put(leaf).unwrap();
    }

    let packer = Packer::new(3).unwrap();
    assert_eq!(packer.pack(&leaves).unwrap().len(), 4);

    let handles = leaves.iter().map(Node::handle).collect();
    let reduction = packer.reduce(handles, &store).unwrap();

    assert_eq!(reduction.levels, 3);
    assert_eq!(reduction.root.size, 80);
    assert_eq!(store.len().unwrap(), 10 + 4 + 2 + 1);
    assert_eq!(body(&store, &reduction.root.id).links().len(), 2);
}

/// Folders whose files together pass the breakpoint get folder interims
#[test]
fn test_folder_interims_group_files() {
    let temp_dir = TempDir::new().unwrap();
    for i in 0..6u8 {
        write_file(
            temp_dir.path(),
            "batch",
            &format!("part_{}.bin", i),
            &patterned(4 * 1024, i),
        );
    }

    let store = MemoryBlockStore::new();
    let output = build(temp_dir.path(), &store, kib_options(174));

    // 4 + 4 + 4 reaches 10 KiB twice, leaving nothing pending
    assert_eq!(output.stats.folder_interims, 2);
    let folder = body(&store, &output.entries[0].node.id);
    assert_eq!(folder.links().len(), 2);
    assert_eq!(folder.size(), 24 * 1024);

    let paths: Vec<&str> = output.audit.folders[0]
        .nodes
        .iter()
        .map(|n| n.path.as_str())
        .collect();
    assert_eq!(paths, vec!["batch/interim_1", "batch/interim_2"]);
}
