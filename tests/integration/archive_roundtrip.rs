//! Archive write, verify, list and extract

use super::test_utils::{kib_options, patterned, write_file};
use dagprep::archive::{extract_archive, list_entries, verify_archive, IndexedArchive};
use dagprep::config::StoreConfig;
use dagprep::error::ArchiveError;
use dagprep::pipeline::{run_build, BuildReport, BuildRequest};
use dagprep::tree::node::NodeKind;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn build_sample(root: &Path) -> (PathBuf, BuildReport) {
    let input = root.join("input");
    write_file(&input, "alpha", "a.bin", &patterned(3000, 1));
    write_file(&input, "alpha", "b.bin", &patterned(12 * 1024, 2));
    write_file(&input, "beta", "only.txt", b"beta contents");

    let output = root.join("sample.car");
    let request = BuildRequest {
        input,
        output: output.clone(),
        ingest: kib_options(8),
        store: StoreConfig::default(),
        audit_log: true,
    };
    let report = run_build(&request).unwrap();
    (output, report)
}

#[test]
fn test_verify_accepts_fresh_archive() {
    let temp_dir = TempDir::new().unwrap();
    let (archive, report) = build_sample(temp_dir.path());

    let verify = verify_archive(&archive).unwrap();
    assert!(verify.is_valid());
    assert_eq!(verify.roots, vec![report.root]);
    assert_eq!(verify.blocks, report.archive.blocks);
    assert_eq!(verify.unreachable_blocks, 0);
    assert_eq!(verify.total_size, 3000 + 12 * 1024 + 13);
}

#[test]
fn test_list_entries_in_folder_order() {
    let temp_dir = TempDir::new().unwrap();
    let (archive, _) = build_sample(temp_dir.path());

    let entries = list_entries(&archive).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert_eq!(entries[0].size, 3000 + 12 * 1024);
    assert_eq!(entries[1].kind, NodeKind::Raw);
}

#[test]
fn test_extract_reproduces_folder_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let (archive, _) = build_sample(temp_dir.path());
    let dest = temp_dir.path().join("restored");

    let report = extract_archive(&archive, &dest).unwrap();
    assert_eq!(report.files, 2);

    let mut alpha = patterned(3000, 1);
    alpha.extend(patterned(12 * 1024, 2));
    assert_eq!(fs::read(dest.join("alpha")).unwrap(), alpha);
    assert_eq!(fs::read(dest.join("beta")).unwrap(), b"beta contents");
}

#[test]
fn test_audit_log_written_next_to_archive() {
    let temp_dir = TempDir::new().unwrap();
    let (_, report) = build_sample(temp_dir.path());

    let audit = report.audit_log.unwrap();
    assert_eq!(audit, temp_dir.path().join("sample.jsonl"));

    let contents = fs::read_to_string(audit).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["root"], report.root.to_hex());
    assert_eq!(lines[1]["path"], "alpha");
    assert_eq!(lines[2]["path"], "beta");
}

#[test]
fn test_tampered_block_detected() {
    let temp_dir = TempDir::new().unwrap();
    let (archive, _) = build_sample(temp_dir.path());

    let mut bytes = fs::read(&archive).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&archive, &bytes).unwrap();

    let verify = verify_archive(&archive).unwrap();
    assert!(!verify.is_valid());
    assert_eq!(verify.corrupt_blocks.len(), 1);

    let dest = temp_dir.path().join("restored");
    assert!(matches!(
        extract_archive(&archive, &dest),
        Err(ArchiveError::Corrupt(_))
    ));
}

#[test]
fn test_truncated_archive_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (archive, _) = build_sample(temp_dir.path());

    let bytes = fs::read(&archive).unwrap();
    fs::write(&archive, &bytes[..bytes.len() - 10]).unwrap();

    let outcome = verify_archive(&archive);
    assert!(outcome.map(|r| !r.is_valid()).unwrap_or(true));
}

#[test]
fn test_foreign_file_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("not_an_archive.car");
    fs::write(&path, b"PK\x03\x04 definitely a zip file").unwrap();

    assert!(matches!(
        IndexedArchive::open(&path),
        Err(ArchiveError::BadMagic)
    ));
}
