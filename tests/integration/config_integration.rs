//! Configuration loading as used by a build

use dagprep::config::{ConfigLoader, DagprepConfig, StoreBackend};
use dagprep::pipeline::BuildRequest;
use dagprep::tree::builder::{EmptyFolderPolicy, ErrorPolicy};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_file_config_drives_build_request() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("dagprep.toml");
    fs::write(
        &config_path,
        r#"
[ingest]
chunk_size = "64k"
breakpoint = "1m"
error_policy = "skip"
empty_folders = "empty-dir"
ignore = [".DS_Store", "Thumbs.db"]

[store]
backend = "sled"
path = "blocks"

[output]
path = "out/run.car"
audit_log = false
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_path).unwrap();
    config.check().unwrap();

    let request = BuildRequest::from_config(PathBuf::from("input"), &config);
    assert_eq!(request.output, PathBuf::from("out/run.car"));
    assert_eq!(request.ingest.chunk_size, 64 << 10);
    assert_eq!(request.ingest.breakpoint, 1 << 20);
    // 1 MiB / 64 KiB + 1 is below the default links per block
    assert_eq!(request.ingest.max_links, 174);
    assert_eq!(request.ingest.error_policy, ErrorPolicy::Skip);
    assert_eq!(request.ingest.empty_folders, EmptyFolderPolicy::EmptyDirectory);
    assert_eq!(request.ingest.walker.ignore_patterns.len(), 2);
    assert_eq!(request.store.backend, StoreBackend::Sled);
    assert!(!request.audit_log);
}

#[test]
fn test_default_request_uses_timestamped_output() {
    let request = BuildRequest::from_config(PathBuf::from("input"), &DagprepConfig::default());
    let name = request.output.to_string_lossy().into_owned();
    assert!(name.starts_with("dagprep_") && name.ends_with(".car"));
    assert!(request.audit_log);
    assert_eq!(request.store.backend, StoreBackend::Memory);
}

#[test]
fn test_invalid_values_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bad.toml");

    fs::write(&config_path, "[ingest]\nchunk_size = \"huge\"\n").unwrap();
    assert!(ConfigLoader::load_from_file(&config_path).is_err());

    fs::write(&config_path, "[ingest]\nerror_policy = \"retry\"\n").unwrap();
    assert!(ConfigLoader::load_from_file(&config_path).is_err());

    fs::write(&config_path, "[store]\nbackend = \"sled\"\n").unwrap();
    let config = ConfigLoader::load_from_file(&config_path).unwrap();
    assert!(config.check().is_err());
}
