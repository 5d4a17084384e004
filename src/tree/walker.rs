//! Input walker: plans the two-level folder/file traversal

use crate::error::DagError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Walker configuration
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Whether to follow symbolic links (default: false for determinism)
    pub follow_symlinks: bool,
    /// File or folder names to leave out (e.g., ".DS_Store", ".git")
    pub ignore_patterns: Vec<String>,
}

/// A regular file inside an input folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    /// Size reported by metadata at planning time
    pub size: u64,
}

/// One top-level folder of the input and the files found in it
#[derive(Debug)]
pub struct FolderPlan {
    pub name: String,
    pub path: PathBuf,
    pub files: Vec<FileEntry>,
    /// The folder itself could not be listed
    pub error: Option<DagError>,
    /// Entries that could not be inspected
    pub failures: Vec<(PathBuf, DagError)>,
}

impl FolderPlan {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Ordered traversal plan for an input root
#[derive(Debug, Default)]
pub struct InputPlan {
    pub folders: Vec<FolderPlan>,
    /// Entries outside the two-level model (root files, nested folders,
    /// unfollowed links, ignore matches)
    pub ignored: Vec<PathBuf>,
}

impl InputPlan {
    pub fn total_bytes(&self) -> u64 {
        self.folders.iter().map(FolderPlan::total_bytes).sum()
    }

    pub fn file_count(&self) -> usize {
        self.folders.iter().map(|f| f.files.len()).sum()
    }
}

/// Input walker
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    /// Plan the traversal: root subfolders in name order, each with its
    /// regular files in name order.
    ///
    /// Failure to read the root itself is returned as an error. Failures
    /// inside a folder are recorded on its plan so the caller can apply its
    /// error policy.
    pub fn walk(&self) -> Result<InputPlan, DagError> {
        let metadata = fs::metadata(&self.root).map_err(|e| DagError::io(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(DagError::io(
                &self.root,
                io::Error::new(io::ErrorKind::InvalidInput, "input is not a directory"),
            ));
        }

        let mut plan = InputPlan::default();
        for entry in self.list(&self.root) {
            let entry = entry.map_err(|e| walk_error(&self.root, e))?;
            let path = entry.path().to_path_buf();

            if self.should_ignore(&entry) {
                plan.ignored.push(path);
                continue;
            }

            if entry.file_type().is_dir() {
                plan.folders.push(self.plan_folder(&entry, &mut plan.ignored));
            } else {
                debug!(path = %path.display(), "Skipping non-folder entry at input root");
                plan.ignored.push(path);
            }
        }

        Ok(plan)
    }

    fn plan_folder(&self, folder: &DirEntry, ignored: &mut Vec<PathBuf>) -> FolderPlan {
        let path = folder.path().to_path_buf();
        let mut plan = FolderPlan {
            name: entry_name(folder),
            path: path.clone(),
            files: Vec::new(),
            error: None,
            failures: Vec::new(),
        };

        if let Err(e) = fs::read_dir(&path) {
            plan.error = Some(DagError::io(&path, e));
            return plan;
        }

        for entry in self.list(&path) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let failed = e.path().map(Path::to_path_buf).unwrap_or_else(|| path.clone());
                    plan.failures.push((failed.clone(), walk_error(&failed, e)));
                    continue;
                }
            };
            let entry_path = entry.path().to_path_buf();

            if self.should_ignore(&entry) {
                ignored.push(entry_path);
                continue;
            }

            if entry.file_type().is_file() {
                match entry.metadata() {
                    Ok(metadata) => plan.files.push(FileEntry {
                        name: entry_name(&entry),
                        path: entry_path,
                        size: metadata.len(),
                    }),
                    Err(e) => {
                        plan.failures
                            .push((entry_path.clone(), walk_error(&entry_path, e)));
                    }
                }
            } else if entry.file_type().is_dir() {
                warn!(path = %entry_path.display(), "Nested folder not ingested");
                ignored.push(entry_path);
            } else {
                debug!(path = %entry_path.display(), "Skipping non-regular file");
                ignored.push(entry_path);
            }
        }

        plan
    }

    fn list(&self, dir: &Path) -> walkdir::IntoIter {
        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
    }

    /// Check if an entry's name matches an ignore pattern
    fn should_ignore(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.config
            .ignore_patterns
            .iter()
            .any(|pattern| pattern.as_str() == name)
    }
}

fn entry_name(entry: &DirEntry) -> String {
    entry.file_name().to_string_lossy().into_owned()
}

fn walk_error(path: &Path, err: walkdir::Error) -> DagError {
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop detected"));
    DagError::io(path, source)
}
