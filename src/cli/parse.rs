//! CLI parse: clap types for dagprep. No behavior; definitions only.

use crate::config::ByteSize;
use crate::tree::builder::{EmptyFolderPolicy, ErrorPolicy};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dagprep CLI - pack directory trees into Merkle DAG archives
#[derive(Parser)]
#[command(name = "dagprep", version)]
#[command(about = "Pack a directory tree into a content-addressed Merkle DAG archive")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (where config/ is looked up)
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (replaces global, workspace and environment config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pack a directory of folders into an archive
    Build {
        /// Input directory; each subfolder becomes a root entry
        input: PathBuf,

        /// Archive path (default: dagprep_<unix-ts>.car)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Persistent block store directory (default: in memory)
        #[arg(short = 'd', long = "store")]
        store: Option<PathBuf>,

        /// Keep the persistent store directory after the run
        #[arg(long)]
        keep_store: bool,

        /// Leaf chunk size (e.g. 1048576, 512k, 1m)
        #[arg(short, long)]
        chunk_size: Option<ByteSize>,

        /// Bytes accumulated before an interim node is flushed
        #[arg(short = 'i', long)]
        breakpoint: Option<ByteSize>,

        /// Maximum links per parent node
        #[arg(short, long)]
        max_links: Option<usize>,

        /// Behavior on unreadable files or folders (abort, skip)
        #[arg(long)]
        on_error: Option<ErrorPolicy>,

        /// How folders without content appear (omit, empty-dir)
        #[arg(long)]
        empty_folders: Option<EmptyFolderPolicy>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Skip the audit log
        #[arg(long)]
        no_audit: bool,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Check block hashes, links and sizes of an archive
    Verify {
        archive: PathBuf,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Rebuild the archived folders under a destination directory
    Extract { archive: PathBuf, dest: PathBuf },
    /// List the root entries of an archive
    Ls {
        archive: PathBuf,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the effective configuration as TOML
    Config,
}
