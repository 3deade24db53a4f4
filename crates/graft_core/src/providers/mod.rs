//! Collaborators of a synchronization run.
//!
//! The synchronizer never touches Git, the disk or the formatter directly.
//! Each sits behind a trait so runs can be exercised with test doubles.

mod formatter;
mod fs;
mod git;
pub mod mock;

use std::path::Path;

use async_trait::async_trait;

use crate::error::SyncResult;

pub use formatter::{NoopFormatter, PrettierFormatter};
pub use fs::LocalFs;
pub use git::GitCli;

pub(crate) use fs::copy_tree;

/// Source control operations.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Whether the source control tool can be run.
    async fn is_available(&self) -> bool;

    /// Whether `path` has no uncommitted changes. A path that does not exist
    /// or is outside any repository is clean.
    async fn is_clean(&self, path: &Path) -> SyncResult<bool>;

    /// Shallow-clone `url` at `reference` (default branch when `None`) into
    /// `dest`, leaving a plain directory without repository metadata.
    async fn clone_repo(&self, url: &str, reference: Option<&str>, dest: &Path) -> SyncResult<()>;
}

/// File system operations.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn read_to_string(&self, path: &Path) -> SyncResult<String>;

    /// Write `contents`, creating parent directories.
    async fn write(&self, path: &Path, contents: &str) -> SyncResult<()>;

    async fn exists(&self, path: &Path) -> bool;

    async fn create_dir_all(&self, path: &Path) -> SyncResult<()>;

    async fn is_empty_dir(&self, path: &Path) -> SyncResult<bool>;

    /// Copy every file under `from` into `to`. Returns the copied paths
    /// relative to `from`, `/`-separated.
    async fn copy_dir(&self, from: &Path, to: &Path) -> SyncResult<Vec<String>>;
}

/// Source formatter for structured files.
#[async_trait]
pub trait Formatter: Send + Sync {
    /// Format `files`, given relative to `root`, in place.
    async fn format(&self, root: &Path, files: &[String]) -> SyncResult<()>;
}
