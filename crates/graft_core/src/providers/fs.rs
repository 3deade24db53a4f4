//! Local disk access.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;

use super::FileSystem;
use crate::error::{SyncError, SyncResult};

/// [`FileSystem`] backed by `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for LocalFs {
    async fn read_to_string(&self, path: &Path) -> SyncResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SyncError::file(path, e))
    }

    async fn write(&self, path: &Path, contents: &str) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::file(parent, e))?;
        }
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| SyncError::file(path, e))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn create_dir_all(&self, path: &Path) -> SyncResult<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| SyncError::file(path, e))
    }

    async fn is_empty_dir(&self, path: &Path) -> SyncResult<bool> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| SyncError::file(path, e))?;
        let first = entries
            .next_entry()
            .await
            .map_err(|e| SyncError::file(path, e))?;
        Ok(first.is_none())
    }

    async fn copy_dir(&self, from: &Path, to: &Path) -> SyncResult<Vec<String>> {
        let (from, to) = (from.to_path_buf(), to.to_path_buf());
        tokio::task::spawn_blocking(move || copy_tree(&from, &to))
            .await
            .map_err(io::Error::other)?
    }
}

/// Recursively copy the files under `from` into `to`.
pub(crate) fn copy_tree(from: &Path, to: &Path) -> SyncResult<Vec<String>> {
    let mut copied = Vec::new();

    for entry in WalkDir::new(from).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| SyncError::Io(e.into()))?;
        let Ok(rel) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(rel);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| SyncError::file(&target, e))?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SyncError::file(parent, e))?;
            }
            std::fs::copy(entry.path(), &target).map_err(|e| SyncError::file(&target, e))?;
            copied.push(relative_name(rel));
        }
    }

    debug!("Copied {} files from {}", copied.len(), from.display());
    Ok(copied)
}

fn relative_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c.txt");

        LocalFs.write(&path, "hello").await.unwrap();

        assert_eq!(LocalFs.read_to_string(&path).await.unwrap(), "hello");
        assert!(LocalFs.exists(&path).await);
    }

    #[tokio::test]
    async fn test_read_missing_file_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.txt");

        let err = LocalFs.read_to_string(&path).await.unwrap_err();
        assert!(err.to_string().contains("missing.txt"));
    }

    #[tokio::test]
    async fn test_is_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(LocalFs.is_empty_dir(dir.path()).await.unwrap());

        std::fs::write(dir.path().join("file"), "").unwrap();
        assert!(!LocalFs.is_empty_dir(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_dir_returns_relative_paths() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        std::fs::create_dir_all(src.path().join(".devcontainer")).unwrap();
        std::fs::write(src.path().join(".devcontainer/dockerfile"), "FROM x").unwrap();
        std::fs::write(src.path().join("README.md"), "# readme").unwrap();

        let copied = LocalFs.copy_dir(src.path(), dst.path()).await.unwrap();

        assert_eq!(copied, vec![".devcontainer/dockerfile", "README.md"]);
        assert_eq!(
            std::fs::read_to_string(dst.path().join(".devcontainer/dockerfile")).unwrap(),
            "FROM x"
        );
    }
}
