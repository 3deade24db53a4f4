//! Test doubles for the synchronizer's collaborators.
//!
//! The mocks capture every call and can be told to fail, so synchronization
//! runs can be exercised without Git, network access or Node.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{copy_tree, FileSystem, Formatter, LocalFs, SourceControl};
use crate::error::{SyncError, SyncResult};

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCall {
    pub method: String,
    pub args: Vec<String>,
}

impl CapturedCall {
    fn new(method: &str, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            method: method.to_string(),
            args: args.into_iter().collect(),
        }
    }
}

/// Mock source control.
///
/// Clones copy a fixture directory into the destination.
#[derive(Clone)]
pub struct MockSourceControl {
    available: Arc<RwLock<bool>>,
    clean: Arc<RwLock<bool>>,
    fixture: Arc<RwLock<Option<PathBuf>>>,
    clone_failure: Arc<RwLock<Option<String>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
}

impl Default for MockSourceControl {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSourceControl {
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            clean: Arc::new(RwLock::new(true)),
            fixture: Arc::new(RwLock::new(None)),
            clone_failure: Arc::new(RwLock::new(None)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    pub fn set_clean(self, clean: bool) -> Self {
        *self.clean.write() = clean;
        self
    }

    /// Directory whose contents every clone produces.
    pub fn with_fixture(self, dir: impl Into<PathBuf>) -> Self {
        *self.fixture.write() = Some(dir.into());
        self
    }

    /// Make clones fail with `message`.
    pub fn simulate_clone_failure(self, message: impl Into<String>) -> Self {
        *self.clone_failure.write() = Some(message.into());
        self
    }

    pub fn captured_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    fn capture(&self, method: &str, args: impl IntoIterator<Item = String>) {
        self.captured_calls.write().push(CapturedCall::new(method, args));
    }
}

#[async_trait]
impl SourceControl for MockSourceControl {
    async fn is_available(&self) -> bool {
        self.capture("is_available", Vec::<String>::new());
        *self.available.read()
    }

    async fn is_clean(&self, path: &Path) -> SyncResult<bool> {
        self.capture("is_clean", [path.display().to_string()]);
        Ok(*self.clean.read())
    }

    async fn clone_repo(&self, url: &str, reference: Option<&str>, dest: &Path) -> SyncResult<()> {
        self.capture(
            "clone_repo",
            [url.to_string(), reference.unwrap_or_default().to_string()],
        );

        if let Some(message) = self.clone_failure.read().clone() {
            return Err(SyncError::TemplateFetch(message));
        }
        let fixture = self.fixture.read().clone();
        std::fs::create_dir_all(dest).map_err(|e| SyncError::file(dest, e))?;
        if let Some(fixture) = fixture {
            copy_tree(&fixture, dest)?;
        }
        Ok(())
    }
}

/// Formatter that records the files it was asked to format.
#[derive(Clone, Default)]
pub struct RecordingFormatter {
    calls: Arc<RwLock<Vec<Vec<String>>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl RecordingFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.failure.write() = Some(message.into());
        self
    }

    /// File lists of every format call, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.read().clone()
    }
}

#[async_trait]
impl Formatter for RecordingFormatter {
    async fn format(&self, _root: &Path, files: &[String]) -> SyncResult<()> {
        self.calls.write().push(files.to_vec());
        match self.failure.read().clone() {
            Some(message) => Err(SyncError::Format(message)),
            None => Ok(()),
        }
    }
}

/// Local file system that refuses writes to chosen paths.
#[derive(Clone, Default)]
pub struct MockFileSystem {
    inner: LocalFs,
    failing_writes: Arc<RwLock<HashSet<PathBuf>>>,
    writes: Arc<RwLock<Vec<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `path` fail with a permission error.
    pub fn fail_writes_to(self, path: impl Into<PathBuf>) -> Self {
        self.failing_writes.write().insert(path.into());
        self
    }

    /// Paths of successful writes, in order.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.writes.read().clone()
    }
}

#[async_trait]
impl FileSystem for MockFileSystem {
    async fn read_to_string(&self, path: &Path) -> SyncResult<String> {
        self.inner.read_to_string(path).await
    }

    async fn write(&self, path: &Path, contents: &str) -> SyncResult<()> {
        if self.failing_writes.read().contains(path) {
            return Err(SyncError::file(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "write refused"),
            ));
        }
        self.inner.write(path, contents).await?;
        self.writes.write().push(path.to_path_buf());
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> SyncResult<()> {
        self.inner.create_dir_all(path).await
    }

    async fn is_empty_dir(&self, path: &Path) -> SyncResult<bool> {
        self.inner.is_empty_dir(path).await
    }

    async fn copy_dir(&self, from: &Path, to: &Path) -> SyncResult<Vec<String>> {
        self.inner.copy_dir(from, to).await
    }
}
