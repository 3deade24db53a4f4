//! Error types for synchronization runs.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a synchronization run.
///
/// Problems with individual files never abort a run; they are collected as
/// warnings in the [`crate::SyncReport`].
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Unable to find Git executable")]
    GitNotFound,

    #[error("Working tree must be clean to pull template: uncommitted changes in {0}")]
    DirtyWorkingTree(PathBuf),

    #[error("Failed to pull project template: {0}")]
    TemplateFetch(String),

    #[error("Failed to read configuration file {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    InvalidConfig(#[from] graft_templates::TemplateError),

    #[error("Failed to access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Merge error: {0}")]
    Merge(#[from] graft_merge::MergeError),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Formatting failed: {0}")]
    Format(String),
}

impl SyncError {
    /// Errors raised before any merge work starts.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::GitNotFound | Self::DirtyWorkingTree(_) | Self::TemplateFetch(_)
        )
    }

    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}
