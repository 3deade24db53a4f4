//! Outcome of a synchronization run.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use graft_merge::MergeDiagnostics;
use serde::Serialize;

/// Which command produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Pull,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pull => write!(f, "pull"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    /// Template copy written because the project had none.
    Copied,
    /// Template and project copies merged.
    Merged,
    /// Rewritten by a transform.
    Transformed,
    /// Nothing to write.
    Unchanged,
    /// Matched `exclude_file_paths`.
    Excluded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: String,
    pub action: FileAction,
}

/// A per-file problem that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncWarning {
    pub path: String,
    pub message: String,
}

impl SyncWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    SuccessWithWarnings,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub operation: Operation,
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub files: Vec<FileOutcome>,
    pub warnings: Vec<SyncWarning>,
    /// Configuration merge diagnostics.
    pub diagnostics: MergeDiagnostics,
}

impl SyncReport {
    pub fn new(operation: Operation, root: impl Into<PathBuf>) -> Self {
        Self {
            operation,
            root: root.into(),
            started_at: Utc::now(),
            finished_at: None,
            files: Vec::new(),
            warnings: Vec::new(),
            diagnostics: MergeDiagnostics::new(),
        }
    }

    pub fn status(&self) -> RunStatus {
        if self.warnings.is_empty() && !self.diagnostics.has_warnings() {
            RunStatus::Success
        } else {
            RunStatus::SuccessWithWarnings
        }
    }

    pub fn record(&mut self, path: impl Into<String>, action: FileAction) {
        self.files.push(FileOutcome {
            path: path.into(),
            action,
        });
    }

    pub fn warn(&mut self, warning: SyncWarning) {
        self.warnings.push(warning);
    }

    /// Paths with the given action, in recording order.
    pub fn paths_with(&self, action: FileAction) -> Vec<&str> {
        self.files
            .iter()
            .filter(|f| f.action == action)
            .map(|f| f.path.as_str())
            .collect()
    }

    /// The action last recorded for `path`.
    pub fn action_for(&self, path: &str) -> Option<FileAction> {
        self.files.iter().rev().find(|f| f.path == path).map(|f| f.action)
    }

    /// Fold a nested run into this one.
    pub fn absorb(&mut self, other: SyncReport) {
        self.files.extend(other.files);
        self.warnings.extend(other.warnings);
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}
