//! Formatters run over structured files after a pull.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::Formatter;
use crate::error::{SyncError, SyncResult};

/// Runs `npx prettier --write` from the project root.
#[derive(Debug, Clone)]
pub struct PrettierFormatter {
    program: String,
}

impl Default for PrettierFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl PrettierFormatter {
    pub fn new() -> Self {
        Self {
            program: "npx".to_string(),
        }
    }

    /// Use a different launcher than `npx`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl Formatter for PrettierFormatter {
    async fn format(&self, root: &Path, files: &[String]) -> SyncResult<()> {
        if files.is_empty() {
            return Ok(());
        }
        info!("Formatting {} files", files.len());

        let output = Command::new(&self.program)
            .args(["prettier", "--write"])
            .args(files)
            .current_dir(root)
            .output()
            .await
            .map_err(|e| SyncError::Format(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::Format(stderr.trim().to_string()));
        }
        Ok(())
    }
}

/// Leaves files as written.
#[derive(Debug, Clone, Default)]
pub struct NoopFormatter;

#[async_trait]
impl Formatter for NoopFormatter {
    async fn format(&self, _root: &Path, files: &[String]) -> SyncResult<()> {
        debug!("Formatting disabled, leaving {} files as written", files.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prettier_skips_empty_file_list() {
        let formatter = PrettierFormatter::new().with_program("definitely-not-a-real-program");
        assert!(formatter.format(Path::new("."), &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_launcher_is_format_error() {
        let formatter = PrettierFormatter::new().with_program("definitely-not-a-real-program");
        let err = formatter
            .format(Path::new("."), &["a.json".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Format(_)));
    }
}
