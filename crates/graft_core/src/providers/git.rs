//! Git through the `git` command line.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::SourceControl;
use crate::error::{SyncError, SyncResult};

/// Runs the `git` binary found on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceControl for GitCli {
    async fn is_available(&self) -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn is_clean(&self, path: &Path) -> SyncResult<bool> {
        if !path.exists() {
            return Ok(true);
        }

        let output = Command::new("git")
            .args(["status", "--porcelain", "--", "."])
            .current_dir(path)
            .output()
            .await
            .map_err(|e| SyncError::Git(format!("Failed to run git status: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("not a git repository") {
                debug!("{} is not inside a repository", path.display());
                return Ok(true);
            }
            return Err(SyncError::Git(format!("git status failed: {}", stderr.trim())));
        }

        Ok(output.stdout.iter().all(u8::is_ascii_whitespace))
    }

    async fn clone_repo(&self, url: &str, reference: Option<&str>, dest: &Path) -> SyncResult<()> {
        info!("Cloning {} into {}", url, dest.display());

        let mut command = Command::new("git");
        command.args(["clone", "--quiet", "--depth=1"]);
        if let Some(reference) = reference {
            command.args(["--branch", reference]);
        }
        let output = command
            .arg(url)
            .arg(dest)
            .output()
            .await
            .map_err(|e| SyncError::TemplateFetch(format!("Failed to run git clone: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::TemplateFetch(stderr.trim().to_string()));
        }

        match tokio::fs::remove_dir_all(dest.join(".git")).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::file(dest.join(".git"), e)),
        }
    }
}
