//! Update command - Rewrite project files from the configuration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use graft_core::{SyncOptions, Synchronizer};

use super::Output;

pub async fn execute(root: &Path, output: Output) -> Result<()> {
    info!("Updating project in {}", root.display());

    let report = Synchronizer::new(SyncOptions::new())
        .update(root)
        .await
        .with_context(|| format!("Failed to update project in {}", root.display()))?;

    output.report(&report, "Project configured successfully")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_update_without_config_fails() {
        let dir = TempDir::new().unwrap();

        let err = execute(dir.path(), Output::default()).await.unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("Failed to update project"));
        assert!(message.contains(".iqgeorc.jsonc"));
    }

    #[tokio::test]
    async fn test_update_rewrites_env_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".iqgeorc.jsonc"),
            r#"{ "prefix": "nmt", "db_name": "nmt", "platform": { "version": "7.3" } }"#,
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("deployment")).unwrap();
        std::fs::write(
            dir.path().join("deployment/.env.example"),
            "PROJ_PREFIX=myproj\n",
        )
        .unwrap();

        let output = Output {
            json: false,
            quiet: true,
        };
        execute(dir.path(), output).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("deployment/.env.example")).unwrap(),
            "PROJ_PREFIX=nmt\n"
        );
    }
}
