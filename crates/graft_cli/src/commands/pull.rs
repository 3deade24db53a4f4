//! Pull command - Merge the project template into a project.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use graft_core::{SyncOptions, Synchronizer, DEFAULT_TEMPLATE_URL};

use super::Output;

#[derive(Args)]
pub struct PullArgs {
    /// Project directory to merge the template into
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// Template repository URL
    #[arg(long, env = "GRAFT_TEMPLATE_URL", default_value = DEFAULT_TEMPLATE_URL)]
    pub template_url: String,

    /// Template branch or tag
    #[arg(long = "ref", env = "GRAFT_TEMPLATE_REF")]
    pub template_ref: Option<String>,

    /// Skip formatting structured files after the merge
    #[arg(long)]
    pub no_format: bool,
}

impl PullArgs {
    fn options(&self) -> SyncOptions {
        let options = SyncOptions::new()
            .with_template_url(&self.template_url)
            .with_format(!self.no_format);
        match &self.template_ref {
            Some(reference) => options.with_template_ref(reference),
            None => options,
        }
    }
}

pub async fn execute(args: PullArgs, output: Output) -> Result<()> {
    info!("Pulling {} into {}", args.template_url, args.out.display());

    let report = Synchronizer::new(args.options())
        .pull(&args.out)
        .await
        .with_context(|| format!("Failed to pull project template into {}", args.out.display()))?;

    output.report(
        &report,
        "IQGeo project template pulled successfully! Please check changes to ensure they are correct",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_args() {
        let args = PullArgs {
            out: PathBuf::from("."),
            template_url: "https://example.com/template".to_string(),
            template_ref: Some("v2".to_string()),
            no_format: true,
        };

        let options = args.options();
        assert_eq!(options.template_url, "https://example.com/template");
        assert_eq!(options.template_ref.as_deref(), Some("v2"));
        assert!(!options.format);
    }
}
