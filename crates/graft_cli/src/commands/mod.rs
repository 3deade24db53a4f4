//! CLI command definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use graft_core::{RunStatus, SyncReport};

pub mod pull;
pub mod update;

/// graft - keep a project in step with its template
#[derive(Parser)]
#[command(name = "graft")]
#[command(version, about = "graft - keep a project in step with its template")]
#[command(long_about = r#"
graft keeps an IQGeo project in step with the project template.

Without a subcommand, graft rewrites the project files from .iqgeorc.jsonc.

COMMANDS:
  pull    → Fetch the template and merge it into the project, then update

EXIT CODES:
  0 - Success (warnings included)
  1 - Precondition or fatal failure
  2 - Invalid arguments
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root to update
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print the run report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull the project template and merge it into the project
    Pull(pull::PullArgs),
}

/// How a command prints its report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn report(&self, report: &SyncReport, success: &str) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(report)?);
            return Ok(());
        }

        for message in report.diagnostics.messages() {
            println!("⚠️  {}", message);
        }
        for warning in &report.warnings {
            println!("⚠️  {}", warning);
        }
        if self.quiet {
            return Ok(());
        }

        match report.status() {
            RunStatus::Success => println!("✅ {}", success),
            RunStatus::SuccessWithWarnings => println!("✅ {} (with warnings)", success),
        }
        if let Some(ms) = report.duration_ms() {
            println!("   {} files in {}ms", report.files.len(), ms);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_command_is_update() {
        let cli = Cli::try_parse_from(["graft", "--root", "project"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.root, PathBuf::from("project"));
    }

    #[test]
    fn test_pull_arguments() {
        let cli = Cli::try_parse_from([
            "graft",
            "pull",
            "--out",
            "project",
            "--ref",
            "v1.4",
            "--no-format",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        let Some(Commands::Pull(args)) = cli.command else {
            panic!("expected pull");
        };
        assert_eq!(args.out, PathBuf::from("project"));
        assert_eq!(args.template_ref.as_deref(), Some("v1.4"));
        assert!(args.no_format);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["graft", "--verbose", "--quiet"]).is_err());
    }
}
