//! Synchronization runs.
//!
//! `update` rewrites a project in place from its configuration. `pull` fetches
//! the project template, merges it into the project and then runs `update`.

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use graft_merge::{ConfigMerger, CustomSectionMerger};
use graft_templates::{
    BuiltinDependencies, DependencyLookup, ExcludeSet, ProjectConfig, ResolvedConfig,
    TransformContext, TransformFn, TransformRegistry,
};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::options::{is_structured, SyncOptions, TrackedFile};
use crate::providers::{
    FileSystem, Formatter, GitCli, LocalFs, NoopFormatter, PrettierFormatter, SourceControl,
};
use crate::report::{FileAction, Operation, SyncReport, SyncWarning};

/// A file the pull will write.
#[derive(Debug)]
struct PendingWrite {
    path: String,
    content: String,
    action: FileAction,
}

/// What planning one tracked file produced.
#[derive(Debug)]
enum Planned {
    Write(PendingWrite),
    Unchanged,
    Skipped(SyncWarning),
}

/// Runs `pull` and `update` against injected collaborators.
pub struct Synchronizer {
    scm: Arc<dyn SourceControl>,
    fs: Arc<dyn FileSystem>,
    formatter: Arc<dyn Formatter>,
    deps: Arc<dyn DependencyLookup>,
    registry: TransformRegistry,
    options: SyncOptions,
}

impl Synchronizer {
    /// Synchronizer using Git, the local disk and the builtin transforms.
    /// Prettier formats structured files unless `options.format` is off.
    pub fn new(options: SyncOptions) -> Self {
        let formatter: Arc<dyn Formatter> = if options.format {
            Arc::new(PrettierFormatter::new())
        } else {
            Arc::new(NoopFormatter)
        };
        Self {
            scm: Arc::new(GitCli::new()),
            fs: Arc::new(LocalFs::new()),
            formatter,
            deps: Arc::new(BuiltinDependencies),
            registry: TransformRegistry::builtin(),
            options,
        }
    }

    pub fn with_source_control(mut self, scm: Arc<dyn SourceControl>) -> Self {
        self.scm = scm;
        self
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_dependencies(mut self, deps: Arc<dyn DependencyLookup>) -> Self {
        self.deps = deps;
        self
    }

    pub fn with_registry(mut self, registry: TransformRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Apply every registered transform to the project at `root`, in place.
    ///
    /// Fails only when the configuration cannot be read or is invalid. Files
    /// that cannot be read or written become warnings.
    pub async fn update(&self, root: &Path) -> SyncResult<SyncReport> {
        let mut report = SyncReport::new(Operation::Update, root);
        let config = self.load_config(root).await?;

        for message in &config.warnings {
            warn!("{}", message);
            report.warn(SyncWarning::new(&self.options.config_file, message.clone()));
        }

        let ctx = TransformContext::new(&config, self.deps.as_ref());
        let jobs = self
            .registry
            .iter()
            .map(|(path, transform)| {
                self.transform_file(root, path, transform, ctx, &config.excludes)
            });

        for (path, outcome) in join_all(jobs).await {
            match outcome {
                Ok(action) => report.record(path, action),
                Err(warning) => {
                    warn!("{}", warning);
                    report.warn(warning);
                }
            }
        }

        let report = report.finish();
        info!(
            transformed = report.paths_with(FileAction::Transformed).len(),
            warnings = report.warnings.len(),
            "Project updated"
        );
        Ok(report)
    }

    /// Pull the project template into `out` and merge it with the project.
    ///
    /// Fails before any file is touched when Git is missing, the working tree
    /// is dirty or the template cannot be fetched.
    pub async fn pull(&self, out: &Path) -> SyncResult<SyncReport> {
        let mut report = SyncReport::new(Operation::Pull, out);
        self.check_preconditions(out).await?;

        let scratch = tempfile::TempDir::new()?;
        let template = scratch.path().join("template");
        self.scm
            .clone_repo(
                &self.options.template_url,
                self.options.template_ref.as_deref(),
                &template,
            )
            .await
            .map_err(|e| match e {
                SyncError::TemplateFetch(_) => e,
                other => SyncError::TemplateFetch(other.to_string()),
            })?;

        self.fs.create_dir_all(out).await?;
        if self.fs.is_empty_dir(out).await? {
            let copied = self.fs.copy_dir(&template, out).await?;
            info!(
                "Copied {} template files into empty directory {}",
                copied.len(),
                out.display()
            );
            for path in copied {
                report.record(path, FileAction::Copied);
            }
            return Ok(report.finish());
        }

        let mut writes = Vec::new();
        let excludes = match self.plan_config(&template, out, &mut report).await {
            Some((pending, config_text)) => {
                let excludes = excludes_of(&config_text);
                writes.extend(pending);
                excludes
            }
            None => ExcludeSet::default(),
        };

        let tracked: Vec<&TrackedFile> = self
            .options
            .tracked_files
            .iter()
            .filter(|file| {
                let excluded = excludes.is_excluded(&file.path);
                if excluded {
                    debug!("Skipping excluded file {}", file.path);
                    report.record(file.path.clone(), FileAction::Excluded);
                }
                !excluded
            })
            .collect();
        let plans = join_all(
            tracked
                .iter()
                .map(|file| self.plan_tracked(&template, out, file)),
        )
        .await;

        for (file, plan) in tracked.iter().zip(plans) {
            match plan {
                Planned::Write(write) => writes.push(write),
                Planned::Unchanged => report.record(file.path.clone(), FileAction::Unchanged),
                Planned::Skipped(warning) => {
                    warn!("{}", warning);
                    report.warn(warning);
                }
            }
        }

        let write_failures = self.write_all(out, writes, &mut report).await;

        let structured: Vec<String> = report
            .files
            .iter()
            .filter(|f| matches!(f.action, FileAction::Copied | FileAction::Merged))
            .filter(|f| is_structured(&f.path))
            .map(|f| f.path.clone())
            .collect();
        if !structured.is_empty() {
            if let Err(e) = self.formatter.format(out, &structured).await {
                let warning = SyncWarning::new(
                    structured.join(", "),
                    format!("Failed to format files: {}", e),
                );
                warn!("{}", warning);
                report.warn(warning);
            }
        }

        if write_failures == 0 {
            match self.update(out).await {
                Ok(update) => report.absorb(update),
                Err(e) => {
                    warn!("Failed to update project files: {}", e);
                    report.warn(SyncWarning::new(
                        &self.options.config_file,
                        format!("Failed to update project files: {}", e),
                    ));
                }
            }
        } else {
            warn!("{} files could not be written, skipping update", write_failures);
        }

        let report = report.finish();
        info!(
            merged = report.paths_with(FileAction::Merged).len(),
            copied = report.paths_with(FileAction::Copied).len(),
            warnings = report.warnings.len(),
            "Project template pulled"
        );
        Ok(report)
    }

    async fn check_preconditions(&self, out: &Path) -> SyncResult<()> {
        if !self.scm.is_available().await {
            return Err(SyncError::GitNotFound);
        }
        if !self.scm.is_clean(out).await? {
            return Err(SyncError::DirtyWorkingTree(out.to_path_buf()));
        }
        Ok(())
    }

    async fn load_config(&self, root: &Path) -> SyncResult<ResolvedConfig> {
        let path = root.join(&self.options.config_file);
        let text = self
            .fs
            .read_to_string(&path)
            .await
            .map_err(|e| SyncError::Config {
                path: path.clone(),
                message: match e {
                    SyncError::File { source, .. } => source.to_string(),
                    other => other.to_string(),
                },
            })?;
        Ok(ResolvedConfig::from_jsonc(&text, self.deps.as_ref())?)
    }

    async fn transform_file(
        &self,
        root: &Path,
        rel_path: &str,
        transform: TransformFn,
        ctx: TransformContext<'_>,
        excludes: &ExcludeSet,
    ) -> (String, Result<FileAction, SyncWarning>) {
        if excludes.is_excluded(rel_path) {
            debug!("Skipping excluded file {}", rel_path);
            return (rel_path.to_string(), Ok(FileAction::Excluded));
        }

        let path = root.join(rel_path);
        let content = match self.fs.read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                return (
                    rel_path.to_string(),
                    Err(SyncWarning::new(rel_path, format!("Failed to read file: {}", e))),
                )
            }
        };

        let updated = transform(&ctx, &content);
        if updated == content {
            debug!("{} is up to date", rel_path);
            return (rel_path.to_string(), Ok(FileAction::Unchanged));
        }

        let outcome = match self.fs.write(&path, &updated).await {
            Ok(()) => {
                debug!("Updated {}", rel_path);
                Ok(FileAction::Transformed)
            }
            Err(e) => Err(SyncWarning::new(rel_path, format!("Failed to write file: {}", e))),
        };
        (rel_path.to_string(), outcome)
    }

    /// Merge the configuration file. Returns the pending write, if any, and
    /// the configuration text the project ends up with.
    async fn plan_config(
        &self,
        template_dir: &Path,
        out: &Path,
        report: &mut SyncReport,
    ) -> Option<(Option<PendingWrite>, String)> {
        let name = &self.options.config_file;
        let template = match self.fs.read_to_string(&template_dir.join(name)).await {
            Ok(text) => text,
            Err(e) => {
                report.warn(SyncWarning::new(
                    name,
                    format!("Template has no configuration file: {}", e),
                ));
                return None;
            }
        };

        let project_path = out.join(name);
        if !self.fs.exists(&project_path).await {
            info!("{} not found in project, copying it from the template", name);
            let write = PendingWrite {
                path: name.clone(),
                content: template.clone(),
                action: FileAction::Copied,
            };
            return Some((Some(write), template));
        }

        let project = match self.fs.read_to_string(&project_path).await {
            Ok(text) => text,
            Err(e) => {
                report.warn(SyncWarning::new(name, format!("Failed to read file: {}", e)));
                return None;
            }
        };

        let merger = ConfigMerger::new().with_overwrite_paths(self.options.overwrite_paths.clone());
        let merged = match merger.merge(&project, &template) {
            Ok(merged) => merged,
            Err(e) => {
                warn!("Failed to merge {}: {}", name, e);
                report.warn(SyncWarning::new(
                    name,
                    format!("Failed to merge configuration: {}", e),
                ));
                return Some((None, project));
            }
        };

        for message in merged.diagnostics.messages() {
            warn!("{}", message);
        }
        for path in &merged.diagnostics.missing_keys {
            info!("Adding \"{}\" from the template", path);
        }
        report.diagnostics.extend(merged.diagnostics);

        if merged.text == project {
            report.record(name.clone(), FileAction::Unchanged);
            return Some((None, project));
        }
        let write = PendingWrite {
            path: name.clone(),
            content: merged.text.clone(),
            action: FileAction::Merged,
        };
        Some((Some(write), merged.text))
    }

    async fn plan_tracked(&self, template_dir: &Path, out: &Path, file: &TrackedFile) -> Planned {
        let template = match self.fs.read_to_string(&template_dir.join(&file.path)).await {
            Ok(text) => text,
            Err(e) => {
                return Planned::Skipped(SyncWarning::new(
                    &file.path,
                    format!("Template does not provide this file: {}", e),
                ))
            }
        };

        let project_path = out.join(&file.path);
        if !self.fs.exists(&project_path).await {
            info!("{} not found in project, copying it from the template", file.path);
            return Planned::Write(PendingWrite {
                path: file.path.clone(),
                content: template,
                action: FileAction::Copied,
            });
        }

        let project = match self.fs.read_to_string(&project_path).await {
            Ok(text) => text,
            Err(e) => {
                return Planned::Skipped(SyncWarning::new(
                    &file.path,
                    format!("Failed to read file: {}", e),
                ))
            }
        };
        if project == template {
            return Planned::Unchanged;
        }

        let merge = CustomSectionMerger::new(&file.delimiter).merge(&template, &project);
        if merge.malformed {
            warn!(
                "{} has a custom section that is never closed, its custom content was not kept",
                file.path
            );
        }
        if merge.discarded_lines > 0 {
            debug!(
                "{}: discarded {} lines outside custom sections",
                file.path, merge.discarded_lines
            );
        }
        if merge.text == project {
            return Planned::Unchanged;
        }
        Planned::Write(PendingWrite {
            path: file.path.clone(),
            content: merge.text,
            action: FileAction::Merged,
        })
    }

    /// Write every pending file concurrently. Returns the number of failures.
    async fn write_all(&self, out: &Path, writes: Vec<PendingWrite>, report: &mut SyncReport) -> usize {
        let paths: Vec<_> = writes.iter().map(|write| out.join(&write.path)).collect();
        let results = join_all(
            writes
                .iter()
                .zip(&paths)
                .map(|(write, path)| self.fs.write(path, &write.content)),
        )
        .await;

        let mut failures = 0;
        for (write, result) in writes.into_iter().zip(results) {
            match result {
                Ok(()) => report.record(write.path, write.action),
                Err(e) => {
                    failures += 1;
                    let warning = SyncWarning::new(write.path, format!("Failed to write file: {}", e));
                    warn!("{}", warning);
                    report.warn(warning);
                }
            }
        }
        failures
    }
}

/// Exclusions of a configuration document. Unreadable documents exclude
/// nothing here; `update` reports them.
fn excludes_of(config: &str) -> ExcludeSet {
    ProjectConfig::from_jsonc(config)
        .and_then(|config| ExcludeSet::new(&config.exclude_file_paths))
        .unwrap_or_else(|e| {
            debug!("Ignoring exclusions: {}", e);
            ExcludeSet::default()
        })
}
