//! Options for synchronization runs.

use std::path::Path;

use graft_merge::{KeyPath, DEFAULT_OVERWRITE_PATHS};
use graft_templates::CONFIG_FILE_NAME;

/// Repository the template is pulled from by default.
pub const DEFAULT_TEMPLATE_URL: &str = "https://github.com/IQGeo/utils-project-template";

/// Files that carry custom sections, relative to the project root.
pub const DEFAULT_TRACKED_FILES: &[&str] = &[
    ".gitignore",
    ".devcontainer/dockerfile",
    ".devcontainer/docker-compose.yml",
    ".devcontainer/.env.example",
    "deployment/dockerfile.build",
    "deployment/dockerfile.appserver",
    "deployment/dockerfile.tools",
    "deployment/docker-compose.yml",
    "deployment/.env.example",
];

/// A file merged with the custom section merger during a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    /// Comment delimiter the section markers are built from.
    pub delimiter: String,
}

impl TrackedFile {
    /// Tracked file with the delimiter inferred from its extension: `//` for
    /// JSON and script sources, `#` otherwise.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let delimiter = match extension(&path) {
            Some("json" | "jsonc" | "js" | "ts") => "//",
            _ => "#",
        };
        Self {
            delimiter: delimiter.to_string(),
            path,
        }
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Whether the file is formatted after a pull.
    pub fn is_structured(&self) -> bool {
        is_structured(&self.path)
    }
}

pub(crate) fn is_structured(path: &str) -> bool {
    matches!(extension(path), Some("json" | "jsonc" | "yml" | "yaml"))
}

fn extension(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(|e| e.to_str())
}

/// Options for [`crate::Synchronizer`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub template_url: String,
    /// Branch or tag to pull. The default branch when unset.
    pub template_ref: Option<String>,
    /// Configuration file name relative to the project root.
    pub config_file: String,
    pub tracked_files: Vec<TrackedFile>,
    /// Config keys whose project value replaces the template value.
    pub overwrite_paths: Vec<KeyPath>,
    /// Run the formatter over structured files after a pull.
    pub format: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            template_url: DEFAULT_TEMPLATE_URL.to_string(),
            template_ref: None,
            config_file: CONFIG_FILE_NAME.to_string(),
            tracked_files: DEFAULT_TRACKED_FILES.iter().map(|p| TrackedFile::new(*p)).collect(),
            overwrite_paths: DEFAULT_OVERWRITE_PATHS
                .iter()
                .map(|keys| KeyPath::from_keys(keys.iter().copied()))
                .collect(),
            format: true,
        }
    }
}

impl SyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template_url(mut self, url: impl Into<String>) -> Self {
        self.template_url = url.into();
        self
    }

    pub fn with_template_ref(mut self, reference: impl Into<String>) -> Self {
        self.template_ref = Some(reference.into());
        self
    }

    pub fn with_config_file(mut self, name: impl Into<String>) -> Self {
        self.config_file = name.into();
        self
    }

    /// Track `file`, replacing any entry for the same path.
    pub fn with_tracked_file(mut self, file: TrackedFile) -> Self {
        self.tracked_files.retain(|f| f.path != file.path);
        self.tracked_files.push(file);
        self
    }

    pub fn with_tracked_files(mut self, files: Vec<TrackedFile>) -> Self {
        self.tracked_files = files;
        self
    }

    pub fn with_overwrite_path(mut self, path: KeyPath) -> Self {
        if !self.overwrite_paths.contains(&path) {
            self.overwrite_paths.push(path);
        }
        self
    }

    pub fn with_format(mut self, format: bool) -> Self {
        self.format = format;
        self
    }
}
