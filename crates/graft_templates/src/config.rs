//! Project configuration.
//!
//! The project root carries a `.iqgeorc.jsonc` file describing the project,
//! its platform options and its modules. [`ProjectConfig`] is the document as
//! written; [`ResolvedConfig`] is the normalized, validated form the
//! transforms work from.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::deps::{DependencyLookup, LookupKind};
use crate::error::{TemplateError, TemplateResult};

/// Name of the configuration file at the project root.
pub const CONFIG_FILE_NAME: &str = ".iqgeorc.jsonc";

/// Registry used when the configuration names none.
pub const DEFAULT_REGISTRY: &str = "harbor.delivery.iqgeo.cloud/releases";

/// The configuration document as written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub exclude_file_paths: Vec<String>,
}

/// Platform version and optional platform dependencies per image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub devenv: Vec<String>,
    #[serde(default)]
    pub appserver: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
}

/// A product or custom module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_init: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_grep: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_version: Option<String>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_dev_src(mut self, dev_src: impl Into<String>) -> Self {
        self.dev_src = Some(dev_src.into());
        self
    }

    /// Released module, pulled from an injector image.
    pub fn is_external(&self) -> bool {
        self.version.is_some()
    }

    /// Module with sources in the project tree.
    pub fn is_local(&self) -> bool {
        self.version.is_none() || self.dev_src.is_some()
    }

    pub fn dev_only(&self) -> bool {
        self.dev_only.unwrap_or(false)
    }

    /// Whether the module installs into the database. Released modules do by
    /// default.
    pub fn db_init(&self) -> bool {
        self.db_init.unwrap_or(self.version.is_some())
    }
}

/// Outcome of checking a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.valid = false;
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

impl ProjectConfig {
    /// Parse a JSONC configuration document.
    pub fn from_jsonc(text: &str) -> TemplateResult<Self> {
        let root = graft_merge::parse_tree(text)?;
        Ok(serde_json::from_value(root.to_value())?)
    }

    /// Check module names and exclude patterns.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        let mut seen = HashSet::new();
        for (index, module) in self.modules.iter().enumerate() {
            let name = module.name.trim();
            if name.is_empty() {
                result.add_error(format!("Module at index {} has an empty name", index));
            } else if !seen.insert(name) {
                result.add_error(format!("Duplicate module name '{}'", name));
            }
        }

        for pattern in &self.exclude_file_paths {
            if let Err(e) = Regex::new(pattern) {
                result.add_error(format!("Invalid exclude pattern '{}': {}", pattern, e));
            }
        }

        if self.prefix.is_none() {
            result.add_warning("No 'prefix' configured, prefix substitutions are skipped");
        }
        if self.platform.version.is_none() {
            result.add_warning("No 'platform.version' configured, image tags are left unchanged");
        }

        result
    }
}

/// Normalized module.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModule {
    pub name: String,
    pub version: Option<String>,
    /// Version without dots, e.g. `3.1.2` -> `312`.
    pub short_version: Option<String>,
    pub dev_only: bool,
    /// Directory of the module sources, relative to the project's parent.
    pub dev_src: Option<String>,
    pub db_init: bool,
    pub schema_grep: Option<String>,
    pub schema_version_name: Option<String>,
}

impl ResolvedModule {
    pub fn is_external(&self) -> bool {
        self.version.is_some()
    }

    pub fn is_local(&self) -> bool {
        self.version.is_none() || self.dev_src.is_some()
    }
}

/// Compiled `exclude_file_paths` patterns.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<Regex>,
}

impl ExcludeSet {
    pub fn new<I, S>(patterns: I) -> TemplateResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| TemplateError::InvalidExclude {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<TemplateResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Whether a `/`-separated path relative to the project root matches any
    /// pattern anywhere.
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(rel_path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Normalized configuration.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub prefix: Option<String>,
    pub db_name: Option<String>,
    pub registry: String,
    pub version: Option<String>,
    pub platform: Platform,
    pub modules: Vec<ResolvedModule>,
    pub excludes: ExcludeSet,
    /// Validation warnings.
    pub warnings: Vec<String>,
}

impl ResolvedConfig {
    /// Validate and normalize `config`.
    pub fn resolve(config: ProjectConfig, deps: &dyn DependencyLookup) -> TemplateResult<Self> {
        let validation = config.validate();
        if !validation.valid {
            return Err(TemplateError::InvalidConfig(validation.errors.join("; ")));
        }
        let excludes = ExcludeSet::new(&config.exclude_file_paths)?;

        let mut platform = config.platform;
        let mut modules = Vec::with_capacity(config.modules.len());

        for module in config.modules {
            let appserver = deps
                .resolve(&module.name, LookupKind::ModuleAppserver)
                .unwrap_or_default();
            let tools = deps
                .resolve(&module.name, LookupKind::ModuleTools)
                .unwrap_or_default();
            if !appserver.is_empty() || !tools.is_empty() {
                debug!(module = %module.name, ?appserver, ?tools, "Adding module platform dependencies");
            }
            extend_unique(&mut platform.devenv, appserver.iter().chain(&tools));
            extend_unique(&mut platform.tools, &tools);
            extend_unique(&mut platform.appserver, &appserver);

            modules.push(resolve_module(module, deps));
        }

        Ok(Self {
            name: config.name,
            display_name: config.display_name,
            prefix: config.prefix,
            db_name: config.db_name,
            registry: config
                .registry
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_REGISTRY.to_string()),
            version: config.version,
            platform,
            modules,
            excludes,
            warnings: validation.warnings,
        })
    }

    /// Parse, validate and normalize a JSONC configuration document.
    pub fn from_jsonc(text: &str, deps: &dyn DependencyLookup) -> TemplateResult<Self> {
        Self::resolve(ProjectConfig::from_jsonc(text)?, deps)
    }

    pub fn module(&self, name: &str) -> Option<&ResolvedModule> {
        self.modules.iter().find(|m| m.name == name)
    }
}

fn resolve_module(module: Module, deps: &dyn DependencyLookup) -> ResolvedModule {
    let dev_only = module.dev_only();
    let db_init = module.db_init();

    let short_version = module
        .short_version
        .or_else(|| module.version.as_ref().map(|v| v.replace('.', "")));
    let dev_src = match (&module.version, module.dev_src) {
        (None, None) => Some(module.name.clone()),
        (_, dev_src) => dev_src,
    };
    let schema_version_name = module
        .schema_version_name
        .or_else(|| deps.schema_version_name(&module.name))
        .or_else(|| {
            (module.db_init == Some(true)).then(|| format!("{}_schema", module.name))
        });

    ResolvedModule {
        name: module.name,
        version: module.version,
        short_version,
        dev_only,
        dev_src,
        db_init,
        schema_grep: module.schema_grep,
        schema_version_name,
    }
}

fn extend_unique<'a>(list: &mut Vec<String>, items: impl IntoIterator<Item = &'a String>) {
    for item in items {
        if !list.contains(item) {
            list.push(item.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::{BuiltinDependencies, TableDependencies};

    const CONFIG: &str = r#"{
        // project identity
        "name": "nmt",
        "display_name": "Network Manager Telecom",
        "prefix": "nmt",
        "db_name": "nmt",
        "platform": { "version": "7.3", "devenv": ["ldap"] },
        "modules": [
            { "name": "custom" },
            { "name": "comms", "version": "3.3.1" },
            { "name": "network_revenue_optimizer", "version": "1.0", "devSrc": "nro" },
            { "name": "mine", "dbInit": true },
        ],
        "exclude_file_paths": ["^deployment/"],
    }"#;

    #[test]
    fn test_parse_jsonc() {
        let config = ProjectConfig::from_jsonc(CONFIG).unwrap();

        assert_eq!(config.name.as_deref(), Some("nmt"));
        assert_eq!(config.platform.devenv, vec!["ldap"]);
        assert!(config.platform.tools.is_empty());
        assert_eq!(config.modules.len(), 4);
        assert_eq!(config.modules[2].dev_src.as_deref(), Some("nro"));
        assert_eq!(config.modules[3].db_init, Some(true));
    }

    #[test]
    fn test_resolve_normalizes() {
        let resolved = ResolvedConfig::from_jsonc(CONFIG, &BuiltinDependencies).unwrap();

        assert_eq!(resolved.registry, DEFAULT_REGISTRY);

        let custom = resolved.module("custom").unwrap();
        assert_eq!(custom.dev_src.as_deref(), Some("custom"));
        assert!(!custom.db_init);
        assert_eq!(custom.schema_version_name, None);

        let comms = resolved.module("comms").unwrap();
        assert_eq!(comms.short_version.as_deref(), Some("331"));
        assert_eq!(comms.dev_src, None);
        assert!(comms.db_init);
        assert_eq!(comms.schema_version_name.as_deref(), Some("myw_comms_schema"));

        let nro = resolved.module("network_revenue_optimizer").unwrap();
        assert!(nro.is_external() && nro.is_local());

        let mine = resolved.module("mine").unwrap();
        assert!(mine.db_init);
        assert_eq!(mine.schema_version_name.as_deref(), Some("mine_schema"));

        // osm comes in with network_revenue_optimizer
        assert_eq!(resolved.platform.devenv, vec!["ldap", "osm"]);
        assert_eq!(resolved.platform.tools, vec!["osm"]);
        assert!(resolved.platform.appserver.is_empty());

        assert!(resolved.excludes.is_excluded("deployment/dockerfile.build"));
        assert!(!resolved.excludes.is_excluded(".devcontainer/dockerfile"));
    }

    #[test]
    fn test_injected_lookup_replaces_tables() {
        let deps = TableDependencies::new()
            .with(LookupKind::SchemaVersionName, "comms", ["comms_v2"])
            .with(LookupKind::ModuleAppserver, "comms", ["memcached"]);
        let resolved = ResolvedConfig::from_jsonc(CONFIG, &deps).unwrap();

        let comms = resolved.module("comms").unwrap();
        assert_eq!(comms.schema_version_name.as_deref(), Some("comms_v2"));
        assert_eq!(resolved.platform.appserver, vec!["memcached"]);
        assert!(resolved.platform.tools.is_empty());
    }

    #[test]
    fn test_duplicate_module_names_rejected() {
        let config = ProjectConfig {
            modules: vec![Module::new("comms"), Module::new("comms").with_version("1.0")],
            ..ProjectConfig::default()
        };

        let validation = config.validate();
        assert!(!validation.valid);
        assert!(validation.errors[0].contains("Duplicate module name 'comms'"));

        let err = ResolvedConfig::resolve(config, &BuiltinDependencies).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidConfig(_)));
    }

    #[test]
    fn test_empty_module_name_and_bad_pattern_rejected() {
        let config = ProjectConfig {
            modules: vec![Module::new(" ")],
            exclude_file_paths: vec!["([".to_string()],
            ..ProjectConfig::default()
        };

        let validation = config.validate();
        assert_eq!(validation.errors.len(), 2);
        assert!(validation.warnings.iter().any(|w| w.contains("prefix")));
    }

    #[test]
    fn test_structure_errors() {
        assert!(matches!(
            ProjectConfig::from_jsonc("{ \"modules\": { } }"),
            Err(TemplateError::Deserialize(_))
        ));
        assert!(matches!(ProjectConfig::from_jsonc("{"), Err(TemplateError::Parse(_))));
    }

    #[test]
    fn test_module_flags() {
        let external = Module::new("gas").with_version("2.0");
        assert!(external.is_external());
        assert!(!external.is_local());
        assert!(external.db_init());

        let linked = Module::new("gas").with_version("2.0").with_dev_src("gas_src");
        assert!(linked.is_local());
        assert!(!linked.dev_only());
    }
}
