//! Dependency lookups.
//!
//! Platform options such as `ldap` or `osm` expand to system packages, and
//! some modules pull in extra platform options or use irregular schema
//! version names. Transforms and config normalization ask a
//! [`DependencyLookup`] instead of consulting tables directly, so the tables
//! can be substituted.

use std::collections::HashMap;

/// What is being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    /// apt packages needed to build with a platform option.
    AptBuild,
    /// apt packages needed at runtime for a platform option.
    AptRuntime,
    /// apt packages for the development image: build and runtime combined.
    AptDev,
    /// pip packages fetched for a platform option.
    Pip,
    /// Extra appserver platform options required by a module.
    ModuleAppserver,
    /// Extra tools platform options required by a module.
    ModuleTools,
    /// Schema version name of a module, as a single entry.
    SchemaVersionName,
}

/// Resolves names to dependency lists.
pub trait DependencyLookup: Send + Sync {
    /// Entries for `name`, or `None` when the name is unknown for `kind`.
    fn resolve(&self, name: &str, kind: LookupKind) -> Option<Vec<String>>;

    /// Schema version name of a module.
    fn schema_version_name(&self, module: &str) -> Option<String> {
        self.resolve(module, LookupKind::SchemaVersionName)
            .and_then(|names| names.into_iter().next())
    }
}

/// Build and runtime lists combined, first occurrence wins.
fn combine(build: Option<Vec<String>>, runtime: Option<Vec<String>>) -> Option<Vec<String>> {
    if build.is_none() && runtime.is_none() {
        return None;
    }
    let mut out: Vec<String> = Vec::new();
    for package in build.into_iter().chain(runtime).flatten() {
        if !out.contains(&package) {
            out.push(package);
        }
    }
    Some(out)
}

fn owned(items: &[&str]) -> Option<Vec<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

/// The tables shipped with graft.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDependencies;

impl BuiltinDependencies {
    fn apt_build(name: &str) -> Option<Vec<String>> {
        match name {
            "memcached" => owned(&["libmemcached-dev"]),
            "ldap" => owned(&["libsasl2-dev", "libldap2-dev"]),
            "saml" => owned(&["libxml2-dev", "libxmlsec1-dev"]),
            _ => None,
        }
    }

    fn apt_runtime(name: &str) -> Option<Vec<String>> {
        match name {
            "memcached" => owned(&["libmemcached11"]),
            "ldap" => owned(&["libsasl2-dev", "libldap2-dev"]),
            "saml" => owned(&["libxml2-dev", "libxmlsec1-dev"]),
            "osm" => owned(&["osm2pgsql", "osmctools"]),
            _ => None,
        }
    }

    fn schema_name(name: &str) -> Option<&'static str> {
        let schema = match name {
            "capture" => "capture_schema",
            "workflow_manager" => "mywmywwfm_schema",
            "mywapp_common" => "mywapp_schema",
            "groups" => "groups",
            "survey" => "mywis_schema",
            "gas" => "mywgas_schema",
            "electric" => "iqg_electric_schema",
            "comms" => "myw_comms_schema",
            "comsof" => "iqg_comsof_schema",
            "comms_cloud" => "iqg_comms_cloud_schema",
            "network_revenue_optimizer" => "mywnro_schema",
            "pia_interface" => "myw_pia_schema",
            _ => return None,
        };
        Some(schema)
    }
}

impl DependencyLookup for BuiltinDependencies {
    fn resolve(&self, name: &str, kind: LookupKind) -> Option<Vec<String>> {
        match kind {
            LookupKind::AptBuild => Self::apt_build(name),
            LookupKind::AptRuntime => Self::apt_runtime(name),
            LookupKind::AptDev => combine(Self::apt_build(name), Self::apt_runtime(name)),
            // osm is a system dependency only
            LookupKind::Pip => (name == "osm").then(Vec::new),
            LookupKind::ModuleAppserver => {
                (name == "network_revenue_optimizer").then(Vec::new)
            }
            LookupKind::ModuleTools => {
                (name == "network_revenue_optimizer").then(|| vec!["osm".to_string()])
            }
            LookupKind::SchemaVersionName => {
                Self::schema_name(name).map(|schema| vec![schema.to_string()])
            }
        }
    }
}

/// Lookup backed by caller-provided tables.
///
/// `AptDev` falls back to the combined `AptBuild` and `AptRuntime` entries
/// when no explicit entry exists.
#[derive(Debug, Clone, Default)]
pub struct TableDependencies {
    entries: HashMap<(LookupKind, String), Vec<String>>,
}

impl TableDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, S>(mut self, kind: LookupKind, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(kind, name, values);
        self
    }

    pub fn insert<I, S>(&mut self, kind: LookupKind, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.insert(
            (kind, name.into()),
            values.into_iter().map(Into::into).collect(),
        );
    }

    fn get(&self, kind: LookupKind, name: &str) -> Option<Vec<String>> {
        self.entries.get(&(kind, name.to_string())).cloned()
    }
}

impl DependencyLookup for TableDependencies {
    fn resolve(&self, name: &str, kind: LookupKind) -> Option<Vec<String>> {
        match (self.get(kind, name), kind) {
            (Some(values), _) => Some(values),
            (None, LookupKind::AptDev) => combine(
                self.get(LookupKind::AptBuild, name),
                self.get(LookupKind::AptRuntime, name),
            ),
            (None, _) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_apt_tables() {
        let deps = BuiltinDependencies;
        assert_eq!(
            deps.resolve("ldap", LookupKind::AptBuild),
            Some(vec!["libsasl2-dev".to_string(), "libldap2-dev".to_string()])
        );
        assert_eq!(deps.resolve("osm", LookupKind::AptBuild), None);
        assert_eq!(
            deps.resolve("memcached", LookupKind::AptDev),
            Some(vec!["libmemcached-dev".to_string(), "libmemcached11".to_string()])
        );
        assert_eq!(
            deps.resolve("osm", LookupKind::AptDev),
            Some(vec!["osm2pgsql".to_string(), "osmctools".to_string()])
        );
        assert_eq!(deps.resolve("unknown", LookupKind::AptDev), None);
    }

    #[test]
    fn test_builtin_module_tables() {
        let deps = BuiltinDependencies;
        assert_eq!(deps.schema_version_name("comms").as_deref(), Some("myw_comms_schema"));
        assert_eq!(deps.schema_version_name("custom"), None);
        assert_eq!(
            deps.resolve("network_revenue_optimizer", LookupKind::ModuleTools),
            Some(vec!["osm".to_string()])
        );
        assert_eq!(deps.resolve("osm", LookupKind::Pip), Some(vec![]));
        assert_eq!(deps.resolve("ldap", LookupKind::Pip), None);
    }

    #[test]
    fn test_table_dependencies_dev_fallback() {
        let deps = TableDependencies::new()
            .with(LookupKind::AptBuild, "gdal", ["libgdal-dev"])
            .with(LookupKind::AptRuntime, "gdal", ["libgdal32", "libgdal-dev"]);

        assert_eq!(
            deps.resolve("gdal", LookupKind::AptDev),
            Some(vec!["libgdal-dev".to_string(), "libgdal32".to_string()])
        );

        let explicit = deps.with(LookupKind::AptDev, "gdal", ["gdal-bin"]);
        assert_eq!(explicit.resolve("gdal", LookupKind::AptDev), Some(vec!["gdal-bin".to_string()]));
    }
}
