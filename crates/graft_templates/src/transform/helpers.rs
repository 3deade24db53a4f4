//! Building blocks shared by the file transforms.

use std::sync::LazyLock;

use graft_merge::MarkerPair;
use regex::{NoExpand, Regex};

use crate::config::ResolvedModule;
use crate::deps::{DependencyLookup, LookupKind};

static PIP_FETCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RUN myw_product fetch pip_packages.*").unwrap());

/// Replace the body of the `# START SECTION <label>` region with `lines`.
///
/// Content without the region is returned unchanged.
pub fn replace_region(content: &str, label: &str, lines: &[String]) -> String {
    MarkerPair::section(label)
        .replace_body(content, lines)
        .unwrap_or_else(|| content.to_string())
}

/// Replace the first match of `pattern` with the literal `replacement`.
pub fn replace_token(content: &str, pattern: &Regex, replacement: &str) -> String {
    pattern.replace(content, NoExpand(replacement)).into_owned()
}

/// Replace every match of `pattern` with the literal `replacement`.
pub fn replace_all_tokens(content: &str, pattern: &Regex, replacement: &str) -> String {
    pattern.replace_all(content, NoExpand(replacement)).into_owned()
}

/// Which image a module injection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flavor {
    /// Development container: only released modules without local sources
    /// come from injector images; local modules are volume mounted.
    DevEnv,
    /// Deployment build image: everything except dev-only modules.
    Deployment,
}

/// Fill the injector image aliases and module copy regions.
pub(crate) fn inject_modules(content: &str, modules: &[ResolvedModule], flavor: Flavor) -> String {
    let from_injector = |m: &&ResolvedModule| match flavor {
        Flavor::DevEnv => m.is_external() && m.dev_src.is_none(),
        Flavor::Deployment => m.is_external() && !m.dev_only,
    };

    let aliases: Vec<String> = modules
        .iter()
        .filter(from_injector)
        .filter_map(|m| {
            m.version
                .as_ref()
                .map(|v| format!("FROM ${{CONTAINER_REGISTRY}}{}:{} AS {}", m.name, v, m.name))
        })
        .collect();
    let content = replace_region(content, "Aliases for Injector images", &aliases);

    let copies: Vec<String> = modules
        .iter()
        .filter(|m| match flavor {
            Flavor::DevEnv => from_injector(m),
            Flavor::Deployment => !m.dev_only,
        })
        .map(|m| {
            if m.is_external() {
                format!("COPY --link --from={} / ${{MODULES}}/", m.name)
            } else {
                format!("COPY --link {} ${{MODULES}}/{}", m.name, m.name)
            }
        })
        .collect();
    replace_region(&content, "Copy the modules", &copies)
}

/// apt packages for a list of platform options, in order, without repeats.
pub(crate) fn apt_packages(
    deps: &dyn DependencyLookup,
    options: &[String],
    kind: LookupKind,
) -> Vec<String> {
    let mut packages: Vec<String> = Vec::new();
    for package in options
        .iter()
        .filter_map(|name| deps.resolve(name, kind))
        .flatten()
    {
        if !packages.contains(&package) {
            packages.push(package);
        }
    }
    packages
}

/// Fill an optional dependencies region with one apt install step.
///
/// `kind` selects the region: `(build`, `(runtime`, or for the development
/// image the first optional dependencies region regardless of suffix.
pub(crate) fn optional_deps(
    content: &str,
    deps: &dyn DependencyLookup,
    options: &[String],
    kind: LookupKind,
) -> String {
    let label = match kind {
        LookupKind::AptBuild => "optional dependencies (build",
        LookupKind::AptRuntime => "optional dependencies (runtime",
        _ => "optional dependencies (",
    };

    let packages = apt_packages(deps, options, kind);
    let body = if packages.is_empty() {
        Vec::new()
    } else {
        vec![
            "RUN apt-get update && \\".to_string(),
            format!("    apt-get install -y {} \\", packages.join(" ")),
            "    && apt-get autoremove && apt-get clean".to_string(),
        ]
    };
    replace_region(content, label, &body)
}

/// Rewrite the pip packages fetch step for a list of platform options.
///
/// Options without a pip mapping are fetched under their own name.
pub(crate) fn fetch_pip_packages(
    content: &str,
    deps: &dyn DependencyLookup,
    options: &[String],
) -> String {
    let packages: Vec<String> = options
        .iter()
        .flat_map(|name| {
            deps.resolve(name, LookupKind::Pip)
                .unwrap_or_else(|| vec![name.clone()])
        })
        .collect();

    let line = if packages.is_empty() {
        "RUN myw_product fetch pip_packages".to_string()
    } else {
        format!("RUN myw_product fetch pip_packages --include {}", packages.join(" "))
    };
    replace_token(content, &PIP_FETCH, &line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::BuiltinDependencies;

    fn module(name: &str, version: Option<&str>, dev_src: Option<&str>, dev_only: bool) -> ResolvedModule {
        ResolvedModule {
            name: name.to_string(),
            version: version.map(String::from),
            short_version: None,
            dev_only,
            dev_src: dev_src.map(String::from),
            db_init: false,
            schema_grep: None,
            schema_version_name: None,
        }
    }

    const DOCKERFILE: &str = "\
# START SECTION Aliases for Injector images
# END SECTION
FROM base
# START SECTION Copy the modules
COPY old
# END SECTION
";

    fn modules() -> Vec<ResolvedModule> {
        vec![
            module("comms", Some("3.3"), None, false),
            module("gas", Some("2.0"), Some("gas"), false),
            module("custom", None, Some("custom"), false),
            module("dev_helpers", Some("1.0"), None, true),
        ]
    }

    #[test]
    fn test_inject_modules_dev_flavor() {
        let out = inject_modules(DOCKERFILE, &modules(), Flavor::DevEnv);
        assert_eq!(
            out,
            "\
# START SECTION Aliases for Injector images
FROM ${CONTAINER_REGISTRY}comms:3.3 AS comms
FROM ${CONTAINER_REGISTRY}dev_helpers:1.0 AS dev_helpers
# END SECTION
FROM base
# START SECTION Copy the modules
COPY --link --from=comms / ${MODULES}/
COPY --link --from=dev_helpers / ${MODULES}/
# END SECTION
"
        );
    }

    #[test]
    fn test_inject_modules_deployment_flavor() {
        let out = inject_modules(DOCKERFILE, &modules(), Flavor::Deployment);
        assert_eq!(
            out,
            "\
# START SECTION Aliases for Injector images
FROM ${CONTAINER_REGISTRY}comms:3.3 AS comms
FROM ${CONTAINER_REGISTRY}gas:2.0 AS gas
# END SECTION
FROM base
# START SECTION Copy the modules
COPY --link --from=comms / ${MODULES}/
COPY --link --from=gas / ${MODULES}/
COPY --link custom ${MODULES}/custom
# END SECTION
"
        );
    }

    #[test]
    fn test_optional_deps_regions() {
        let content = "\
# START SECTION optional dependencies (build only)
# END SECTION
# START SECTION optional dependencies (runtime)
RUN stale
# END SECTION
";
        let options = vec!["memcached".to_string(), "osm".to_string()];
        let out = optional_deps(content, &BuiltinDependencies, &options, LookupKind::AptBuild);
        let out = optional_deps(&out, &BuiltinDependencies, &options, LookupKind::AptRuntime);

        assert_eq!(
            out,
            "\
# START SECTION optional dependencies (build only)
RUN apt-get update && \\
    apt-get install -y libmemcached-dev \\
    && apt-get autoremove && apt-get clean
# END SECTION
# START SECTION optional dependencies (runtime)
RUN apt-get update && \\
    apt-get install -y libmemcached11 osm2pgsql osmctools \\
    && apt-get autoremove && apt-get clean
# END SECTION
"
        );
    }

    #[test]
    fn test_optional_deps_cleared_without_packages() {
        let content = "# START SECTION optional dependencies (dev)\nRUN old\n# END SECTION\n";
        let out = optional_deps(content, &BuiltinDependencies, &[], LookupKind::AptDev);
        assert_eq!(out, "# START SECTION optional dependencies (dev)\n# END SECTION\n");
    }

    #[test]
    fn test_fetch_pip_packages() {
        let content = "RUN myw_product fetch pip_packages --include stale\n";
        let deps = BuiltinDependencies;

        let out = fetch_pip_packages(content, &deps, &["ldap".to_string(), "osm".to_string()]);
        assert_eq!(out, "RUN myw_product fetch pip_packages --include ldap\n");

        let out = fetch_pip_packages(&out, &deps, &["osm".to_string()]);
        assert_eq!(out, "RUN myw_product fetch pip_packages\n");
    }

    #[test]
    fn test_replace_token_is_literal() {
        let pattern = Regex::new(r"\$\{PREFIX\}").unwrap();
        assert_eq!(replace_token("a ${PREFIX} b", &pattern, "$1x"), "a $1x b");
    }
}
