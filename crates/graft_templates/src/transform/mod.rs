//! File transforms.
//!
//! A transform rewrites one template file so it reflects the project
//! configuration: image tags, module lists, optional system packages and
//! project prefixes. Transforms are pure functions over the file contents and
//! are idempotent, so `update` can run any number of times.

mod files;
mod helpers;

use std::collections::BTreeMap;

use crate::config::ResolvedConfig;
use crate::deps::DependencyLookup;

pub use helpers::{replace_all_tokens, replace_region, replace_token};

/// What a transform sees besides the file contents.
#[derive(Clone, Copy)]
pub struct TransformContext<'a> {
    pub config: &'a ResolvedConfig,
    pub deps: &'a dyn DependencyLookup,
}

impl<'a> TransformContext<'a> {
    pub fn new(config: &'a ResolvedConfig, deps: &'a dyn DependencyLookup) -> Self {
        Self { config, deps }
    }
}

/// A file transform.
pub type TransformFn = fn(&TransformContext<'_>, &str) -> String;

/// Transforms keyed by `/`-separated path relative to the project root.
#[derive(Debug, Clone, Default)]
pub struct TransformRegistry {
    transforms: BTreeMap<String, TransformFn>,
}

impl TransformRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The transforms for the project template's files.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(".gitignore", files::gitignore);
        registry.register(".devcontainer/dockerfile", files::devcontainer_dockerfile);
        registry.register(".devcontainer/docker-compose.yml", files::devcontainer_compose);
        registry.register(
            ".devcontainer/remote_host/docker-compose.yml",
            files::remote_host_compose,
        );
        registry.register(
            ".devcontainer/remote_host/docker-compose-shared.yml",
            files::remote_host_compose,
        );
        registry.register(".devcontainer/.env.example", files::env_example);
        registry.register(".devcontainer/devcontainer.json", files::devcontainer_json);
        registry.register(
            ".devcontainer/remote_host/devcontainer.json",
            files::remote_host_devcontainer_json,
        );
        registry.register(
            ".devcontainer/entrypoint.d/600_init_db.sh",
            files::init_db,
        );
        registry.register("deployment/dockerfile.build", files::build_dockerfile);
        registry.register("deployment/dockerfile.appserver", files::appserver_dockerfile);
        registry.register("deployment/dockerfile.tools", files::tools_dockerfile);
        registry.register("deployment/docker-compose.yml", files::deployment_compose);
        registry.register("deployment/.env.example", files::env_example);
        registry.register("deployment/entrypoint.d/600_init_db.sh", files::init_db);
        registry
    }

    /// Register a transform, replacing any existing one for `path`.
    pub fn register(&mut self, path: impl Into<String>, transform: TransformFn) {
        self.transforms.insert(path.into(), transform);
    }

    pub fn get(&self, path: &str) -> Option<TransformFn> {
        self.transforms.get(path).copied()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.transforms.contains_key(path)
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.transforms.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TransformFn)> {
        self.transforms.iter().map(|(path, f)| (path.as_str(), *f))
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Run the transform for `path`, if one is registered.
    pub fn apply(&self, path: &str, ctx: &TransformContext<'_>, content: &str) -> Option<String> {
        self.get(path).map(|transform| transform(ctx, content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::deps::BuiltinDependencies;

    #[test]
    fn test_builtin_paths() {
        let registry = TransformRegistry::builtin();

        assert_eq!(registry.len(), 15);
        assert!(registry.exists(".gitignore"));
        assert!(registry.exists("deployment/entrypoint.d/600_init_db.sh"));
        assert!(!registry.exists(".iqgeorc.jsonc"));

        let paths: Vec<&str> = registry.paths().collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
    }

    #[test]
    fn test_register_and_apply() {
        fn shout(_: &TransformContext<'_>, content: &str) -> String {
            content.to_uppercase()
        }

        let mut registry = TransformRegistry::new();
        registry.register("notes.txt", shout);

        let config = ResolvedConfig::from_jsonc("{}", &BuiltinDependencies).unwrap();
        let ctx = TransformContext::new(&config, &BuiltinDependencies);

        assert_eq!(registry.apply("notes.txt", &ctx, "hi").as_deref(), Some("HI"));
        assert_eq!(registry.apply("other.txt", &ctx, "hi"), None);
    }
}
