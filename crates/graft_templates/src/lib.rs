//! # graft_templates
//!
//! Project configuration and file transforms for graft.
//!
//! This crate knows what an IQGeo project looks like:
//!
//! - the `.iqgeorc.jsonc` configuration model, its normalization and validation
//! - the dependency tables behind platform options and modules
//! - the transforms that rewrite template files for a configuration
//!
//! ## Example
//!
//! ```rust
//! use graft_templates::{BuiltinDependencies, ResolvedConfig, TransformContext, TransformRegistry};
//!
//! let config = ResolvedConfig::from_jsonc(
//!     r#"{ "prefix": "nmt", "db_name": "nmt" }"#,
//!     &BuiltinDependencies,
//! )
//! .unwrap();
//! let ctx = TransformContext::new(&config, &BuiltinDependencies);
//!
//! let registry = TransformRegistry::builtin();
//! let out = registry
//!     .apply("deployment/.env.example", &ctx, "PROJ_PREFIX=myproj\nMYW_DB_NAME=iqgeo\n")
//!     .unwrap();
//! assert_eq!(out, "PROJ_PREFIX=nmt\nMYW_DB_NAME=nmt\n");
//! ```

pub mod config;
pub mod deps;
pub mod error;
pub mod transform;

pub use config::{
    ExcludeSet, Module, Platform, ProjectConfig, ResolvedConfig, ResolvedModule, ValidationResult,
    CONFIG_FILE_NAME, DEFAULT_REGISTRY,
};
pub use deps::{BuiltinDependencies, DependencyLookup, LookupKind, TableDependencies};
pub use error::{TemplateError, TemplateResult};
pub use transform::{TransformContext, TransformFn, TransformRegistry};
