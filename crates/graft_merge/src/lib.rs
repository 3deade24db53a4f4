//! # graft_merge
//!
//! Merge engines for graft.
//!
//! Two engines reconcile an upstream template with a project's local copy:
//!
//! - **Custom sections** ([`custom`]): a line-oriented three-way merge where the
//!   template owns the file except for blocks delimited by
//!   `# START CUSTOM SECTION` / `# END CUSTOM SECTION` sentinels.
//! - **Structured config** ([`config`]): a key-path aware merge of two
//!   JSON-with-comments documents that edits value tokens in place, so comments
//!   and formatting survive.
//!
//! Both engines are pure functions over strings. They do no I/O.
//!
//! ## Example
//!
//! ```rust
//! use graft_merge::{merge_config, merge_custom_sections};
//!
//! let template = "FROM base\n# START CUSTOM SECTION\n# END CUSTOM SECTION\n";
//! let project = "FROM old\n# START CUSTOM SECTION\nRUN mine\n# END CUSTOM SECTION\n";
//! let merged = merge_custom_sections(template, project, "#");
//! assert!(merged.starts_with("FROM base\n"));
//! assert!(merged.contains("RUN mine"));
//!
//! let merged = merge_config(r#"{ "prefix": "abc" }"#, r#"{ "prefix": "myproj" }"#).unwrap();
//! assert_eq!(merged.text, r#"{ "prefix": "abc" }"#);
//! ```

pub mod config;
pub mod custom;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod jsonc;
pub mod region;

pub use config::{merge_config, ConfigMerge, ConfigMerger, DEFAULT_OVERWRITE_PATHS};
pub use custom::{merge_custom_sections, CustomMerge, CustomSectionMerger};
pub use diagnostics::{MergeDiagnostics, TypeMismatch, UnexpectedKey, ValueType};
pub use diff::{diff_lines, DiffSegment, SegmentKind};
pub use error::{MergeError, MergeResult};
pub use jsonc::{parse_tree, Edit, EditSet, KeyPath, Node, NodeKind, ParseError, PathSegment};
pub use region::{MarkedRegion, MarkerPair};
