//! # graft_core
//!
//! Synchronization engine for graft.
//!
//! A [`Synchronizer`] keeps a project in step with its template:
//!
//! - `pull` fetches the template, merges its configuration file and every
//!   tracked file into the project, then runs `update`
//! - `update` rewrites the project files from the project configuration
//!
//! Git, the file system and the formatter are collaborators behind the traits
//! in [`providers`], with test doubles in [`providers::mock`].

pub mod error;
pub mod options;
pub mod providers;
pub mod report;
pub mod sync;

pub use error::{SyncError, SyncResult};
pub use options::{SyncOptions, TrackedFile, DEFAULT_TEMPLATE_URL, DEFAULT_TRACKED_FILES};
pub use providers::{
    FileSystem, Formatter, GitCli, LocalFs, NoopFormatter, PrettierFormatter, SourceControl,
};
pub use report::{FileAction, FileOutcome, Operation, RunStatus, SyncReport, SyncWarning};
pub use sync::Synchronizer;
