//! Error types for configuration and transforms.

use thiserror::Error;

use graft_merge::ParseError;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while loading the project configuration.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Invalid configuration syntax: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid configuration structure: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid exclude pattern {pattern:?}: {source}")]
    InvalidExclude {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
