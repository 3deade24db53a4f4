//! JSON with comments.
//!
//! A small position-tracking parser for JSONC documents. Every node records
//! the byte range it occupies in the source, which lets the config merger
//! replace individual value tokens without re-serializing the document, so
//! comments and formatting survive a merge.

mod edit;
mod parser;
mod path;

pub use edit::{Edit, EditSet};
pub use parser::{parse_tree, Node, NodeKind, ParseError, ParseErrorKind};
pub use path::{KeyPath, PathSegment};
