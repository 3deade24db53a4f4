//! Schema discrepancies found while merging configuration documents.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::jsonc::{KeyPath, Node, NodeKind};

/// Type class of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Null,
    Array,
    Object,
}

impl ValueType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Boolean,
            Value::Null => Self::Null,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Type class of a parsed node. Property nodes classify as their value.
    pub fn of_node(node: &Node) -> Self {
        match node.kind {
            NodeKind::String => Self::String,
            NodeKind::Number => Self::Number,
            NodeKind::Boolean => Self::Boolean,
            NodeKind::Null => Self::Null,
            NodeKind::Array => Self::Array,
            NodeKind::Object => Self::Object,
            NodeKind::Property => node
                .children
                .get(1)
                .map(Self::of_node)
                .unwrap_or(Self::Null),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Array => "array",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// The project holds a value of a different type class than the template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeMismatch {
    pub path: KeyPath,
    pub template_value: Value,
    pub project_value: Value,
}

impl TypeMismatch {
    pub fn template_type(&self) -> ValueType {
        ValueType::of(&self.template_value)
    }

    pub fn project_type(&self) -> ValueType {
        ValueType::of(&self.project_value)
    }
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Type mismatch for \"{}\": template value is {} ({}), project value is {} ({}); discarding project value",
            self.path,
            self.template_value,
            self.template_type(),
            self.project_value,
            self.project_type()
        )
    }
}

/// A key present in the project but not in the template. It is dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnexpectedKey {
    pub path: KeyPath,
    pub value: Value,
}

impl fmt::Display for UnexpectedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Discarding unexpected property \"{}\" with value {}",
            self.path, self.value
        )
    }
}

/// Everything a config merge noticed about the two documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeDiagnostics {
    /// Template keys the project lacks. The template value is kept.
    pub missing_keys: Vec<KeyPath>,
    /// Project keys the template lacks. They are dropped.
    pub unexpected_keys: Vec<UnexpectedKey>,
    /// Keys whose type class differs. The template value is kept.
    pub type_mismatches: Vec<TypeMismatch>,
    /// Overwrite paths whose project text replaced the template text.
    pub overwritten: Vec<KeyPath>,
}

impl MergeDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether project content was discarded.
    ///
    /// Missing keys and overwrites are informational.
    pub fn has_warnings(&self) -> bool {
        !self.type_mismatches.is_empty() || !self.unexpected_keys.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.missing_keys.is_empty()
            && self.unexpected_keys.is_empty()
            && self.type_mismatches.is_empty()
            && self.overwritten.is_empty()
    }

    /// Human-readable messages for the discrepancies that lost project data.
    pub fn messages(&self) -> Vec<String> {
        self.type_mismatches
            .iter()
            .map(ToString::to_string)
            .chain(self.unexpected_keys.iter().map(ToString::to_string))
            .collect()
    }

    pub fn extend(&mut self, other: MergeDiagnostics) {
        self.missing_keys.extend(other.missing_keys);
        self.unexpected_keys.extend(other.unexpected_keys);
        self.type_mismatches.extend(other.type_mismatches);
        self.overwritten.extend(other.overwritten);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_mismatch_message_names_both_values() {
        let mismatch = TypeMismatch {
            path: KeyPath::from_keys(["platform", "version"]),
            template_value: json!("7.2"),
            project_value: json!(7),
        };

        let message = mismatch.to_string();
        assert!(message.contains("platform.version"));
        assert!(message.contains("\"7.2\" (string)"));
        assert!(message.contains("7 (number)"));
        assert!(message.ends_with("discarding project value"));
    }

    #[test]
    fn test_warnings_exclude_informational_entries() {
        let mut diagnostics = MergeDiagnostics::new();
        diagnostics.missing_keys.push(KeyPath::from_keys(["registry"]));
        diagnostics.overwritten.push(KeyPath::from_keys(["modules"]));
        assert!(!diagnostics.has_warnings());
        assert!(!diagnostics.is_empty());

        let mut other = MergeDiagnostics::new();
        other.unexpected_keys.push(UnexpectedKey {
            path: KeyPath::from_keys(["legacy"]),
            value: json!(true),
        });
        diagnostics.extend(other);

        assert!(diagnostics.has_warnings());
        assert_eq!(
            diagnostics.messages(),
            vec!["Discarding unexpected property \"legacy\" with value true".to_string()]
        );
    }

    #[test]
    fn test_value_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ValueType::Boolean).unwrap(), "\"boolean\"");
        assert_eq!(ValueType::of(&json!(null)), ValueType::Null);
    }
}
