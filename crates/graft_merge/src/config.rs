//! Structured-config merging.
//!
//! [`ConfigMerger`] reconciles a project's JSONC configuration with the
//! template's. The merged document always starts from the template text: the
//! template decides which keys exist, the project decides their values, and
//! overwrite paths are taken from the project byte for byte.
//!
//! All edits are byte-range replacements against the template's original
//! offsets, applied together at the end, so comments and formatting outside
//! the edited value tokens are untouched.

use serde_json::Value;
use tracing::debug;

use crate::diagnostics::{MergeDiagnostics, TypeMismatch, UnexpectedKey, ValueType};
use crate::error::{MergeError, MergeResult};
use crate::jsonc::{parse_tree, Edit, EditSet, KeyPath, Node};

/// Key paths taken verbatim from the project by default.
pub const DEFAULT_OVERWRITE_PATHS: &[&[&str]] = &[&["modules"]];

/// Outcome of a config merge.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigMerge {
    pub text: String,
    pub diagnostics: MergeDiagnostics,
}

/// Key-path aware merger for JSONC configuration documents.
#[derive(Debug, Clone)]
pub struct ConfigMerger {
    overwrite_paths: Vec<KeyPath>,
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self {
            overwrite_paths: DEFAULT_OVERWRITE_PATHS
                .iter()
                .map(|keys| KeyPath::from_keys(keys.iter().copied()))
                .collect(),
        }
    }
}

impl ConfigMerger {
    /// Merger with the default overwrite paths.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an overwrite path.
    pub fn with_overwrite_path(mut self, path: KeyPath) -> Self {
        if !self.overwrite_paths.contains(&path) {
            self.overwrite_paths.push(path);
        }
        self
    }

    /// Replace all overwrite paths.
    pub fn with_overwrite_paths(mut self, paths: Vec<KeyPath>) -> Self {
        self.overwrite_paths = paths;
        self
    }

    pub fn overwrite_paths(&self) -> &[KeyPath] {
        &self.overwrite_paths
    }

    fn is_overwrite(&self, path: &KeyPath) -> bool {
        self.overwrite_paths.iter().any(|p| p == path)
    }

    fn is_under_overwrite(&self, path: &KeyPath) -> bool {
        self.overwrite_paths.iter().any(|p| path.starts_with(p))
    }

    /// Merge `project` into `template`.
    ///
    /// Fails only when a document cannot be parsed.
    pub fn merge(&self, project: &str, template: &str) -> MergeResult<ConfigMerge> {
        let template_root = parse_tree(template).map_err(|source| MergeError::Parse {
            document: "template",
            source,
        })?;
        let project_root = parse_tree(project).map_err(|source| MergeError::Parse {
            document: "project",
            source,
        })?;

        let mut walk = Walk {
            merger: self,
            template,
            project,
            edits: EditSet::new(),
            diagnostics: MergeDiagnostics::new(),
        };

        if template_root.is_object() && project_root.is_object() {
            walk.template_object(&KeyPath::root(), &template_root, &project_root);
            walk.project_object(&KeyPath::root(), &project_root, &template_root);
        } else if ValueType::of_node(&template_root) != ValueType::of_node(&project_root) {
            walk.mismatch(KeyPath::root(), &template_root, &project_root);
        }

        let Walk {
            edits, diagnostics, ..
        } = walk;
        debug!(
            edits = edits.len(),
            missing = diagnostics.missing_keys.len(),
            unexpected = diagnostics.unexpected_keys.len(),
            mismatches = diagnostics.type_mismatches.len(),
            "Merged config"
        );

        Ok(ConfigMerge {
            text: edits.apply(template)?,
            diagnostics,
        })
    }
}

/// Merge `project` into `template` with the default overwrite paths.
pub fn merge_config(project: &str, template: &str) -> MergeResult<ConfigMerge> {
    ConfigMerger::new().merge(project, template)
}

struct Walk<'a> {
    merger: &'a ConfigMerger,
    template: &'a str,
    project: &'a str,
    edits: EditSet,
    diagnostics: MergeDiagnostics,
}

impl Walk<'_> {
    fn template_object(&mut self, path: &KeyPath, template: &Node, project: &Node) {
        for (key, template_value) in template.properties() {
            let child = path.child_key(key);
            let project_value = project.get(key);

            if self.merger.is_overwrite(&child) {
                self.overwrite(child, template_value, project_value);
                continue;
            }

            let Some(project_value) = project_value else {
                self.diagnostics.missing_keys.push(child);
                continue;
            };

            if template_value.is_object() {
                if project_value.is_object() {
                    self.template_object(&child, template_value, project_value);
                } else {
                    self.mismatch(child, template_value, project_value);
                }
                continue;
            }

            self.leaf(child, template_value, project_value);
        }
    }

    fn overwrite(&mut self, path: KeyPath, template: &Node, project: Option<&Node>) {
        let Some(project) = project else {
            self.diagnostics.missing_keys.push(path);
            return;
        };

        let content = project.source(self.project);
        if content != template.source(self.template) {
            self.edits.push(Edit::replace(template.span(), content));
            self.diagnostics.overwritten.push(path);
        }
    }

    fn leaf(&mut self, path: KeyPath, template: &Node, project: &Node) {
        let template_type = ValueType::of_node(template);
        let project_type = ValueType::of_node(project);

        // null marks an unset value on either side
        if project_type == ValueType::Null {
            return;
        }
        if template_type == ValueType::Null {
            self.edits
                .push(Edit::replace(template.span(), project.source(self.project)));
            return;
        }

        if template_type != project_type {
            self.mismatch(path, template, project);
            return;
        }

        if template.is_array() {
            self.array_union(template, project);
        } else if template.to_value() != project.to_value() {
            self.edits
                .push(Edit::replace(template.span(), project.source(self.project)));
        }
    }

    /// Union of the template entries and novel project entries, with no
    /// repeated values.
    fn array_union(&mut self, template: &Node, project: &Node) {
        let mut seen: Vec<Value> = Vec::new();
        let mut kept = Vec::new();
        for item in &template.children {
            let value = item.to_value();
            if !seen.contains(&value) {
                seen.push(value);
                kept.push(item.source(self.template));
            }
        }
        let duplicated = kept.len() < template.children.len();

        let mut novel = Vec::new();
        for item in &project.children {
            let value = item.to_value();
            if !seen.contains(&value) {
                seen.push(value);
                novel.push(item.source(self.project));
            }
        }
        if novel.is_empty() && !duplicated {
            return;
        }

        let (Some(first), Some(last)) = (template.children.first(), template.children.last())
        else {
            self.edits
                .push(Edit::replace(template.span(), format!("[{}]", novel.join(", "))));
            return;
        };

        let separator = if template.source(self.template).contains('\n') {
            match line_indent(self.template, last.offset) {
                Some(indent) => format!(",\n{indent}"),
                None => ", ".to_string(),
            }
        } else {
            ", ".to_string()
        };

        if duplicated {
            // Rebuild the entries so repeated template values collapse too
            kept.extend(novel);
            self.edits
                .push(Edit::replace(first.offset..last.end(), kept.join(separator.as_str())));
            return;
        }

        let mut content = String::new();
        for entry in novel {
            content.push_str(&separator);
            content.push_str(entry);
        }
        self.edits.push(Edit::replace(last.end()..last.end(), content));
    }

    fn project_object(&mut self, path: &KeyPath, project: &Node, template: &Node) {
        for (key, project_value) in project.properties() {
            let child = path.child_key(key);
            let template_value = template.get(key);
            if template_value.is_some() && self.merger.is_under_overwrite(&child) {
                continue;
            }

            match template_value {
                None => self.diagnostics.unexpected_keys.push(UnexpectedKey {
                    path: child,
                    value: project_value.to_value(),
                }),
                Some(template_value) if template_value.is_object() && project_value.is_object() => {
                    self.project_object(&child, project_value, template_value);
                }
                Some(_) => {}
            }
        }
    }

    fn mismatch(&mut self, path: KeyPath, template: &Node, project: &Node) {
        self.diagnostics.type_mismatches.push(TypeMismatch {
            path,
            template_value: template.to_value(),
            project_value: project.to_value(),
        });
    }
}

/// Leading whitespace of the line containing `offset`, when only whitespace
/// precedes `offset` on that line.
fn line_indent(text: &str, offset: usize) -> Option<&str> {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let indent = &text[line_start..offset];
    indent
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then_some(indent)
}
