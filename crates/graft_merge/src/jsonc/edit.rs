use std::ops::Range;

use crate::error::{MergeError, MergeResult};

/// Replace `length` bytes at `offset` with `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub offset: usize,
    pub length: usize,
    pub content: String,
}

impl Edit {
    pub fn replace(range: Range<usize>, content: impl Into<String>) -> Self {
        Self {
            offset: range.start,
            length: range.end - range.start,
            content: content.into(),
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Edits against one original text.
///
/// Offsets always refer to the original text, so edits can be collected in
/// any order and applied together.
#[derive(Debug, Clone, Default)]
pub struct EditSet {
    edits: Vec<Edit>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply every edit to `text`.
    ///
    /// Fails when two edits overlap or one reaches past the end of `text`.
    pub fn apply(mut self, text: &str) -> MergeResult<String> {
        self.edits.sort_by_key(|e| (e.offset, e.length));

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut previous: Option<&Edit> = None;

        for edit in &self.edits {
            if edit.end() > text.len() {
                return Err(MergeError::EditOutOfBounds {
                    offset: edit.offset,
                    end: edit.end(),
                    len: text.len(),
                });
            }
            if let Some(prev) = previous {
                if edit.offset < prev.end() {
                    return Err(MergeError::OverlappingEdits {
                        first: prev.offset,
                        second: edit.offset,
                    });
                }
            }

            out.push_str(&text[cursor..edit.offset]);
            out.push_str(&edit.content);
            cursor = edit.end();
            previous = Some(edit);
        }

        out.push_str(&text[cursor..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_in_any_order() {
        let text = r#"{ "a": 1, "b": 2 }"#;
        let mut edits = EditSet::new();
        edits.push(Edit::replace(15..16, "20"));
        edits.push(Edit::replace(7..8, "10"));

        assert_eq!(edits.apply(text).unwrap(), r#"{ "a": 10, "b": 20 }"#);
    }

    #[test]
    fn test_empty_set_is_identity() {
        assert_eq!(EditSet::new().apply("abc").unwrap(), "abc");
    }

    #[test]
    fn test_overlap_rejected() {
        let mut edits = EditSet::new();
        edits.push(Edit::replace(0..4, "x"));
        edits.push(Edit::replace(2..6, "y"));

        assert!(matches!(
            edits.apply("0123456789"),
            Err(MergeError::OverlappingEdits { first: 0, second: 2 })
        ));
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut edits = EditSet::new();
        edits.push(Edit::replace(2..9, "x"));

        assert!(matches!(edits.apply("abc"), Err(MergeError::EditOutOfBounds { .. })));
    }
}
