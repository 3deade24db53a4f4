use std::fmt;

use serde::{Serialize, Serializer};

/// One step of a [`KeyPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a value inside a document, from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath(Vec<PathSegment>);

impl KeyPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Path made of object keys only.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(|k| PathSegment::Key(k.into())).collect())
    }

    pub fn child_key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    pub fn child_index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &KeyPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => f.write_str(key)?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for KeyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(KeyPath::root().to_string(), "<root>");
        assert_eq!(KeyPath::from_keys(["platform", "devenv"]).to_string(), "platform.devenv");
        assert_eq!(
            KeyPath::from_keys(["modules"]).child_index(0).child_key("name").to_string(),
            "modules[0].name"
        );
    }

    #[test]
    fn test_starts_with() {
        let modules = KeyPath::from_keys(["modules"]);
        assert!(modules.child_index(2).starts_with(&modules));
        assert!(modules.starts_with(&modules));
        assert!(!KeyPath::from_keys(["modules_extra"]).starts_with(&modules));
        assert!(!KeyPath::root().starts_with(&modules));
    }

    #[test]
    fn test_serializes_as_string() {
        let path = KeyPath::from_keys(["a", "b"]);
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"a.b\"");
    }
}
