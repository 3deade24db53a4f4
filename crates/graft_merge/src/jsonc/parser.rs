use std::ops::Range;

use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::path::{KeyPath, PathSegment};

/// Syntactic kind of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Object,
    Array,
    /// A `"key": value` pair. Children are the key string and the value.
    Property,
    String,
    Number,
    Boolean,
    Null,
}

/// A parsed value with its byte range in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub offset: usize,
    pub length: usize,
    pub children: Vec<Node>,
    /// Scalar value, for string, number, boolean and null nodes.
    pub value: Option<Value>,
}

impl Node {
    fn scalar(kind: NodeKind, span: Range<usize>, value: Value) -> Self {
        Self {
            kind,
            offset: span.start,
            length: span.end - span.start,
            children: Vec::new(),
            value: Some(value),
        }
    }

    fn container(kind: NodeKind, span: Range<usize>, children: Vec<Node>) -> Self {
        Self {
            kind,
            offset: span.start,
            length: span.end - span.start,
            children,
            value: None,
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn span(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// The source text this node was parsed from.
    pub fn source<'a>(&self, text: &'a str) -> &'a str {
        &text[self.span()]
    }

    pub fn is_object(&self) -> bool {
        self.kind == NodeKind::Object
    }

    pub fn is_array(&self) -> bool {
        self.kind == NodeKind::Array
    }

    /// Key/value pairs of an object node, in source order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Node)> {
        let children: &[Node] = if self.kind == NodeKind::Object {
            &self.children
        } else {
            &[]
        };
        children
            .iter()
            .filter_map(|property| match property.children.as_slice() {
                [key, value] => match &key.value {
                    Some(Value::String(name)) => Some((name.as_str(), value)),
                    _ => None,
                },
                _ => None,
            })
    }

    /// Value of `key` in an object node. A repeated key resolves to its last
    /// occurrence.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.properties()
            .filter(|(name, _)| *name == key)
            .map(|(_, value)| value)
            .last()
    }

    /// Descend along `path`.
    pub fn find(&self, path: &KeyPath) -> Option<&Node> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| match segment {
                PathSegment::Key(key) => node.get(key),
                PathSegment::Index(index) if node.is_array() => node.children.get(*index),
                PathSegment::Index(_) => None,
            })
    }

    /// Convert to a plain JSON value.
    pub fn to_value(&self) -> Value {
        match self.kind {
            NodeKind::Object => {
                let mut map = Map::new();
                for (key, value) in self.properties() {
                    map.insert(key.to_string(), value.to_value());
                }
                Value::Object(map)
            }
            NodeKind::Array => Value::Array(self.children.iter().map(Node::to_value).collect()),
            NodeKind::Property => self
                .children
                .get(1)
                .map(Node::to_value)
                .unwrap_or(Value::Null),
            _ => self.value.clone().unwrap_or(Value::Null),
        }
    }
}

/// What went wrong while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("document is empty")]
    EmptyDocument,

    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),

    #[error("expected a property name")]
    ExpectedPropertyName,

    #[error("expected ':'")]
    ExpectedColon,

    #[error("expected ',' or a closing bracket")]
    ExpectedCommaOrClose,

    #[error("invalid number")]
    InvalidNumber,

    #[error("invalid escape sequence")]
    InvalidEscape,

    #[error("invalid unicode code point")]
    InvalidUnicode,

    #[error("line break inside string")]
    LineBreakInString,

    #[error("unterminated string")]
    UnterminatedString,

    #[error("unterminated block comment")]
    UnterminatedComment,

    #[error("content after the root value")]
    TrailingContent,
}

/// A syntax error with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
}

type ParseResult<T> = Result<T, ParseError>;

/// Parse a JSONC document into a [`Node`] tree.
///
/// Accepts `//` line comments, `/* */` block comments, trailing commas and a
/// leading byte-order mark.
pub fn parse_tree(text: &str) -> Result<Node, ParseError> {
    let mut parser = Parser::new(text);
    if text.starts_with('\u{feff}') {
        parser.pos = '\u{feff}'.len_utf8();
    }

    parser.skip_trivia()?;
    if parser.at_end() {
        return Err(parser.error(ParseErrorKind::EmptyDocument));
    }

    let root = parser.value()?;
    parser.skip_trivia()?;
    if !parser.at_end() {
        return Err(parser.error(ParseErrorKind::TrailingContent));
    }
    Ok(root)
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            offset: self.pos,
        }
    }

    fn unexpected(&self) -> ParseError {
        match self.text[self.pos..].chars().next() {
            Some(c) => self.error(ParseErrorKind::UnexpectedCharacter(c)),
            None => self.error(ParseErrorKind::UnexpectedEnd),
        }
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) -> ParseResult<()> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\n' | b'\r') => self.pos += 1,
                Some(b'/') => match self.bytes.get(self.pos + 1) {
                    Some(b'/') => {
                        self.pos += 2;
                        while let Some(b) = self.peek() {
                            if b == b'\n' || b == b'\r' {
                                break;
                            }
                            self.pos += 1;
                        }
                    }
                    Some(b'*') => {
                        let start = self.pos;
                        match self.text[self.pos + 2..].find("*/") {
                            Some(end) => self.pos += 2 + end + 2,
                            None => {
                                return Err(ParseError {
                                    kind: ParseErrorKind::UnterminatedComment,
                                    offset: start,
                                })
                            }
                        }
                    }
                    _ => return Err(self.unexpected()),
                },
                _ => return Ok(()),
            }
        }
    }

    fn value(&mut self) -> ParseResult<Node> {
        match self.peek() {
            None => Err(self.error(ParseErrorKind::UnexpectedEnd)),
            Some(b'{') => self.object(),
            Some(b'[') => self.array(),
            Some(b'"') => {
                let start = self.pos;
                let s = self.string()?;
                Ok(Node::scalar(NodeKind::String, start..self.pos, Value::String(s)))
            }
            Some(b'-' | b'0'..=b'9') => self.number(),
            Some(b't') => self.literal("true", NodeKind::Boolean, Value::Bool(true)),
            Some(b'f') => self.literal("false", NodeKind::Boolean, Value::Bool(false)),
            Some(b'n') => self.literal("null", NodeKind::Null, Value::Null),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn object(&mut self) -> ParseResult<Node> {
        let start = self.pos;
        self.pos += 1;
        let mut properties = Vec::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(b'}') => break,
                Some(b'"') => {}
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
                Some(_) => return Err(self.error(ParseErrorKind::ExpectedPropertyName)),
            }

            let key_start = self.pos;
            let key = self.string()?;
            let key = Node::scalar(NodeKind::String, key_start..self.pos, Value::String(key));

            self.skip_trivia()?;
            if self.peek() != Some(b':') {
                return Err(self.error(ParseErrorKind::ExpectedColon));
            }
            self.pos += 1;
            self.skip_trivia()?;

            let value = self.value()?;
            let span = key.offset..value.end();
            properties.push(Node::container(NodeKind::Property, span, vec![key, value]));

            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => break,
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
                Some(_) => return Err(self.error(ParseErrorKind::ExpectedCommaOrClose)),
            }
        }

        self.pos += 1;
        Ok(Node::container(NodeKind::Object, start..self.pos, properties))
    }

    fn array(&mut self) -> ParseResult<Node> {
        let start = self.pos;
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b']') {
                break;
            }

            items.push(self.value()?);

            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => break,
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
                Some(_) => return Err(self.error(ParseErrorKind::ExpectedCommaOrClose)),
            }
        }

        self.pos += 1;
        Ok(Node::container(NodeKind::Array, start..self.pos, items))
    }

    fn literal(&mut self, word: &str, kind: NodeKind, value: Value) -> ParseResult<Node> {
        if !self.text[self.pos..].starts_with(word) {
            return Err(self.unexpected());
        }
        let start = self.pos;
        self.pos += word.len();
        Ok(Node::scalar(kind, start..self.pos, value))
    }

    fn number(&mut self) -> ParseResult<Node> {
        let start = self.pos;
        while let Some(b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }

        let number: Number = self.text[start..self.pos].parse().map_err(|_| ParseError {
            kind: ParseErrorKind::InvalidNumber,
            offset: start,
        })?;
        Ok(Node::scalar(NodeKind::Number, start..self.pos, Value::Number(number)))
    }

    /// Parse a string literal starting at the opening quote.
    fn string(&mut self) -> ParseResult<String> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        let mut run = self.pos;

        loop {
            match self.peek() {
                None => {
                    return Err(ParseError {
                        kind: ParseErrorKind::UnterminatedString,
                        offset: start,
                    })
                }
                Some(b'"') => {
                    out.push_str(&self.text[run..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\n' | b'\r') => return Err(self.error(ParseErrorKind::LineBreakInString)),
                Some(b'\\') => {
                    out.push_str(&self.text[run..self.pos]);
                    self.pos += 1;
                    out.push(self.escape()?);
                    run = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Decode the escape after a backslash.
    fn escape(&mut self) -> ParseResult<char> {
        let c = match self.peek() {
            Some(b'"') => '"',
            Some(b'\\') => '\\',
            Some(b'/') => '/',
            Some(b'b') => '\u{8}',
            Some(b'f') => '\u{c}',
            Some(b'n') => '\n',
            Some(b'r') => '\r',
            Some(b't') => '\t',
            Some(b'u') => {
                self.pos += 1;
                return self.unicode_escape();
            }
            None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
            Some(_) => return Err(self.error(ParseErrorKind::InvalidEscape)),
        };
        self.pos += 1;
        Ok(c)
    }

    fn unicode_escape(&mut self) -> ParseResult<char> {
        let at = self.pos;
        let high = self.hex4()?;

        let code = if (0xD800..0xDC00).contains(&high) {
            if !self.text[self.pos..].starts_with("\\u") {
                return Err(ParseError {
                    kind: ParseErrorKind::InvalidUnicode,
                    offset: at,
                });
            }
            self.pos += 2;
            let low = self.hex4()?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(ParseError {
                    kind: ParseErrorKind::InvalidUnicode,
                    offset: at,
                });
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };

        char::from_u32(code).ok_or(ParseError {
            kind: ParseErrorKind::InvalidUnicode,
            offset: at,
        })
    }

    fn hex4(&mut self) -> ParseResult<u32> {
        let digits = self
            .text
            .get(self.pos..self.pos + 4)
            .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| self.error(ParseErrorKind::InvalidEscape))?;
        let value = u32::from_str_radix(digits, 16).map_err(|_| self.error(ParseErrorKind::InvalidEscape))?;
        self.pos += 4;
        Ok(value)
    }
}
