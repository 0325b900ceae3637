//! Compiled path queries over JSON documents.
//!
//! Supports the subset of JSONPath the search configuration uses: the `$` root, child
//! access (`.name`, `['name']`), wildcards (`.*`, `[*]`), array indices (`[n]`) and
//! recursive descent (`..name`, `..*`). Queries are parsed once and evaluated without
//! mutation, so a compiled query can be shared between threads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Child(String),
    Wildcard,
    Index(usize),
    Descendant(String),
    DescendantWildcard,
}

/// A parsed path query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathQuery {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathQueryError {
    #[error("path query '{query}' must start with '$'")]
    MissingRoot { query: String },
    #[error("path query '{query}' is malformed at offset {offset}: {reason}")]
    Malformed {
        query: String,
        offset: usize,
        reason: &'static str,
    },
}

impl PathQuery {
    pub fn parse(query: &str) -> Result<Self, PathQueryError> {
        let source = query.trim().to_string();
        let segments = Parser::new(&source).parse()?;
        Ok(Self { source, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Every node matched by the query, in document order.
    pub fn select<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![document];

        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                match segment {
                    Segment::Child(name) => {
                        if let Some(child) = node.as_object().and_then(|map| map.get(name)) {
                            next.push(child);
                        }
                    }
                    Segment::Wildcard => push_children(node, &mut next),
                    Segment::Index(index) => {
                        if let Some(item) = node.as_array().and_then(|items| items.get(*index)) {
                            next.push(item);
                        }
                    }
                    Segment::Descendant(name) => collect_named(node, name, &mut next),
                    Segment::DescendantWildcard => collect_all(node, &mut next),
                }
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }

        current
    }
}

fn push_children<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    match node {
        Value::Object(map) => out.extend(map.values()),
        Value::Array(items) => out.extend(items.iter()),
        _ => {}
    }
}

fn collect_named<'a>(node: &'a Value, name: &str, out: &mut Vec<&'a Value>) {
    match node {
        Value::Object(map) => {
            if let Some(value) = map.get(name) {
                out.push(value);
            }
            for value in map.values() {
                collect_named(value, name, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_named(item, name, out);
            }
        }
        _ => {}
    }
}

fn collect_all<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    let mut children = Vec::new();
    push_children(node, &mut children);
    for child in children {
        out.push(child);
        collect_all(child, out);
    }
}

impl fmt::Display for PathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for PathQuery {
    type Err = PathQueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for PathQuery {
    type Error = PathQueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PathQuery> for String {
    fn from(query: PathQuery) -> Self {
        query.source
    }
}

struct Parser<'q> {
    query: &'q str,
    bytes: &'q [u8],
    position: usize,
}

impl<'q> Parser<'q> {
    fn new(query: &'q str) -> Self {
        Self {
            query,
            bytes: query.as_bytes(),
            position: 0,
        }
    }

    fn parse(mut self) -> Result<Vec<Segment>, PathQueryError> {
        if self.bytes.first() != Some(&b'$') {
            return Err(PathQueryError::MissingRoot {
                query: self.query.to_string(),
            });
        }
        self.position = 1;

        let mut segments = Vec::new();
        while let Some(byte) = self.peek() {
            let segment = match byte {
                b'.' if self.peek_at(1) == Some(b'.') => {
                    self.position += 2;
                    self.descendant()?
                }
                b'.' => {
                    self.position += 1;
                    self.dotted()?
                }
                b'[' => self.bracketed()?,
                _ => return Err(self.error("expected '.' or '['")),
            };
            segments.push(segment);
        }

        Ok(segments)
    }

    fn descendant(&mut self) -> Result<Segment, PathQueryError> {
        match self.peek() {
            Some(b'*') => {
                self.position += 1;
                Ok(Segment::DescendantWildcard)
            }
            Some(b'[') => match self.bracketed()? {
                Segment::Child(name) => Ok(Segment::Descendant(name)),
                Segment::Wildcard => Ok(Segment::DescendantWildcard),
                _ => Err(self.error("recursive descent only supports names and wildcards")),
            },
            _ => Ok(Segment::Descendant(self.name()?)),
        }
    }

    fn dotted(&mut self) -> Result<Segment, PathQueryError> {
        if self.peek() == Some(b'*') {
            self.position += 1;
            return Ok(Segment::Wildcard);
        }
        Ok(Segment::Child(self.name()?))
    }

    fn bracketed(&mut self) -> Result<Segment, PathQueryError> {
        self.expect(b'[')?;
        let segment = match self.peek() {
            Some(b'*') => {
                self.position += 1;
                Segment::Wildcard
            }
            Some(quote @ (b'\'' | b'"')) => {
                self.position += 1;
                let start = self.position;
                while let Some(byte) = self.peek() {
                    if byte == quote {
                        break;
                    }
                    self.position += 1;
                }
                let name = self.query[start..self.position].to_string();
                self.expect(quote)?;
                if name.is_empty() {
                    return Err(self.error("empty quoted name"));
                }
                Segment::Child(name)
            }
            Some(byte) if byte.is_ascii_digit() => {
                let start = self.position;
                while self.peek().is_some_and(|byte| byte.is_ascii_digit()) {
                    self.position += 1;
                }
                let index = self.query[start..self.position]
                    .parse()
                    .map_err(|_| self.error("array index out of range"))?;
                Segment::Index(index)
            }
            _ => return Err(self.error("expected '*', an index or a quoted name")),
        };
        self.expect(b']')?;
        Ok(segment)
    }

    fn name(&mut self) -> Result<String, PathQueryError> {
        let start = self.position;
        while let Some(byte) = self.peek() {
            if matches!(byte, b'.' | b'[' | b']') || byte.is_ascii_whitespace() {
                break;
            }
            self.position += 1;
        }
        if start == self.position {
            return Err(self.error("expected a property name"));
        }
        Ok(self.query[start..self.position].to_string())
    }

    fn expect(&mut self, expected: u8) -> Result<(), PathQueryError> {
        if self.peek() == Some(expected) {
            self.position += 1;
            Ok(())
        } else {
            Err(self.error("unexpected character"))
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.position + offset).copied()
    }

    fn error(&self, reason: &'static str) -> PathQueryError {
        PathQueryError::Malformed {
            query: self.query.to_string(),
            offset: self.position,
            reason,
        }
    }
}
