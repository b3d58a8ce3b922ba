//! Path syntax for addressing values inside a `serde_json::Value`
//!
//! Supported forms: the root `$`, dot keys (`.name`), bracket indexes (`[3]`),
//! the wildcard index `[*]` and quoted bracket keys (`['a.b']`).

use crate::error::{Error, Result};
use std::fmt;

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

/// A parsed path: root followed by zero or more segments
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn root() -> Self {
        JsonPath::default()
    }

    pub fn parse(path: &str) -> Result<Self> {
        let bytes = path.as_bytes();
        if bytes.first() != Some(&b'$') {
            return Err(Error::invalid_path(path, "must start with '$'"));
        }

        let mut segments = Vec::new();
        let mut pos = 1;
        while pos < bytes.len() {
            match bytes[pos] {
                b'.' => {
                    pos += 1;
                    // `$.[0]` is accepted as `$[0]`
                    if pos < bytes.len() && bytes[pos] == b'[' {
                        continue;
                    }
                    let start = pos;
                    while pos < bytes.len() && bytes[pos] != b'.' && bytes[pos] != b'[' {
                        pos += 1;
                    }
                    if start == pos {
                        return Err(Error::invalid_path(path, format!("empty key at offset {}", start)));
                    }
                    segments.push(Segment::Key(path[start..pos].to_string()));
                }
                b'[' => {
                    let close = path[pos..]
                        .find(']')
                        .map(|offset| pos + offset)
                        .ok_or_else(|| Error::invalid_path(path, "unterminated '['"))?;
                    let inner = &path[pos + 1..close];
                    segments.push(Self::parse_bracket(path, inner)?);
                    pos = close + 1;
                }
                other => {
                    return Err(Error::invalid_path(
                        path,
                        format!("unexpected '{}' at offset {}", other as char, pos),
                    ));
                }
            }
        }

        Ok(JsonPath { segments })
    }

    fn parse_bracket(path: &str, inner: &str) -> Result<Segment> {
        if inner == "*" {
            return Ok(Segment::Wildcard);
        }
        if inner.len() >= 2 && inner.starts_with('\'') && inner.ends_with('\'') {
            return Ok(Segment::Key(inner[1..inner.len() - 1].to_string()));
        }
        inner
            .parse::<usize>()
            .map(Segment::Index)
            .map_err(|_| Error::invalid_path(path, format!("bad index '{}'", inner)))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn child(&self, segment: Segment) -> Self {
        let mut next = self.clone();
        next.push(segment);
        next
    }

    pub fn is_concrete(&self) -> bool {
        !self.segments.iter().any(|s| matches!(s, Segment::Wildcard))
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                Segment::Key(key) if key.contains(|c| matches!(c, '.' | '[' | ']')) => {
                    write!(f, "['{}']", key)?
                }
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
                Segment::Wildcard => f.write_str("[*]")?,
            }
        }
        Ok(())
    }
}
