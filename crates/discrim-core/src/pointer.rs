//! # JSON Pointers & Schema Locations
//!
//! RFC 6901 JSON Pointers are used on both sides of validation:
//!
//! - **Instance locations** point into the value being validated
//!   (`/container/list/0/_type`).
//! - **Schema locations** point into a schema document. A [`SchemaLocation`]
//!   pairs a pointer with the base URI of the document it lives in, which is
//!   the identity of every node in the schema graph.
//!
//! Segments are stored unescaped; `~0`/`~1` escaping is applied only when a
//! pointer is rendered or parsed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::PointerError;

/// An RFC 6901 JSON Pointer.
///
/// The empty pointer (no segments) addresses the whole document and renders
/// as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer {
    segments: Vec<String>,
}

impl JsonPointer {
    /// The pointer to the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a pointer from already-unescaped segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the textual form (`""` or `/a/b~1c`).
    ///
    /// # Errors
    ///
    /// Returns [`PointerError::MissingLeadingSlash`] for non-empty input that
    /// does not start with `/`, and [`PointerError::InvalidEscape`] when a `~`
    /// is not followed by `0` or `1`.
    pub fn parse(text: &str) -> Result<Self, PointerError> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = text.strip_prefix('/') else {
            return Err(PointerError::MissingLeadingSlash(text.to_string()));
        };
        let segments = rest
            .split('/')
            .map(|raw| unescape(raw).ok_or_else(|| PointerError::InvalidEscape(text.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// Returns a new pointer with `segment` appended.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.segments.push(segment.into());
        next
    }

    /// Returns a new pointer with an array index appended.
    pub fn join_index(&self, index: usize) -> Self {
        self.join(index.to_string())
    }

    /// Append a segment in place.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// Returns a new pointer with every segment of `suffix` appended.
    pub fn concat(&self, suffix: &JsonPointer) -> Self {
        let mut next = self.clone();
        next.segments.extend(suffix.segments.iter().cloned());
        next
    }

    /// The unescaped segments of this pointer.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this pointer addresses the document root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The last segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The pointer without its last segment; `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.segments.pop();
        Some(parent)
    }

    /// Whether `prefix` is an ancestor of (or equal to) this pointer.
    pub fn starts_with(&self, prefix: &JsonPointer) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Walk `document` along this pointer.
    ///
    /// Array segments must be canonical decimal indices (no sign, no leading
    /// zeros).
    pub fn resolve<'v>(&self, document: &'v Value) -> Option<&'v Value> {
        let mut current = document;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(parse_index(segment)?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            f.write_str("/")?;
            f.write_str(&escape(segment))?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape(raw: &str) -> Option<String> {
    if !raw.contains('~') {
        return Some(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || (segment.len() > 1 && segment.starts_with('0')) {
        return None;
    }
    if !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

// ─── Schema locations ────────────────────────────────────────────────

/// The canonical identity of a schema node: the base URI of its document
/// plus a JSON Pointer inside that document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaLocation {
    /// Base URI (or store key) of the owning document.
    pub document: String,
    /// Pointer to the fragment inside the document.
    pub pointer: JsonPointer,
}

impl SchemaLocation {
    /// Location of a document's root.
    pub fn document_root(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            pointer: JsonPointer::root(),
        }
    }

    /// Location of a fragment inside `document`.
    pub fn new(document: impl Into<String>, pointer: JsonPointer) -> Self {
        Self {
            document: document.into(),
            pointer,
        }
    }

    /// Returns the location one segment below this one in the same document.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        Self {
            document: self.document.clone(),
            pointer: self.pointer.join(segment),
        }
    }
}

impl fmt::Display for SchemaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document, self.pointer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_renders_empty() {
        assert_eq!(JsonPointer::root().to_string(), "");
        assert!(JsonPointer::parse("").unwrap().is_root());
    }

    #[test]
    fn test_parse_unescapes_segments() {
        let ptr = JsonPointer::parse("/definitions/a~1b/c~0d").unwrap();
        assert_eq!(ptr.segments(), &["definitions", "a/b", "c~d"]);
        assert_eq!(ptr.to_string(), "/definitions/a~1b/c~0d");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            JsonPointer::parse("definitions"),
            Err(PointerError::MissingLeadingSlash(_))
        ));
        assert!(matches!(
            JsonPointer::parse("/a~2"),
            Err(PointerError::InvalidEscape(_))
        ));
    }

    #[test]
    fn test_resolve_walks_objects_and_arrays() {
        let doc = json!({"oneOf": [{"const": 1}, {"properties": {"a/b": true}}]});
        let ptr = JsonPointer::from_segments(["oneOf", "1", "properties", "a/b"]);
        assert_eq!(ptr.resolve(&doc), Some(&json!(true)));
        assert_eq!(
            JsonPointer::from_segments(["oneOf", "01"]).resolve(&doc),
            None
        );
        assert_eq!(JsonPointer::from_segments(["oneOf", "2"]).resolve(&doc), None);
    }

    #[test]
    fn test_parent_and_prefix() {
        let ptr = JsonPointer::from_segments(["a", "b", "c"]);
        assert_eq!(ptr.parent().unwrap().to_string(), "/a/b");
        assert!(ptr.starts_with(&JsonPointer::from_segments(["a"])));
        assert!(!ptr.starts_with(&JsonPointer::from_segments(["b"])));
        assert_eq!(JsonPointer::root().parent(), None);
    }

    #[test]
    fn test_serde_uses_string_form() {
        let ptr = JsonPointer::from_segments(["list", "0", "_type"]);
        let encoded = serde_json::to_value(&ptr).unwrap();
        assert_eq!(encoded, json!("/list/0/_type"));
        let decoded: JsonPointer = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, ptr);
    }

    #[test]
    fn test_schema_location_display() {
        let loc = SchemaLocation::document_root("https://example.com/main.json")
            .join("definitions")
            .join("Block");
        assert_eq!(loc.to_string(), "https://example.com/main.json#/definitions/Block");
    }
}
