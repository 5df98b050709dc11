//! # Error Types — Compile-Time vs Run-Time
//!
//! Two disjoint taxonomies, never conflated:
//!
//! - [`SchemaError`]: schema-authoring defects found while resolving or
//!   compiling a schema. Fatal to the compile call; no partial validator is
//!   ever returned.
//! - [`ValidationError`]: data defects found while validating an instance.
//!   Always returned as data, never raised.
//!
//! [`ResolutionError`] is the narrower error of reference resolution; it
//! converts into a [`SchemaError`] so compile callers see one error type.
//!
//! Discriminator messages are stable (`discriminator: requires oneOf
//! keyword`, `... must have "const" or "enum"`, `... must be required`) and
//! callers may match on substrings.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pointer::{JsonPointer, SchemaLocation};
use crate::tag::TagValue;

// ─── Compile-time errors ─────────────────────────────────────────────

/// Enumerated kind of a [`SchemaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaErrorKind {
    /// A `$ref` (or the requested root) names no schema.
    DanglingReference,
    /// A structural keyword has the wrong JSON shape, or a `$ref` is unparsable.
    MalformedSchema,
    /// `discriminator` without a sibling `oneOf`.
    MissingOneOf,
    /// `discriminator` value is unusable (no `propertyName`, `mapping`, non-object `type`).
    InvalidDiscriminator,
    /// A branch lacks `properties/<propertyName>`.
    MissingTagProperty,
    /// The tag property schema has neither `const` nor `enum`.
    MissingTagConstraint,
    /// A tag value is not a string, number or boolean.
    InvalidTagType,
    /// Two branches (or one branch twice) declare the same tag.
    DuplicateTagValue,
    /// The tag property is not `required` by a branch nor by the enclosing schema.
    TagNotRequired,
    /// Keyword not in the registry (strict mode only).
    UnknownKeyword,
    /// A branch reference leads back to the discriminator that owns it.
    CyclicDiscriminator,
    /// A chain of pure `$ref`s loops without reaching a concrete schema.
    CyclicReference,
    /// A keyword plugin rejected its keyword value.
    InvalidKeywordValue,
}

impl SchemaErrorKind {
    /// Stable snake_case name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DanglingReference => "dangling_reference",
            Self::MalformedSchema => "malformed_schema",
            Self::MissingOneOf => "missing_one_of",
            Self::InvalidDiscriminator => "invalid_discriminator",
            Self::MissingTagProperty => "missing_tag_property",
            Self::MissingTagConstraint => "missing_tag_constraint",
            Self::InvalidTagType => "invalid_tag_type",
            Self::DuplicateTagValue => "duplicate_tag_value",
            Self::TagNotRequired => "tag_not_required",
            Self::UnknownKeyword => "unknown_keyword",
            Self::CyclicDiscriminator => "cyclic_discriminator",
            Self::CyclicReference => "cyclic_reference",
            Self::InvalidKeywordValue => "invalid_keyword_value",
        }
    }
}

impl fmt::Display for SchemaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schema-authoring defect detected at compile time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at {location})")]
pub struct SchemaError {
    /// What went wrong.
    pub kind: SchemaErrorKind,
    /// The offending schema location.
    pub location: SchemaLocation,
    /// Human-readable description.
    pub message: String,
}

impl SchemaError {
    pub fn new(kind: SchemaErrorKind, location: SchemaLocation, message: impl Into<String>) -> Self {
        Self {
            kind,
            location,
            message: message.into(),
        }
    }

    pub fn missing_one_of(location: SchemaLocation) -> Self {
        Self::new(
            SchemaErrorKind::MissingOneOf,
            location,
            "discriminator: requires oneOf keyword",
        )
    }

    pub fn invalid_discriminator(location: SchemaLocation, reason: &str) -> Self {
        Self::new(
            SchemaErrorKind::InvalidDiscriminator,
            location,
            format!("discriminator: {reason}"),
        )
    }

    pub fn missing_tag_property(branch: SchemaLocation, property: &str) -> Self {
        Self::new(
            SchemaErrorKind::MissingTagProperty,
            branch,
            format!(
                "discriminator: oneOf subschemas (or referenced schemas) must have \"properties/{property}\""
            ),
        )
    }

    pub fn missing_tag_constraint(branch: SchemaLocation, property: &str) -> Self {
        Self::new(
            SchemaErrorKind::MissingTagConstraint,
            branch,
            format!("discriminator: \"properties/{property}\" must have \"const\" or \"enum\""),
        )
    }

    pub fn invalid_tag_type(branch: SchemaLocation, property: &str) -> Self {
        Self::new(
            SchemaErrorKind::InvalidTagType,
            branch,
            format!(
                "discriminator: \"{property}\" values must be unique strings, numbers or booleans (invalid tag type)"
            ),
        )
    }

    pub fn duplicate_tag_value(branch: SchemaLocation, property: &str, tag: &TagValue) -> Self {
        Self::new(
            SchemaErrorKind::DuplicateTagValue,
            branch,
            format!(
                "discriminator: \"{property}\" values must be unique strings, numbers or booleans ({} {tag} is declared more than once)",
                tag.type_name()
            ),
        )
    }

    pub fn tag_not_required(branch: SchemaLocation, property: &str) -> Self {
        Self::new(
            SchemaErrorKind::TagNotRequired,
            branch,
            format!("discriminator: \"{property}\" must be required"),
        )
    }

    pub fn cyclic_discriminator(branch: SchemaLocation, property: &str) -> Self {
        Self::new(
            SchemaErrorKind::CyclicDiscriminator,
            branch,
            format!("discriminator: \"{property}\" branch references its own oneOf"),
        )
    }

    pub fn cyclic_reference(location: SchemaLocation) -> Self {
        Self::new(
            SchemaErrorKind::CyclicReference,
            location,
            "$ref chain loops without reaching a schema",
        )
    }

    /// `$ref`/`allOf` edges that return to `location` without descending
    /// into the instance.
    pub fn unbounded_recursion(location: SchemaLocation) -> Self {
        Self::new(
            SchemaErrorKind::CyclicReference,
            location,
            "$ref loops back to this schema without descending into the instance",
        )
    }

    pub fn unknown_keyword(location: SchemaLocation, keyword: &str) -> Self {
        Self::new(
            SchemaErrorKind::UnknownKeyword,
            location,
            format!("strict mode: unknown keyword: \"{keyword}\""),
        )
    }

    pub fn invalid_keyword_value(location: SchemaLocation, keyword: &str, reason: &str) -> Self {
        Self::new(
            SchemaErrorKind::InvalidKeywordValue,
            location,
            format!("\"{keyword}\" {reason}"),
        )
    }

    pub fn malformed(location: SchemaLocation, reason: impl Into<String>) -> Self {
        Self::new(SchemaErrorKind::MalformedSchema, location, reason)
    }
}

/// Failure while turning documents into a schema graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// A `$ref` names a location with no schema.
    #[error("dangling reference \"{reference}\" at {from}: nothing at {target}")]
    DanglingReference {
        /// The node holding the `$ref`.
        from: SchemaLocation,
        /// The raw `$ref` text.
        reference: String,
        /// Where the reference resolved to.
        target: SchemaLocation,
    },

    /// The root document is not in the store.
    #[error("unknown document \"{0}\"")]
    UnknownDocument(String),

    /// A structural keyword or `$ref` has an unusable value.
    #[error("malformed \"{keyword}\" at {location}: {reason}")]
    Malformed {
        /// The node holding the keyword.
        location: SchemaLocation,
        /// The keyword name.
        keyword: String,
        /// Why the value is unusable.
        reason: String,
    },
}

impl From<ResolutionError> for SchemaError {
    fn from(err: ResolutionError) -> Self {
        let message = err.to_string();
        match err {
            ResolutionError::DanglingReference { from, .. } => {
                SchemaError::new(SchemaErrorKind::DanglingReference, from, message)
            }
            ResolutionError::UnknownDocument(document) => SchemaError::new(
                SchemaErrorKind::DanglingReference,
                SchemaLocation::document_root(document),
                message,
            ),
            ResolutionError::Malformed { location, .. } => {
                SchemaError::new(SchemaErrorKind::MalformedSchema, location, message)
            }
        }
    }
}

/// Error parsing a textual JSON Pointer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PointerError {
    #[error("JSON pointer \"{0}\" must start with '/'")]
    MissingLeadingSlash(String),
    #[error("JSON pointer \"{0}\" contains an invalid '~' escape")]
    InvalidEscape(String),
}

/// A `type` keyword named something outside the vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown type name \"{0}\"")]
pub struct UnknownTypeName(pub String);

// ─── Run-time errors ─────────────────────────────────────────────────

/// A single violated constraint found while validating an instance.
///
/// The shape (four fields, serialized camelCase) is stable for downstream
/// tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// Pointer into the validated value.
    pub instance_location: JsonPointer,
    /// Evaluation path through the schema, ending at the keyword.
    pub schema_location: JsonPointer,
    /// The keyword that failed.
    pub keyword: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_location.is_root() {
            write!(f, "(root): {} [{}]", self.message, self.schema_location)
        } else {
            write!(
                f,
                "{}: {} [{}]",
                self.instance_location, self.message, self.schema_location
            )
        }
    }
}

/// The non-empty error list of a failed validation, as an `Error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} validation error(s):\n{}", .0.len(), render(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<ValidationError> {
        self.0
    }
}

fn render(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
