//! # Keyword Vocabulary
//!
//! The vocabulary is split three ways:
//!
//! - [`CoreKeyword`]: the closed set the compiler handles itself: the
//!   discriminator and everything it depends on. Matching on it is
//!   exhaustive, so adding a core keyword forces the compiler to handle it.
//! - Annotation keywords: carry no assertion and are never rejected, even
//!   in strict mode.
//! - Everything else is looked up in the
//!   [`KeywordRegistry`](crate::registry::KeywordRegistry).
//!
//! Independently of that split, [`structure_of`] says which keywords hold
//! subschemas; the graph resolver uses it to find child nodes whether or not
//! a validator exists for the keyword.

/// Keywords compiled directly by the validation compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreKeyword {
    Type,
    Const,
    Enum,
    Required,
    Properties,
    Ref,
    AllOf,
    AnyOf,
    OneOf,
    Discriminator,
}

impl CoreKeyword {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "type" => Self::Type,
            "const" => Self::Const,
            "enum" => Self::Enum,
            "required" => Self::Required,
            "properties" => Self::Properties,
            "$ref" => Self::Ref,
            "allOf" => Self::AllOf,
            "anyOf" => Self::AnyOf,
            "oneOf" => Self::OneOf,
            "discriminator" => Self::Discriminator,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Const => "const",
            Self::Enum => "enum",
            Self::Required => "required",
            Self::Properties => "properties",
            Self::Ref => "$ref",
            Self::AllOf => "allOf",
            Self::AnyOf => "anyOf",
            Self::OneOf => "oneOf",
            Self::Discriminator => "discriminator",
        }
    }
}

/// Keywords that never assert anything.
const ANNOTATIONS: &[&str] = &[
    "$schema",
    "$id",
    "$comment",
    "$anchor",
    "$vocabulary",
    "title",
    "description",
    "default",
    "examples",
    "deprecated",
    "readOnly",
    "writeOnly",
    "definitions",
    "$defs",
];

/// Whether `name` is an annotation-only keyword.
pub fn is_annotation(name: &str) -> bool {
    ANNOTATIONS.contains(&name)
}

/// Whether the subschemas under `name` are definitions, reachable only
/// through `$ref`.
pub fn is_definitions(name: &str) -> bool {
    matches!(name, "definitions" | "$defs")
}

/// JSON shape of a keyword that holds subschemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structure {
    /// One subschema (`not`, `additionalProperties`, …).
    Single,
    /// An array of subschemas (`oneOf`, `prefixItems`, …).
    List,
    /// An object of named subschemas (`properties`, `definitions`, …).
    Map,
    /// `items`: a single schema, or an array in the tuple form.
    SingleOrList,
}

/// The structure of a subschema-holding keyword; `None` for leaf keywords.
pub fn structure_of(name: &str) -> Option<Structure> {
    Some(match name {
        "properties" | "patternProperties" | "definitions" | "$defs" | "dependentSchemas" => {
            Structure::Map
        }
        "allOf" | "anyOf" | "oneOf" | "prefixItems" => Structure::List,
        "additionalItems" | "additionalProperties" | "not" | "if" | "then" | "else"
        | "contains" | "propertyNames" => Structure::Single,
        "items" => Structure::SingleOrList,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_keyword_names_round_trip() {
        for name in [
            "type",
            "const",
            "enum",
            "required",
            "properties",
            "$ref",
            "allOf",
            "anyOf",
            "oneOf",
            "discriminator",
        ] {
            assert_eq!(CoreKeyword::from_name(name).map(CoreKeyword::name), Some(name));
        }
        assert_eq!(CoreKeyword::from_name("pattern"), None);
    }

    #[test]
    fn test_structure_table() {
        assert_eq!(structure_of("oneOf"), Some(Structure::List));
        assert_eq!(structure_of("properties"), Some(Structure::Map));
        assert_eq!(structure_of("not"), Some(Structure::Single));
        assert_eq!(structure_of("items"), Some(Structure::SingleOrList));
        assert_eq!(structure_of("const"), None);
        assert_eq!(structure_of("discriminator"), None);
    }

    #[test]
    fn test_definitions_are_annotations() {
        assert!(is_annotation("definitions"));
        assert!(is_annotation("$defs"));
        assert!(is_definitions("$defs"));
        assert!(!is_annotation("pattern"));
    }
}
