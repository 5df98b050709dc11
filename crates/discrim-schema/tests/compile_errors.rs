//! Integration test: schema-authoring defects are rejected at compile time
//! with a stable kind, location and message.

use discrim_schema::{compile, compile_with, CompileOptions, SchemaError, SchemaErrorKind};
use serde_json::{json, Value};

fn reject(schema: Value) -> SchemaError {
    match compile(&schema) {
        Ok(validator) => panic!("expected compile error for {schema}, got {validator:?}"),
        Err(err) => err,
    }
}

#[test]
fn test_requires_one_of() {
    let err = reject(json!({"type": "object", "discriminator": {"propertyName": "foo"}}));
    assert_eq!(err.kind, SchemaErrorKind::MissingOneOf);
    assert!(err.message.contains("discriminator: requires oneOf"));
}

#[test]
fn test_requires_tag_property_schema() {
    let err = reject(json!({
        "type": "object",
        "discriminator": {"propertyName": "foo"},
        "required": ["foo"],
        "oneOf": [{"properties": {}}]
    }));
    assert_eq!(err.kind, SchemaErrorKind::MissingTagProperty);
    assert!(err
        .message
        .contains(r#"discriminator: oneOf subschemas (or referenced schemas) must have "properties/foo""#));
    assert_eq!(err.location.pointer.to_string(), "/oneOf/0");
}

#[test]
fn test_requires_const_or_enum() {
    let err = reject(json!({
        "type": "object",
        "discriminator": {"propertyName": "foo"},
        "required": ["foo"],
        "oneOf": [{"properties": {"foo": {}}}]
    }));
    assert_eq!(err.kind, SchemaErrorKind::MissingTagConstraint);
    assert!(err.message.contains(r#"discriminator: "properties/foo" must have "const" or "enum""#));
}

#[test]
fn test_tag_values_must_be_scalar() {
    for bad in [json!({"baz": "bar"}), json!([1]), json!(null)] {
        let err = reject(json!({
            "type": "object",
            "discriminator": {"propertyName": "foo"},
            "required": ["foo"],
            "oneOf": [{"properties": {"foo": {"const": bad}}}]
        }));
        assert_eq!(err.kind, SchemaErrorKind::InvalidTagType);
        assert!(err
            .message
            .contains(r#"discriminator: "foo" values must be unique strings, numbers or booleans"#));
    }
}

#[test]
fn test_tag_values_must_be_unique() {
    for tag in [json!("a"), json!(1), json!(true)] {
        let err = reject(json!({
            "type": "object",
            "discriminator": {"propertyName": "foo"},
            "required": ["foo"],
            "oneOf": [
                {"properties": {"foo": {"const": tag}}},
                {"properties": {"foo": {"const": tag}}}
            ]
        }));
        assert_eq!(err.kind, SchemaErrorKind::DuplicateTagValue);
        assert!(err.message.contains(r#"discriminator: "foo" values must be unique"#));
        assert_eq!(err.location.pointer.to_string(), "/oneOf/1");
    }
}

#[test]
fn test_equal_looking_tags_of_different_types_are_distinct() {
    let validator = compile(&json!({
        "type": "object",
        "discriminator": {"propertyName": "foo"},
        "required": ["foo"],
        "oneOf": [
            {"properties": {"foo": {"const": "1"}}},
            {"properties": {"foo": {"const": 1}}},
            {"properties": {"foo": {"const": "true"}}},
            {"properties": {"foo": {"const": true}}}
        ]
    }));
    assert!(validator.is_ok());
}

#[test]
fn test_tag_must_be_required() {
    let err = reject(json!({
        "type": "object",
        "discriminator": {"propertyName": "foo"},
        "oneOf": [
            {"properties": {"foo": {"const": "a"}}, "required": ["foo"]},
            {"properties": {"foo": {"const": "b"}}}
        ]
    }));
    assert_eq!(err.kind, SchemaErrorKind::TagNotRequired);
    assert!(err.message.contains(r#"discriminator: "foo" must be required"#));
    assert_eq!(err.location.pointer.to_string(), "/oneOf/1");
}

#[test]
fn test_required_inherited_through_reference() {
    // Required on the referenced branch itself.
    assert!(compile(&json!({
        "definitions": {"A": {"properties": {"foo": {"const": "a"}}, "required": ["foo"]}},
        "discriminator": {"propertyName": "foo"},
        "oneOf": [{"$ref": "#/definitions/A"}]
    }))
    .is_ok());

    // Required on neither.
    let err = reject(json!({
        "definitions": {"A": {"properties": {"foo": {"const": "a"}}}},
        "discriminator": {"propertyName": "foo"},
        "oneOf": [{"$ref": "#/definitions/A"}]
    }));
    assert_eq!(err.kind, SchemaErrorKind::TagNotRequired);
    assert_eq!(err.location.pointer.to_string(), "/definitions/A");
}

#[test]
fn test_reference_with_siblings_is_not_dereferenced() {
    // A `$ref` with a validation sibling is a branch of its own and must
    // declare the tag property itself.
    let err = reject(json!({
        "definitions": {"A": {"properties": {"foo": {"const": "a"}}}},
        "discriminator": {"propertyName": "foo"},
        "required": ["foo"],
        "oneOf": [{"$ref": "#/definitions/A", "minProperties": 1}]
    }));
    assert_eq!(err.kind, SchemaErrorKind::MissingTagProperty);
}

#[test]
fn test_cyclic_discriminator() {
    let err = reject(json!({
        "definitions": {"Self": {"$ref": "#"}},
        "type": "object",
        "discriminator": {"propertyName": "foo"},
        "required": ["foo"],
        "oneOf": [{"$ref": "#/definitions/Self"}]
    }));
    assert_eq!(err.kind, SchemaErrorKind::CyclicDiscriminator);
}

#[test]
fn test_self_reference_is_rejected() {
    let err = reject(json!({"$ref": "#"}));
    assert_eq!(err.kind, SchemaErrorKind::CyclicReference);
    assert_eq!(err.location.pointer.to_string(), "");

    let err = reject(json!({"allOf": [{"$ref": "#"}]}));
    assert_eq!(err.kind, SchemaErrorKind::CyclicReference);
    assert_eq!(err.location.pointer.to_string(), "/allOf/0");
    assert!(err.message.contains("without descending into the instance"));
}

#[test]
fn test_reference_loop_through_definitions_is_rejected() {
    let err = reject(json!({
        "definitions": {"A": {"$ref": "#/definitions/B"}, "B": {"allOf": [{"$ref": "#/definitions/A"}]}},
        "properties": {"x": {"$ref": "#/definitions/A"}}
    }));
    assert_eq!(err.kind, SchemaErrorKind::CyclicReference);

    // Unreached definitions are never compiled.
    assert!(compile(&json!({
        "definitions": {"A": {"$ref": "#/definitions/B"}, "B": {"$ref": "#/definitions/A"}},
        "type": "object"
    }))
    .is_ok());
}

#[test]
fn test_recursion_through_the_instance_is_accepted() {
    for schema in [
        json!({"properties": {"next": {"$ref": "#"}}}),
        json!({"items": {"allOf": [{"$ref": "#"}]}}),
        json!({"anyOf": [{"type": "string"}, {"$ref": "#/definitions/List"}],
               "definitions": {"List": {"type": "array", "items": {"$ref": "#"}}}}),
    ] {
        assert!(compile(&schema).is_ok(), "{schema}");
    }
}

#[test]
fn test_dangling_reference() {
    let err = reject(json!({
        "type": "object",
        "discriminator": {"propertyName": "foo"},
        "required": ["foo"],
        "oneOf": [{"$ref": "#/definitions/Missing"}]
    }));
    assert_eq!(err.kind, SchemaErrorKind::DanglingReference);
    assert_eq!(err.location.pointer.to_string(), "/oneOf/0");
}

#[test]
fn test_unsupported_discriminator_shapes() {
    let err = reject(json!({"discriminator": {"propertyName": 5}, "oneOf": []}));
    assert_eq!(err.kind, SchemaErrorKind::InvalidDiscriminator);

    let err = reject(json!({
        "discriminator": {"propertyName": "foo", "mapping": {"a": "#/definitions/A"}},
        "oneOf": []
    }));
    assert_eq!(err.message, "discriminator: mapping is not supported");

    let err = reject(json!({"discriminator": "foo", "oneOf": []}));
    assert_eq!(err.kind, SchemaErrorKind::InvalidDiscriminator);
}

#[test]
fn test_discriminator_requires_object_type() {
    let err = reject(json!({
        "type": ["string", "null"],
        "discriminator": {"propertyName": "foo"},
        "required": ["foo"],
        "oneOf": [{"properties": {"foo": {"const": "a"}}}]
    }));
    assert_eq!(err.kind, SchemaErrorKind::InvalidDiscriminator);
    assert!(err.message.contains("requires type object"));

    assert!(compile(&json!({
        "type": ["object", "null"],
        "discriminator": {"propertyName": "foo"},
        "required": ["foo"],
        "oneOf": [{"properties": {"foo": {"const": "a"}}}]
    }))
    .is_ok());
}

#[test]
fn test_malformed_structure() {
    let err = reject(json!({"oneOf": {"type": "string"}}));
    assert_eq!(err.kind, SchemaErrorKind::MalformedSchema);

    let err = reject(json!({"$ref": 5}));
    assert_eq!(err.kind, SchemaErrorKind::MalformedSchema);
}

#[test]
fn test_strict_keywords() {
    let schema = json!({
        "type": "object",
        "discriminator": {"propertyName": "foo"},
        "required": ["foo"],
        "oneOf": [{"properties": {"foo": {"const": "a"}}, "x-unknown": 1}]
    });
    assert!(compile(&schema).is_ok());

    let err = compile_with(&schema, CompileOptions::default().strict_keywords(true)).unwrap_err();
    assert_eq!(err.kind, SchemaErrorKind::UnknownKeyword);
    assert_eq!(err.location.pointer.to_string(), "/oneOf/0/x-unknown");
}

#[test]
fn test_error_display_includes_location() {
    let err = reject(json!({"discriminator": {"propertyName": "foo"}}));
    let text = err.to_string();
    assert!(text.starts_with("discriminator: requires oneOf keyword (at "));
    assert!(text.ends_with("#/discriminator)"));
}
