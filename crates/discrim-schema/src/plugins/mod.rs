//! Built-in keyword plugins.
//!
//! These cover the keywords the discriminator does not depend on. Each
//! submodule exposes `compile_*` functions with the [`KeywordCompiler`]
//! closure signature; [`register_builtins`] wires them into a registry.
//!
//! [`KeywordCompiler`]: crate::registry::KeywordCompiler

mod applicator;
mod collection;
mod numeric;
mod string;

use discrim_core::SchemaError;
use serde_json::Value;

use crate::registry::{KeywordContext, KeywordRegistry, KeywordValidator};

type Compiled = Result<Option<Box<dyn KeywordValidator>>, SchemaError>;

/// Register every built-in plugin.
pub(crate) fn register_builtins(registry: &mut KeywordRegistry) {
    // Applicators.
    registry.register("not", applicator::compile_not);
    registry.register("items", applicator::compile_items);
    registry.register("prefixItems", applicator::compile_prefix_items);
    registry.register("additionalItems", passive);
    registry.register("contains", applicator::compile_contains);
    registry.register("minContains", passive);
    registry.register("maxContains", passive);
    registry.register("additionalProperties", applicator::compile_additional_properties);
    registry.register("patternProperties", applicator::compile_pattern_properties);
    registry.register("propertyNames", applicator::compile_property_names);
    registry.register("dependentSchemas", applicator::compile_dependent_schemas);
    registry.register("if", applicator::compile_if);
    registry.register("then", passive);
    registry.register("else", passive);

    // Numbers.
    registry.register("minimum", numeric::compile_bound);
    registry.register("maximum", numeric::compile_bound);
    registry.register("exclusiveMinimum", numeric::compile_bound);
    registry.register("exclusiveMaximum", numeric::compile_bound);
    registry.register("multipleOf", numeric::compile_multiple_of);

    // Strings.
    registry.register("minLength", string::compile_length);
    registry.register("maxLength", string::compile_length);
    registry.register("pattern", string::compile_pattern);
    registry.register("format", string::compile_format);

    // Arrays and objects.
    registry.register("minItems", collection::compile_count);
    registry.register("maxItems", collection::compile_count);
    registry.register("minProperties", collection::compile_count);
    registry.register("maxProperties", collection::compile_count);
    registry.register("uniqueItems", collection::compile_unique_items);
}

/// Keywords evaluated by a sibling's plugin (`then`/`else` by `if`,
/// `additionalItems` by `items`, `minContains`/`maxContains` by
/// `contains`).
fn passive(_ctx: &KeywordContext<'_>) -> Compiled {
    Ok(None)
}

/// The keyword value as a non-negative integer. Integral floats (`2.0`)
/// are accepted.
fn non_negative_integer(ctx: &KeywordContext<'_>) -> Result<u64, SchemaError> {
    as_count(ctx.value()).ok_or_else(|| ctx.invalid("must be a non-negative integer"))
}

/// Sibling keyword `name` as a non-negative integer, if present.
fn sibling_count(ctx: &KeywordContext<'_>, name: &str) -> Result<Option<u64>, SchemaError> {
    ctx.sibling(name)
        .map(|value| {
            as_count(value).ok_or_else(|| {
                SchemaError::invalid_keyword_value(
                    ctx.node().location().join(name),
                    name,
                    "must be a non-negative integer",
                )
            })
        })
        .transpose()
}

fn as_count(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => Some(f as u64),
        _ => None,
    }
}

/// The keyword value as a number.
fn number(ctx: &KeywordContext<'_>) -> Result<f64, SchemaError> {
    match ctx.value() {
        Value::Number(n) => n.as_f64().ok_or_else(|| ctx.invalid("must be a finite number")),
        _ => Err(ctx.invalid("must be a number")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::{compile, compile_with, CompileOptions, SchemaErrorKind};

    fn errors(schema: Value, instance: Value) -> Vec<(String, String, String)> {
        compile(&schema)
            .unwrap()
            .validate(&instance)
            .errors
            .into_iter()
            .map(|e| (e.instance_location.to_string(), e.schema_location.to_string(), e.message))
            .collect()
    }

    #[test]
    fn test_not() {
        let validator = compile(&json!({"not": {"type": "string"}})).unwrap();
        assert!(validator.is_valid(&json!(1)));
        let outcome = validator.validate(&json!("a"));
        assert_eq!(outcome.errors[0].keyword, "not");
        assert_eq!(outcome.errors[0].message, "must NOT be valid");
    }

    #[test]
    fn test_items_and_prefix_items() {
        let schema = json!({"prefixItems": [{"type": "string"}], "items": {"type": "integer"}});
        let errs = errors(schema, json!(["a", 1, "b"]));
        assert_eq!(
            errs,
            vec![("/2".into(), "/items/type".into(), "must be integer".into())]
        );

        let errs = errors(json!({"prefixItems": [{"type": "string"}]}), json!([1]));
        assert_eq!(errs[0].1, "/prefixItems/0/type");
    }

    #[test]
    fn test_tuple_items_with_additional_items() {
        let schema = json!({
            "items": [{"type": "string"}, {"type": "number"}],
            "additionalItems": false
        });
        let validator = compile(&schema).unwrap();
        assert!(validator.is_valid(&json!(["a", 1])));
        let outcome = validator.validate(&json!(["a", 1, null]));
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].instance_location.to_string(), "/2");
        assert_eq!(outcome.errors[0].schema_location.to_string(), "/additionalItems");
    }

    #[test]
    fn test_contains() {
        let validator = compile(&json!({"contains": {"const": 3}})).unwrap();
        assert!(validator.is_valid(&json!([1, 2, 3])));
        assert!(!validator.is_valid(&json!([1, 2])));
        assert!(!validator.is_valid(&json!([])));
        assert!(validator.is_valid(&json!("not an array")));
    }

    #[test]
    fn test_contains_bounds() {
        let schema = json!({"contains": {"const": 3}, "minContains": 2, "maxContains": 3});
        let validator = compile(&schema).unwrap();
        assert!(validator.is_valid(&json!([3, 1, 3])));
        assert!(validator.is_valid(&json!([3, 3, 3])));

        let errs = errors(schema.clone(), json!([3, 1]));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].1, "/contains");
        assert_eq!(errs[0].2, "must contain at least 2 valid item(s)");

        let errs = errors(schema, json!([3, 3, 3, 3]));
        assert_eq!(errs[0].2, "must contain at most 3 valid item(s)");

        let optional = compile(&json!({"contains": {"const": 3}, "minContains": 0})).unwrap();
        assert!(optional.is_valid(&json!([])));

        let err = compile(&json!({"contains": true, "maxContains": -1})).unwrap_err();
        assert_eq!(err.kind, SchemaErrorKind::InvalidKeywordValue);
        assert_eq!(err.location.pointer.to_string(), "/maxContains");
    }

    #[test]
    fn test_contains_bounds_without_contains_are_ignored() {
        let validator = compile_with(
            &json!({"minContains": 5}),
            CompileOptions::default().strict_keywords(true),
        )
        .unwrap();
        assert!(validator.is_valid(&json!([])));
    }

    #[test]
    fn test_additional_properties() {
        let schema = json!({
            "properties": {"a": true},
            "patternProperties": {"^x-": true},
            "additionalProperties": false
        });
        let errs = errors(schema, json!({"a": 1, "x-y": 2, "b": 3}));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].2, "must NOT have additional property 'b'");

        let errs = errors(json!({"additionalProperties": {"type": "string"}}), json!({"b": 3}));
        assert_eq!(errs[0].0, "/b");
        assert_eq!(errs[0].1, "/additionalProperties/type");
    }

    #[test]
    fn test_pattern_properties_and_property_names() {
        let errs = errors(
            json!({"patternProperties": {"^n_": {"type": "number"}}}),
            json!({"n_a": "x", "other": "y"}),
        );
        assert_eq!(errs, vec![("/n_a".into(), "/patternProperties/^n_/type".into(), "must be number".into())]);

        let errs = errors(json!({"propertyNames": {"maxLength": 2}}), json!({"abc": 1, "ab": 2}));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].0, "/abc");
    }

    #[test]
    fn test_if_then_else() {
        let schema = json!({
            "if": {"properties": {"kind": {"const": "n"}}},
            "then": {"properties": {"value": {"type": "number"}}},
            "else": {"properties": {"value": {"type": "string"}}}
        });
        let validator = compile(&schema).unwrap();
        assert!(validator.is_valid(&json!({"kind": "n", "value": 1})));
        assert!(validator.is_valid(&json!({"kind": "s", "value": "x"})));
        let outcome = validator.validate(&json!({"kind": "n", "value": "x"}));
        let paths: Vec<String> = outcome.errors.iter().map(|e| e.schema_location.to_string()).collect();
        assert_eq!(paths, vec!["/then/properties/value/type", "/if"]);
    }

    #[test]
    fn test_dependent_schemas() {
        let validator = compile(&json!({
            "dependentSchemas": {"card": {"required": ["billing"]}}
        }))
        .unwrap();
        assert!(validator.is_valid(&json!({"name": "x"})));
        assert!(!validator.is_valid(&json!({"card": 1})));
        assert!(validator.is_valid(&json!({"card": 1, "billing": 2})));
    }

    #[test]
    fn test_numeric_bounds() {
        let validator = compile(&json!({"minimum": 1, "exclusiveMaximum": 10})).unwrap();
        assert!(validator.is_valid(&json!(1)));
        assert!(validator.is_valid(&json!(9.5)));
        assert!(!validator.is_valid(&json!(10)));
        let outcome = validator.validate(&json!(0));
        assert_eq!(outcome.errors[0].message, "must be >= 1");
        assert!(validator.is_valid(&json!("ignored")));
    }

    #[test]
    fn test_multiple_of() {
        let validator = compile(&json!({"multipleOf": 0.1})).unwrap();
        assert!(validator.is_valid(&json!(0.3)));
        assert!(!validator.is_valid(&json!(0.35)));

        let validator = compile(&json!({"multipleOf": 3})).unwrap();
        assert!(validator.is_valid(&json!(9)));
        assert!(!validator.is_valid(&json!(10)));

        let err = compile(&json!({"multipleOf": 0})).unwrap_err();
        assert_eq!(err.kind, SchemaErrorKind::InvalidKeywordValue);
    }

    #[test]
    fn test_string_keywords() {
        let validator = compile(&json!({"minLength": 2, "maxLength": 3, "pattern": "^a"})).unwrap();
        assert!(validator.is_valid(&json!("ab")));
        assert!(validator.is_valid(&json!("aé")));
        let messages: Vec<String> = validator
            .validate(&json!("bcde"))
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert!(messages.contains(&"must NOT have more than 3 characters".to_string()));
        assert!(messages.contains(&"must match pattern \"^a\"".to_string()));

        assert!(compile(&json!({"pattern": "("})).is_err());
        assert!(compile(&json!({"minLength": -1})).is_err());
        assert!(compile(&json!({"format": "email"})).unwrap().is_valid(&json!("not an email")));
    }

    #[test]
    fn test_collection_sizes_and_uniqueness() {
        let validator = compile(&json!({"minItems": 1, "maxItems": 2, "uniqueItems": true})).unwrap();
        assert!(validator.is_valid(&json!([1, 2])));
        assert!(!validator.is_valid(&json!([])));
        assert!(!validator.is_valid(&json!([1, 2, 3])));
        let outcome = validator.validate(&json!([1, 1.0]));
        assert_eq!(
            outcome.errors[0].message,
            "must NOT have duplicate items (items ## 1 and 0 are identical)"
        );

        let validator = compile(&json!({"minProperties": 1, "maxProperties": 1})).unwrap();
        assert!(validator.is_valid(&json!({"a": 1})));
        assert!(!validator.is_valid(&json!({})));
        assert!(!validator.is_valid(&json!({"a": 1, "b": 2})));
    }
}
