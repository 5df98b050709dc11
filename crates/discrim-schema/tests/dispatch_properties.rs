//! Property tests for discriminated `oneOf` dispatch.
//!
//! Dispatch is checked against `jsonschema` evaluating the selected branch
//! on its own, and branch invocations are counted through a plugin keyword.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use discrim_schema::{
    compile, CompileOptions, KeywordContext, KeywordRegistry, KeywordValidator, SchemaError,
    SchemaErrorKind, Scope, TagValue, ValidationCompiler,
};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn branches() -> Vec<Value> {
    vec![
        json!({
            "properties": {"kind": {"const": "alpha"}, "a": {"type": "string"}},
            "required": ["a"]
        }),
        json!({
            "properties": {"kind": {"enum": [1, 2]}, "n": {"type": "integer", "minimum": 0}},
            "required": ["n"]
        }),
        json!({
            "properties": {"kind": {"const": true}, "a": {"type": "integer"}}
        }),
    ]
}

fn union(branches: Vec<Value>) -> Value {
    json!({
        "type": "object",
        "discriminator": {"propertyName": "kind"},
        "required": ["kind"],
        "oneOf": branches
    })
}

/// Index of the branch a tag selects, if any.
fn branch_for(tag: &Value) -> Option<usize> {
    match tag {
        Value::String(s) if s == "alpha" => Some(0),
        Value::Number(n) if n.as_i64() == Some(1) || n.as_i64() == Some(2) => Some(1),
        Value::Bool(true) => Some(2),
        _ => None,
    }
}

fn tag_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!("alpha")),
        Just(json!(1)),
        Just(json!(2)),
        Just(json!(true)),
        Just(json!("beta")),
        Just(json!("1")),
        Just(json!("true")),
        Just(json!(3)),
        Just(json!(false)),
    ]
}

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::from),
        "[a-z]{0,4}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        Just(Value::Null),
    ]
}

fn instance_strategy() -> impl Strategy<Value = Value> {
    (
        tag_strategy(),
        proptest::option::of(scalar_strategy()),
        proptest::option::of(-5i64..5),
    )
        .prop_map(|(kind, a, n)| {
            let mut map = Map::new();
            map.insert("kind".to_string(), kind);
            if let Some(a) = a {
                map.insert("a".to_string(), a);
            }
            if let Some(n) = n {
                map.insert("n".to_string(), Value::from(n));
            }
            Value::Object(map)
        })
}

fn unique_tag_list() -> impl Strategy<Value = Vec<Value>> {
    proptest::collection::vec(
        prop_oneof![
            Just(json!("1")),
            Just(json!(1)),
            Just(json!(1.0)),
            Just(json!("true")),
            Just(json!(true)),
            Just(json!(false)),
            Just(json!("a")),
            Just(json!(2.5)),
        ],
        1..6,
    )
}

#[derive(Debug)]
struct Counter {
    calls: Arc<AtomicUsize>,
}

impl KeywordValidator for Counter {
    fn validate(&self, _instance: &Value, _scope: &mut Scope<'_>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// A compiler whose `x-count` keyword counts how often its node is entered.
fn counting_compiler(discriminator: bool) -> (ValidationCompiler, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = KeywordRegistry::default();
    registry.register(
        "x-count",
        move |_ctx: &KeywordContext<'_>| -> Result<Option<Box<dyn KeywordValidator>>, SchemaError> {
            Ok(Some(Box::new(Counter {
                calls: Arc::clone(&counter),
            })))
        },
    );
    let options = CompileOptions::default().discriminator(discriminator);
    (ValidationCompiler::with_registry(registry, options), calls)
}

fn counted_union() -> Value {
    let counted = branches()
        .into_iter()
        .map(|mut branch| {
            if let Value::Object(map) = &mut branch {
                map.insert("x-count".to_string(), Value::Bool(true));
            }
            branch
        })
        .collect();
    union(counted)
}

proptest! {
    /// A known tag evaluates exactly its branch: validity agrees with the
    /// branch alone, and errors are the branch's own, relocated under
    /// `oneOf`.
    #[test]
    fn dispatch_matches_selected_branch(instance in instance_strategy()) {
        let validator = compile(&union(branches())).unwrap();
        let outcome = validator.validate(&instance);

        if let Some(index) = branch_for(&instance["kind"]) {
            let all = branches();
            let branch = &all[index];
            prop_assert_eq!(outcome.valid, jsonschema::is_valid(branch, &instance));

            let alone = compile(branch).unwrap().validate(&instance);
            let expected: Vec<(String, String, String)> = alone
                .errors
                .iter()
                .map(|e| {
                    (
                        e.instance_location.to_string(),
                        format!("/oneOf/{index}{}", e.schema_location),
                        e.message.clone(),
                    )
                })
                .collect();
            let actual: Vec<(String, String, String)> = outcome
                .errors
                .iter()
                .map(|e| {
                    (
                        e.instance_location.to_string(),
                        e.schema_location.to_string(),
                        e.message.clone(),
                    )
                })
                .collect();
            prop_assert_eq!(actual, expected);
        } else {
            prop_assert!(!outcome.valid);
            prop_assert_eq!(outcome.errors.len(), 1);
            prop_assert_eq!(outcome.errors[0].instance_location.to_string(), "/kind");
            prop_assert_eq!(outcome.errors[0].schema_location.to_string(), "/discriminator");
        }
    }

    /// Unknown tags fail closed without entering any branch; known tags
    /// enter exactly one.
    #[test]
    fn dispatch_enters_at_most_one_branch(instance in instance_strategy()) {
        let (compiler, calls) = counting_compiler(true);
        let validator = compiler.compile_document(&counted_union()).unwrap();
        let outcome = validator.validate(&instance);

        match branch_for(&instance["kind"]) {
            Some(_) => prop_assert_eq!(calls.load(Ordering::SeqCst), 1),
            None => {
                prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
                prop_assert_eq!(outcome.errors.len(), 1);
            }
        }
    }

    /// Discriminated and exhaustive `oneOf` agree on validity.
    #[test]
    fn dispatch_agrees_with_exhaustive_one_of(instance in instance_strategy()) {
        let schema = union(branches());
        let fast = compile(&schema).unwrap();
        let slow = ValidationCompiler::new(CompileOptions::default().discriminator(false))
            .compile_document(&schema)
            .unwrap();
        prop_assert_eq!(fast.is_valid(&instance), slow.is_valid(&instance));
        prop_assert_eq!(slow.is_valid(&instance), jsonschema::is_valid(&schema, &instance));
    }

    /// Compilation succeeds exactly when tags are unique by type and value,
    /// and a collision is reported at the first repeating branch.
    #[test]
    fn tag_uniqueness_is_typed(tags in unique_tag_list()) {
        let branch_list: Vec<Value> = tags
            .iter()
            .map(|tag| json!({"properties": {"t": {"const": tag}}}))
            .collect();
        let schema = json!({
            "type": "object",
            "discriminator": {"propertyName": "t"},
            "required": ["t"],
            "oneOf": branch_list
        });

        let mut seen = HashSet::new();
        let first_repeat = tags
            .iter()
            .position(|tag| !seen.insert(TagValue::from_json(tag).unwrap()));

        match (compile(&schema), first_repeat) {
            (Ok(_), None) => {}
            (Err(err), Some(index)) => {
                prop_assert_eq!(err.kind, SchemaErrorKind::DuplicateTagValue);
                prop_assert_eq!(err.location.pointer.to_string(), format!("/oneOf/{index}"));
            }
            (result, expected) => {
                prop_assert!(false, "unexpected {:?} for first repeat {:?}", result.err(), expected);
            }
        }
    }
}

#[test]
fn test_exhaustive_one_of_enters_every_branch() {
    let (compiler, calls) = counting_compiler(false);
    let validator = compiler.compile_document(&counted_union()).unwrap();
    validator.validate(&json!({"kind": "alpha", "a": "x"}));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_only_dispatched_branches_are_entered() {
    let (compiler, calls) = counting_compiler(true);
    let validator = compiler.compile_document(&counted_union()).unwrap();
    for instance in [
        json!({"kind": "alpha", "a": "x"}),
        json!({"kind": 2, "n": 1}),
        json!({"kind": "nope"}),
        json!({"a": 1}),
    ] {
        validator.validate(&instance);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
