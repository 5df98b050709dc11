//! # Validator
//!
//! The run-time artifact produced by the
//! [`ValidationCompiler`](crate::compiler::ValidationCompiler).
//!
//! ## Design
//!
//! A compiled program is a flat arena of [`CompiledNode`]s indexed by the
//! same [`NodeId`]s as the schema graph, so `$ref` stays an index lookup at
//! run time and recursive schemas need no special handling. The program is
//! immutable and shared behind an `Arc`; a [`Validator`] is `Send + Sync`
//! and cheap to clone.
//!
//! Each `validate` call owns an [`ErrorCollector`]. Rules append to it
//! explicitly; nothing unwinds. A rule's verdict is whether it appended
//! anything. Combinators (`anyOf`, exhaustive `oneOf`, `not`) evaluate
//! branches into scratch collectors and merge what they keep.
//!
//! Instance and schema paths are built lazily as borrowed linked lists and
//! only materialized into [`JsonPointer`]s when an error is recorded, so a
//! nested error is already located under every parent segment when it is
//! merged upward.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use discrim_core::{
    json_equal, InstanceType, JsonPointer, SchemaLocation, TagValue, ValidationError,
    ValidationErrors,
};

use crate::discriminator::DiscriminatorSpec;
use crate::graph::NodeId;
use crate::registry::KeywordValidator;

// ─── Paths ───────────────────────────────────────────────────────────

/// One step of an instance or schema path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    Key(&'a str),
    Index(usize),
}

impl From<PathSegment<'_>> for String {
    fn from(segment: PathSegment<'_>) -> Self {
        match segment {
            PathSegment::Key(key) => key.to_string(),
            PathSegment::Index(index) => index.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum LazyPath<'a> {
    Root,
    Child(&'a LazyPath<'a>, PathSegment<'a>),
}

impl<'a> LazyPath<'a> {
    fn child(&'a self, segment: PathSegment<'a>) -> LazyPath<'a> {
        LazyPath::Child(self, segment)
    }

    fn to_pointer(self) -> JsonPointer {
        let mut segments = Vec::new();
        let mut current = self;
        while let LazyPath::Child(parent, segment) = current {
            segments.push(segment);
            current = *parent;
        }
        segments.reverse();
        JsonPointer::from_segments(segments)
    }
}

// ─── Error collection ────────────────────────────────────────────────

/// Accumulates the errors of one validation call.
///
/// In fail-fast mode the collector is full after its first error and
/// silently drops anything pushed afterwards.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<ValidationError>,
    fail_fast: bool,
}

impl ErrorCollector {
    pub fn new(fail_fast: bool) -> Self {
        Self {
            errors: Vec::new(),
            fail_fast,
        }
    }

    pub fn push(&mut self, error: ValidationError) {
        if !self.is_full() {
            self.errors.push(error);
        }
    }

    /// Move every error of `other` into this collector.
    pub fn absorb(&mut self, other: ErrorCollector) {
        for error in other.errors {
            self.push(error);
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether further errors would be dropped.
    pub fn is_full(&self) -> bool {
        self.fail_fast && !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    fn scratch(&self) -> Self {
        Self::new(self.fail_fast)
    }
}

// ─── Compiled program ────────────────────────────────────────────────

/// A compiled keyword.
pub(crate) enum Rule {
    /// The `false` schema.
    Never,
    Type(Vec<InstanceType>),
    Const(Value),
    Enum(Vec<Value>),
    Required(Vec<String>),
    Properties(Vec<(String, NodeId)>),
    Ref(NodeId),
    AllOf(Vec<NodeId>),
    AnyOf(Vec<NodeId>),
    /// Exhaustive `oneOf`.
    OneOf(Vec<NodeId>),
    /// `oneOf` dispatched through a discriminator.
    Discriminated {
        spec: Arc<DiscriminatorSpec>,
        branches: Vec<NodeId>,
        /// The node declares exactly `type: object`, which already reports
        /// non-object instances.
        type_checked: bool,
    },
    Plugin(Box<dyn KeywordValidator>),
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("Never"),
            Self::Type(types) => f.debug_tuple("Type").field(types).finish(),
            Self::Const(value) => f.debug_tuple("Const").field(value).finish(),
            Self::Enum(values) => f.debug_tuple("Enum").field(values).finish(),
            Self::Required(names) => f.debug_tuple("Required").field(names).finish(),
            Self::Properties(entries) => f.debug_tuple("Properties").field(entries).finish(),
            Self::Ref(target) => f.debug_tuple("Ref").field(target).finish(),
            Self::AllOf(ids) => f.debug_tuple("AllOf").field(ids).finish(),
            Self::AnyOf(ids) => f.debug_tuple("AnyOf").field(ids).finish(),
            Self::OneOf(ids) => f.debug_tuple("OneOf").field(ids).finish(),
            Self::Discriminated { spec, branches, .. } => f
                .debug_struct("Discriminated")
                .field("property", &spec.property())
                .field("branches", branches)
                .finish(),
            Self::Plugin(validator) => f.debug_tuple("Plugin").field(validator).finish(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct CompiledKeyword {
    pub(crate) name: String,
    pub(crate) rule: Rule,
}

#[derive(Debug)]
pub(crate) struct CompiledNode {
    pub(crate) location: SchemaLocation,
    pub(crate) keywords: Vec<CompiledKeyword>,
}

impl CompiledNode {
    /// A node never reached from the root (e.g. an unreferenced definition).
    pub(crate) fn inert(location: SchemaLocation) -> Self {
        Self {
            location,
            keywords: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Program {
    pub(crate) nodes: Vec<CompiledNode>,
    pub(crate) root: NodeId,
    pub(crate) fail_fast: bool,
    pub(crate) max_depth: usize,
}

/// Where an evaluation currently is.
#[derive(Clone, Copy)]
struct Frame<'a> {
    instance_path: &'a LazyPath<'a>,
    schema_path: &'a LazyPath<'a>,
    /// Schema hops taken since the instance location last changed.
    depth: usize,
}

impl Program {
    fn validate_node(&self, id: NodeId, instance: &Value, frame: Frame<'_>, out: &mut ErrorCollector) {
        if frame.depth > self.max_depth {
            out.push(ValidationError {
                instance_location: frame.instance_path.to_pointer(),
                schema_location: frame.schema_path.to_pointer(),
                keyword: "$ref".to_string(),
                message: format!("maximum evaluation depth ({}) exceeded", self.max_depth),
            });
            return;
        }
        let Some(node) = self.nodes.get(id.index()) else {
            return;
        };
        for keyword in &node.keywords {
            if out.is_full() {
                return;
            }
            self.apply(keyword, instance, frame, out);
        }
    }

    fn apply(&self, keyword: &CompiledKeyword, instance: &Value, frame: Frame<'_>, out: &mut ErrorCollector) {
        let keyword_path = frame.schema_path.child(PathSegment::Key(&keyword.name));
        let error = |out: &mut ErrorCollector, message: String| {
            out.push(ValidationError {
                instance_location: frame.instance_path.to_pointer(),
                schema_location: keyword_path.to_pointer(),
                keyword: keyword.name.clone(),
                message,
            });
        };
        let nested = |schema_path: &LazyPath<'_>, out: &mut ErrorCollector, id: NodeId, value: &Value| {
            self.validate_node(
                id,
                value,
                Frame {
                    instance_path: frame.instance_path,
                    schema_path,
                    depth: frame.depth + 1,
                },
                out,
            );
        };

        match &keyword.rule {
            Rule::Never => out.push(ValidationError {
                instance_location: frame.instance_path.to_pointer(),
                schema_location: frame.schema_path.to_pointer(),
                keyword: keyword.name.clone(),
                message: "boolean schema is false".to_string(),
            }),
            Rule::Type(types) => {
                if !types.iter().any(|ty| ty.matches(instance)) {
                    let names: Vec<&str> = types.iter().map(|ty| ty.as_str()).collect();
                    error(out, format!("must be {}", names.join(",")));
                }
            }
            Rule::Const(expected) => {
                if !json_equal(instance, expected) {
                    error(out, "must be equal to constant".to_string());
                }
            }
            Rule::Enum(allowed) => {
                if !allowed.iter().any(|candidate| json_equal(instance, candidate)) {
                    error(out, "must be equal to one of the allowed values".to_string());
                }
            }
            Rule::Required(names) => {
                if let Value::Object(map) = instance {
                    for name in names {
                        if !map.contains_key(name) {
                            error(out, format!("must have required property '{name}'"));
                        }
                    }
                }
            }
            Rule::Properties(entries) => {
                if let Value::Object(map) = instance {
                    for (name, id) in entries {
                        if out.is_full() {
                            return;
                        }
                        if let Some(value) = map.get(name) {
                            let instance_path = frame.instance_path.child(PathSegment::Key(name));
                            let schema_path = keyword_path.child(PathSegment::Key(name));
                            self.validate_node(
                                *id,
                                value,
                                Frame {
                                    instance_path: &instance_path,
                                    schema_path: &schema_path,
                                    depth: 0,
                                },
                                out,
                            );
                        }
                    }
                }
            }
            Rule::Ref(target) => nested(&keyword_path, out, *target, instance),
            Rule::AllOf(ids) => {
                for (index, id) in ids.iter().enumerate() {
                    if out.is_full() {
                        return;
                    }
                    let schema_path = keyword_path.child(PathSegment::Index(index));
                    nested(&schema_path, out, *id, instance);
                }
            }
            Rule::AnyOf(ids) => {
                let mut failures = Vec::with_capacity(ids.len());
                for (index, id) in ids.iter().enumerate() {
                    let mut scratch = out.scratch();
                    let schema_path = keyword_path.child(PathSegment::Index(index));
                    nested(&schema_path, &mut scratch, *id, instance);
                    if scratch.is_empty() {
                        return;
                    }
                    failures.push(scratch);
                }
                for scratch in failures {
                    out.absorb(scratch);
                }
                error(out, "must match a schema in anyOf".to_string());
            }
            Rule::OneOf(ids) => {
                let mut failures = Vec::with_capacity(ids.len());
                let mut matched = 0usize;
                for (index, id) in ids.iter().enumerate() {
                    let mut scratch = out.scratch();
                    let schema_path = keyword_path.child(PathSegment::Index(index));
                    nested(&schema_path, &mut scratch, *id, instance);
                    if scratch.is_empty() {
                        matched += 1;
                    } else {
                        failures.push(scratch);
                    }
                }
                if matched == 1 {
                    return;
                }
                if matched == 0 {
                    for scratch in failures {
                        out.absorb(scratch);
                    }
                }
                error(
                    out,
                    format!("must match exactly one schema in oneOf (matched {matched})"),
                );
            }
            Rule::Discriminated {
                spec,
                branches,
                type_checked,
            } => self.dispatch(spec, branches, *type_checked, instance, frame, &keyword_path, out),
            Rule::Plugin(validator) => {
                let mut scope = Scope {
                    program: self,
                    instance_path: frame.instance_path,
                    node_path: frame.schema_path,
                    keyword: &keyword.name,
                    depth: frame.depth,
                    collector: out,
                };
                validator.validate(instance, &mut scope);
            }
        }
    }

    /// Select the branch for the instance's tag and evaluate only that one.
    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &self,
        spec: &DiscriminatorSpec,
        branches: &[NodeId],
        type_checked: bool,
        instance: &Value,
        frame: Frame<'_>,
        one_of_path: &LazyPath<'_>,
        out: &mut ErrorCollector,
    ) {
        let property = spec.property();
        let discriminator_path = frame.schema_path.child(PathSegment::Key("discriminator"));
        let tag_path = frame.instance_path.child(PathSegment::Key(property));
        let fail = |out: &mut ErrorCollector, instance_path: &LazyPath<'_>, message: String| {
            out.push(ValidationError {
                instance_location: instance_path.to_pointer(),
                schema_location: discriminator_path.to_pointer(),
                keyword: "discriminator".to_string(),
                message,
            });
        };

        let Value::Object(map) = instance else {
            if !type_checked {
                fail(out, frame.instance_path, "must be object".to_string());
            }
            return;
        };
        let Some(raw_tag) = map.get(property) else {
            fail(out, frame.instance_path, format!("tag \"{property}\" must be present"));
            return;
        };
        let Some(tag) = TagValue::from_json(raw_tag) else {
            fail(
                out,
                &tag_path,
                format!("tag \"{property}\" must be string, number or boolean"),
            );
            return;
        };
        let Some(index) = spec.branch_for(&tag) else {
            fail(out, &tag_path, format!("value of tag \"{property}\" must be in oneOf"));
            return;
        };
        let Some(branch) = branches.get(index) else {
            return;
        };

        tracing::trace!(property, tag = %tag, branch = index, "discriminator dispatch");
        let schema_path = one_of_path.child(PathSegment::Index(index));
        self.validate_node(
            *branch,
            instance,
            Frame {
                instance_path: frame.instance_path,
                schema_path: &schema_path,
                depth: frame.depth + 1,
            },
            out,
        );
    }
}

// ─── Plugin scope ────────────────────────────────────────────────────

/// A plugin's view of the evaluation in progress.
///
/// Errors reported through the scope are located at the current instance
/// and at the plugin's keyword in the evaluation path.
pub struct Scope<'a> {
    program: &'a Program,
    instance_path: &'a LazyPath<'a>,
    node_path: &'a LazyPath<'a>,
    keyword: &'a str,
    depth: usize,
    collector: &'a mut ErrorCollector,
}

impl Scope<'_> {
    /// The keyword being evaluated.
    pub fn keyword(&self) -> &str {
        self.keyword
    }

    /// Pointer to the instance being evaluated.
    pub fn instance_location(&self) -> JsonPointer {
        self.instance_path.to_pointer()
    }

    /// Whether further errors would be dropped; long loops should stop.
    pub fn is_full(&self) -> bool {
        self.collector.is_full()
    }

    /// Record a violation of this keyword.
    pub fn error(&mut self, message: impl Into<String>) {
        let keyword_path = self.node_path.child(PathSegment::Key(self.keyword));
        self.collector.push(ValidationError {
            instance_location: self.instance_path.to_pointer(),
            schema_location: keyword_path.to_pointer(),
            keyword: self.keyword.to_string(),
            message: message.into(),
        });
    }

    /// Validate `instance` against child `node` of this keyword, recording
    /// its errors. `instance_segment` locates the value relative to the
    /// current instance, `schema_segment` the child relative to the keyword.
    /// Returns whether the child passed.
    pub fn validate(
        &mut self,
        node: NodeId,
        instance: &Value,
        instance_segment: Option<PathSegment<'_>>,
        schema_segment: Option<PathSegment<'_>>,
    ) -> bool {
        let before = self.collector.len();
        let keyword = self.keyword;
        Self::run(
            self.program,
            self.instance_path,
            self.node_path,
            keyword,
            self.depth,
            node,
            instance,
            instance_segment,
            schema_segment,
            self.collector,
        );
        self.collector.len() == before
    }

    /// Validate against the child of a sibling keyword (`then`, `else`,
    /// `additionalItems`), recording its errors under that keyword's path.
    pub fn validate_sibling(
        &mut self,
        keyword: &str,
        node: NodeId,
        instance: &Value,
        instance_segment: Option<PathSegment<'_>>,
    ) -> bool {
        let before = self.collector.len();
        Self::run(
            self.program,
            self.instance_path,
            self.node_path,
            keyword,
            self.depth,
            node,
            instance,
            instance_segment,
            None,
            self.collector,
        );
        self.collector.len() == before
    }

    /// Whether `instance` passes child `node`, without recording anything.
    pub fn passes(&self, node: NodeId, instance: &Value, instance_segment: Option<PathSegment<'_>>) -> bool {
        let mut scratch = ErrorCollector::new(true);
        Self::run(
            self.program,
            self.instance_path,
            self.node_path,
            self.keyword,
            self.depth,
            node,
            instance,
            instance_segment,
            None,
            &mut scratch,
        );
        scratch.is_empty()
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        program: &Program,
        instance_path: &LazyPath<'_>,
        node_path: &LazyPath<'_>,
        keyword: &str,
        depth: usize,
        node: NodeId,
        instance: &Value,
        instance_segment: Option<PathSegment<'_>>,
        schema_segment: Option<PathSegment<'_>>,
        out: &mut ErrorCollector,
    ) {
        let keyword_path = node_path.child(PathSegment::Key(keyword));
        let child_schema;
        let schema_path = match schema_segment {
            Some(segment) => {
                child_schema = keyword_path.child(segment);
                &child_schema
            }
            None => &keyword_path,
        };
        let child_instance;
        let (instance_path, depth) = match instance_segment {
            Some(segment) => {
                child_instance = instance_path.child(segment);
                (&child_instance, 0)
            }
            None => (instance_path, depth + 1),
        };
        program.validate_node(
            node,
            instance,
            Frame {
                instance_path,
                schema_path,
                depth,
            },
            out,
        );
    }
}

// ─── Public artifact ─────────────────────────────────────────────────

/// Result of one validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// `Ok(())` when valid, otherwise every error as one `Error` value.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.valid {
            Ok(())
        } else {
            Err(ValidationErrors(self.errors))
        }
    }
}

/// A compiled schema. Immutable, `Send + Sync`, cheap to clone.
#[derive(Clone)]
pub struct Validator {
    program: Arc<Program>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("root", &self.root_location())
            .field("nodes", &self.program.nodes.len())
            .field("fail_fast", &self.program.fail_fast)
            .field("max_depth", &self.program.max_depth)
            .finish()
    }
}

impl Validator {
    pub(crate) fn new(program: Program) -> Self {
        Self {
            program: Arc::new(program),
        }
    }

    /// Validate `instance`, collecting every error (or the first one in
    /// fail-fast mode).
    pub fn validate(&self, instance: &Value) -> ValidationOutcome {
        let mut collector = ErrorCollector::new(self.program.fail_fast);
        self.run(instance, &mut collector);
        let errors = collector.into_errors();
        ValidationOutcome {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Whether `instance` is valid. Stops at the first error.
    pub fn is_valid(&self, instance: &Value) -> bool {
        let mut collector = ErrorCollector::new(true);
        self.run(instance, &mut collector);
        collector.is_empty()
    }

    /// Location of the compiled root schema.
    pub fn root_location(&self) -> Option<&SchemaLocation> {
        self.program
            .nodes
            .get(self.program.root.index())
            .map(|node| &node.location)
    }

    fn run(&self, instance: &Value, collector: &mut ErrorCollector) {
        let root = LazyPath::Root;
        self.program.validate_node(
            self.program.root,
            instance,
            Frame {
                instance_path: &root,
                schema_path: &root,
                depth: 0,
            },
            collector,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_error(keyword: &str) -> ValidationError {
        ValidationError {
            instance_location: JsonPointer::root(),
            schema_location: JsonPointer::from_segments([keyword]),
            keyword: keyword.to_string(),
            message: "x".to_string(),
        }
    }

    #[test]
    fn test_lazy_path_materializes_in_order() {
        let root = LazyPath::Root;
        let a = root.child(PathSegment::Key("a"));
        let b = a.child(PathSegment::Index(3));
        let c = b.child(PathSegment::Key("c/d"));
        assert_eq!(c.to_pointer().to_string(), "/a/3/c~1d");
        assert!(root.to_pointer().is_root());
    }

    #[test]
    fn test_fail_fast_collector_keeps_first_error() {
        let mut collector = ErrorCollector::new(true);
        collector.push(sample_error("type"));
        assert!(collector.is_full());
        collector.push(sample_error("required"));
        assert_eq!(collector.len(), 1);
        assert_eq!(collector.errors()[0].keyword, "type");
    }

    #[test]
    fn test_collector_absorbs_scratch() {
        let mut collector = ErrorCollector::new(false);
        let mut scratch = collector.scratch();
        scratch.push(sample_error("a"));
        scratch.push(sample_error("b"));
        collector.absorb(scratch);
        assert_eq!(collector.len(), 2);
        assert!(!collector.is_full());
    }

    #[test]
    fn test_depth_resets_when_plugin_descends_into_items() {
        let schema = serde_json::json!({
            "$defs": {
                "List": {"allOf": [{"$ref": "#/$defs/Items"}]},
                "Items": {"type": "array", "items": {"$ref": "#/$defs/List"}}
            },
            "$ref": "#/$defs/List"
        });
        let validator =
            crate::compile_with(&schema, crate::CompileOptions::default().max_depth(4)).unwrap();
        let mut nested = serde_json::json!([]);
        for _ in 0..50 {
            nested = serde_json::json!([nested]);
        }
        assert!(validator.is_valid(&nested));
        assert!(!validator.is_valid(&serde_json::json!([[["x"]]])));
    }

    #[test]
    fn test_outcome_into_result() {
        let ok = ValidationOutcome {
            valid: true,
            errors: vec![],
        };
        assert!(ok.into_result().is_ok());
        let failed = ValidationOutcome {
            valid: false,
            errors: vec![sample_error("type")],
        };
        let err = failed.into_result().unwrap_err();
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn test_validator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Validator>();
    }
}
