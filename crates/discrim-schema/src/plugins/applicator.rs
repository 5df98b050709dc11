//! Applicator keywords: plugins that evaluate subschemas.

use regex::Regex;
use serde_json::Value;

use discrim_core::SchemaError;

use super::{sibling_count, Compiled};
use crate::graph::{Children, NodeId};
use crate::registry::{KeywordContext, KeywordValidator};
use crate::validator::{PathSegment, Scope};

// ─── not / if ────────────────────────────────────────────────────────

#[derive(Debug)]
struct Not {
    schema: NodeId,
}

impl KeywordValidator for Not {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        if scope.passes(self.schema, instance, None) {
            scope.error("must NOT be valid");
        }
    }
}

pub(super) fn compile_not(ctx: &KeywordContext<'_>) -> Compiled {
    Ok(Some(Box::new(Not {
        schema: ctx.subschema()?,
    })))
}

#[derive(Debug)]
struct IfThenElse {
    condition: NodeId,
    then: Option<NodeId>,
    otherwise: Option<NodeId>,
}

impl KeywordValidator for IfThenElse {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let (keyword, branch) = if scope.passes(self.condition, instance, None) {
            ("then", self.then)
        } else {
            ("else", self.otherwise)
        };
        if let Some(branch) = branch {
            if !scope.validate_sibling(keyword, branch, instance, None) {
                scope.error(format!("must match \"{keyword}\" schema"));
            }
        }
    }
}

pub(super) fn compile_if(ctx: &KeywordContext<'_>) -> Compiled {
    let condition = ctx.subschema()?;
    let then = ctx.node().child("then");
    let otherwise = ctx.node().child("else");
    if then.is_none() && otherwise.is_none() {
        return Ok(None);
    }
    Ok(Some(Box::new(IfThenElse {
        condition,
        then,
        otherwise,
    })))
}

// ─── Arrays ──────────────────────────────────────────────────────────

/// `items` as a single schema, applied after any `prefixItems`.
#[derive(Debug)]
struct Items {
    schema: NodeId,
    skip: usize,
}

impl KeywordValidator for Items {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Value::Array(items) = instance else {
            return;
        };
        for (index, item) in items.iter().enumerate().skip(self.skip) {
            if scope.is_full() {
                return;
            }
            scope.validate(self.schema, item, Some(PathSegment::Index(index)), None);
        }
    }
}

/// `items` in tuple form, with `additionalItems` for the tail.
#[derive(Debug)]
struct TupleItems {
    schemas: Vec<NodeId>,
    additional: Option<NodeId>,
}

impl KeywordValidator for TupleItems {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Value::Array(items) = instance else {
            return;
        };
        for (index, item) in items.iter().enumerate() {
            if scope.is_full() {
                return;
            }
            let segment = Some(PathSegment::Index(index));
            match self.schemas.get(index) {
                Some(&schema) => {
                    scope.validate(schema, item, segment, segment);
                }
                None => match self.additional {
                    Some(additional) => {
                        scope.validate_sibling("additionalItems", additional, item, segment);
                    }
                    None => return,
                },
            }
        }
    }
}

pub(super) fn compile_items(ctx: &KeywordContext<'_>) -> Compiled {
    match ctx.children() {
        Some(Children::Single(schema)) => {
            let skip = ctx.node().child_list("prefixItems").map_or(0, <[NodeId]>::len);
            Ok(Some(Box::new(Items {
                schema: *schema,
                skip,
            })))
        }
        Some(Children::List(schemas)) => Ok(Some(Box::new(TupleItems {
            schemas: schemas.clone(),
            additional: ctx.node().child("additionalItems"),
        }))),
        _ => Err(ctx.invalid("must be a schema or an array of schemas")),
    }
}

#[derive(Debug)]
struct PrefixItems {
    schemas: Vec<NodeId>,
}

impl KeywordValidator for PrefixItems {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Value::Array(items) = instance else {
            return;
        };
        for (index, (item, &schema)) in items.iter().zip(&self.schemas).enumerate() {
            if scope.is_full() {
                return;
            }
            let segment = Some(PathSegment::Index(index));
            scope.validate(schema, item, segment, segment);
        }
    }
}

pub(super) fn compile_prefix_items(ctx: &KeywordContext<'_>) -> Compiled {
    Ok(Some(Box::new(PrefixItems {
        schemas: ctx.subschemas()?.to_vec(),
    })))
}

#[derive(Debug)]
struct Contains {
    schema: NodeId,
    min: u64,
    max: Option<u64>,
}

impl KeywordValidator for Contains {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Value::Array(items) = instance else {
            return;
        };
        // Past `min` only an upper bound still needs counting.
        let enough = self.max.map_or(self.min, |max| max.saturating_add(1));
        let mut found = 0u64;
        for (index, item) in items.iter().enumerate() {
            if found >= enough {
                break;
            }
            if scope.passes(self.schema, item, Some(PathSegment::Index(index))) {
                found += 1;
            }
        }
        if found < self.min {
            scope.error(format!("must contain at least {} valid item(s)", self.min));
        } else if let Some(max) = self.max.filter(|max| found > *max) {
            scope.error(format!("must contain at most {max} valid item(s)"));
        }
    }
}

/// `contains`, bounded by its `minContains`/`maxContains` siblings.
pub(super) fn compile_contains(ctx: &KeywordContext<'_>) -> Compiled {
    let min = sibling_count(ctx, "minContains")?.unwrap_or(1);
    let max = sibling_count(ctx, "maxContains")?;
    Ok(Some(Box::new(Contains {
        schema: ctx.subschema()?,
        min,
        max,
    })))
}

// ─── Objects ─────────────────────────────────────────────────────────

fn compile_regex(ctx: &KeywordContext<'_>, pattern: &str) -> Result<Regex, SchemaError> {
    Regex::new(pattern).map_err(|e| {
        SchemaError::invalid_keyword_value(
            ctx.node().location().join("patternProperties"),
            "patternProperties",
            &format!("pattern \"{pattern}\" is not a valid regular expression: {e}"),
        )
    })
}

#[derive(Debug)]
struct AdditionalProperties {
    schema: NodeId,
    /// The subschema is `false`: report the property itself.
    forbidden: bool,
    known: Vec<String>,
    patterns: Vec<Regex>,
}

impl KeywordValidator for AdditionalProperties {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Value::Object(map) = instance else {
            return;
        };
        for (name, value) in map {
            if scope.is_full() {
                return;
            }
            if self.known.iter().any(|known| known == name)
                || self.patterns.iter().any(|re| re.is_match(name))
            {
                continue;
            }
            if self.forbidden {
                scope.error(format!("must NOT have additional property '{name}'"));
            } else {
                scope.validate(self.schema, value, Some(PathSegment::Key(name)), None);
            }
        }
    }
}

pub(super) fn compile_additional_properties(ctx: &KeywordContext<'_>) -> Compiled {
    let schema = ctx.subschema()?;
    let node = ctx.node();
    let known = node
        .child_map("properties")
        .map(|entries| entries.iter().map(|(name, _)| name.clone()).collect())
        .unwrap_or_default();
    let patterns = node
        .child_map("patternProperties")
        .unwrap_or_default()
        .iter()
        .map(|(pattern, _)| compile_regex(ctx, pattern))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Box::new(AdditionalProperties {
        schema,
        forbidden: ctx.graph().node(schema).as_bool() == Some(false),
        known,
        patterns,
    })))
}

#[derive(Debug)]
struct PatternProperties {
    entries: Vec<(Regex, String, NodeId)>,
}

impl KeywordValidator for PatternProperties {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Value::Object(map) = instance else {
            return;
        };
        for (name, value) in map {
            for (regex, pattern, schema) in &self.entries {
                if scope.is_full() {
                    return;
                }
                if regex.is_match(name) {
                    scope.validate(
                        *schema,
                        value,
                        Some(PathSegment::Key(name)),
                        Some(PathSegment::Key(pattern)),
                    );
                }
            }
        }
    }
}

pub(super) fn compile_pattern_properties(ctx: &KeywordContext<'_>) -> Compiled {
    let entries = ctx
        .subschema_map()?
        .iter()
        .map(|(pattern, schema)| Ok((compile_regex(ctx, pattern)?, pattern.clone(), *schema)))
        .collect::<Result<Vec<_>, SchemaError>>()?;
    Ok(Some(Box::new(PatternProperties { entries })))
}

#[derive(Debug)]
struct PropertyNames {
    schema: NodeId,
}

impl KeywordValidator for PropertyNames {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Value::Object(map) = instance else {
            return;
        };
        for name in map.keys() {
            if scope.is_full() {
                return;
            }
            let key = Value::String(name.clone());
            scope.validate(self.schema, &key, Some(PathSegment::Key(name)), None);
        }
    }
}

pub(super) fn compile_property_names(ctx: &KeywordContext<'_>) -> Compiled {
    Ok(Some(Box::new(PropertyNames {
        schema: ctx.subschema()?,
    })))
}

#[derive(Debug)]
struct DependentSchemas {
    entries: Vec<(String, NodeId)>,
}

impl KeywordValidator for DependentSchemas {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Value::Object(map) = instance else {
            return;
        };
        for (property, schema) in &self.entries {
            if scope.is_full() {
                return;
            }
            if map.contains_key(property) {
                scope.validate(*schema, instance, None, Some(PathSegment::Key(property)));
            }
        }
    }
}

pub(super) fn compile_dependent_schemas(ctx: &KeywordContext<'_>) -> Compiled {
    Ok(Some(Box::new(DependentSchemas {
        entries: ctx.subschema_map()?.to_vec(),
    })))
}
