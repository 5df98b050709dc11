//! Size and uniqueness assertions on arrays and objects.

use serde_json::Value;

use discrim_core::json_equal;

use super::{non_negative_integer, Compiled};
use crate::registry::{KeywordContext, KeywordValidator};
use crate::validator::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counted {
    Items,
    Properties,
}

#[derive(Debug)]
struct Count {
    counted: Counted,
    limit: u64,
    at_least: bool,
}

impl KeywordValidator for Count {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let (size, noun) = match (self.counted, instance) {
            (Counted::Items, Value::Array(items)) => (items.len(), "items"),
            (Counted::Properties, Value::Object(map)) => (map.len(), "properties"),
            _ => return,
        };
        let size = size as u64;
        if self.at_least && size < self.limit {
            scope.error(format!("must NOT have fewer than {} {noun}", self.limit));
        } else if !self.at_least && size > self.limit {
            scope.error(format!("must NOT have more than {} {noun}", self.limit));
        }
    }
}

/// `minItems`, `maxItems`, `minProperties` and `maxProperties`.
pub(super) fn compile_count(ctx: &KeywordContext<'_>) -> Compiled {
    let (counted, at_least) = match ctx.keyword() {
        "minItems" => (Counted::Items, true),
        "maxItems" => (Counted::Items, false),
        "minProperties" => (Counted::Properties, true),
        "maxProperties" => (Counted::Properties, false),
        _ => return Err(ctx.invalid("is not a size keyword")),
    };
    Ok(Some(Box::new(Count {
        counted,
        limit: non_negative_integer(ctx)?,
        at_least,
    })))
}

#[derive(Debug)]
struct UniqueItems;

impl KeywordValidator for UniqueItems {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Value::Array(items) = instance else {
            return;
        };
        for (j, later) in items.iter().enumerate() {
            if let Some(i) = items[..j].iter().position(|earlier| json_equal(earlier, later)) {
                scope.error(format!(
                    "must NOT have duplicate items (items ## {j} and {i} are identical)"
                ));
                return;
            }
        }
    }
}

pub(super) fn compile_unique_items(ctx: &KeywordContext<'_>) -> Compiled {
    match ctx.value() {
        Value::Bool(true) => Ok(Some(Box::new(UniqueItems))),
        Value::Bool(false) => Ok(None),
        _ => Err(ctx.invalid("must be a boolean")),
    }
}
