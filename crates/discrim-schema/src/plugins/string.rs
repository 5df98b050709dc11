//! String assertions. Non-strings pass.

use regex::Regex;
use serde_json::Value;

use super::{non_negative_integer, Compiled};
use crate::registry::{KeywordContext, KeywordValidator};
use crate::validator::Scope;

#[derive(Debug)]
struct Length {
    limit: u64,
    at_least: bool,
}

impl KeywordValidator for Length {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Value::String(text) = instance else {
            return;
        };
        // Length counts Unicode scalar values.
        let length = text.chars().count() as u64;
        if self.at_least && length < self.limit {
            scope.error(format!("must NOT have fewer than {} characters", self.limit));
        } else if !self.at_least && length > self.limit {
            scope.error(format!("must NOT have more than {} characters", self.limit));
        }
    }
}

/// `minLength` and `maxLength`.
pub(super) fn compile_length(ctx: &KeywordContext<'_>) -> Compiled {
    Ok(Some(Box::new(Length {
        limit: non_negative_integer(ctx)?,
        at_least: ctx.keyword() == "minLength",
    })))
}

#[derive(Debug)]
struct Pattern {
    regex: Regex,
}

impl KeywordValidator for Pattern {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Value::String(text) = instance else {
            return;
        };
        if !self.regex.is_match(text) {
            scope.error(format!("must match pattern \"{}\"", self.regex.as_str()));
        }
    }
}

pub(super) fn compile_pattern(ctx: &KeywordContext<'_>) -> Compiled {
    let Some(pattern) = ctx.value().as_str() else {
        return Err(ctx.invalid("must be a string"));
    };
    let regex = Regex::new(pattern)
        .map_err(|e| ctx.invalid(&format!("is not a valid regular expression: {e}")))?;
    Ok(Some(Box::new(Pattern { regex })))
}

/// `format` is an annotation; only its shape is checked.
pub(super) fn compile_format(ctx: &KeywordContext<'_>) -> Compiled {
    if !ctx.value().is_string() {
        return Err(ctx.invalid("must be a string"));
    }
    Ok(None)
}
