//! Numeric assertions. Non-numbers pass.

use serde_json::Value;

use super::{number, Compiled};
use crate::registry::{KeywordContext, KeywordValidator};
use crate::validator::Scope;

#[derive(Debug, Clone, Copy)]
enum Comparison {
    AtLeast,
    AtMost,
    Above,
    Below,
}

impl Comparison {
    fn holds(self, value: f64, limit: f64) -> bool {
        match self {
            Self::AtLeast => value >= limit,
            Self::AtMost => value <= limit,
            Self::Above => value > limit,
            Self::Below => value < limit,
        }
    }

    fn operator(self) -> &'static str {
        match self {
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
            Self::Above => ">",
            Self::Below => "<",
        }
    }
}

#[derive(Debug)]
struct Bound {
    comparison: Comparison,
    limit: f64,
    /// The limit as written, for messages.
    display: String,
}

impl KeywordValidator for Bound {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Some(value) = instance.as_f64() else {
            return;
        };
        if !self.comparison.holds(value, self.limit) {
            scope.error(format!("must be {} {}", self.comparison.operator(), self.display));
        }
    }
}

/// `minimum`, `maximum`, `exclusiveMinimum` and `exclusiveMaximum`.
pub(super) fn compile_bound(ctx: &KeywordContext<'_>) -> Compiled {
    let comparison = match ctx.keyword() {
        "minimum" => Comparison::AtLeast,
        "maximum" => Comparison::AtMost,
        "exclusiveMinimum" => Comparison::Above,
        "exclusiveMaximum" => Comparison::Below,
        _ => return Err(ctx.invalid("is not a numeric bound")),
    };
    Ok(Some(Box::new(Bound {
        comparison,
        limit: number(ctx)?,
        display: ctx.value().to_string(),
    })))
}

#[derive(Debug)]
struct MultipleOf {
    divisor: f64,
    integer_divisor: Option<i64>,
    display: String,
}

impl MultipleOf {
    fn divides(&self, value: &serde_json::Number) -> bool {
        if let (Some(divisor), Some(n)) = (self.integer_divisor, value.as_i64()) {
            return n % divisor == 0;
        }
        let Some(x) = value.as_f64() else {
            return false;
        };
        let quotient = x / self.divisor;
        quotient.is_finite() && (quotient - quotient.round()).abs() <= quotient.abs().max(1.0) * f64::EPSILON * 4.0
    }
}

impl KeywordValidator for MultipleOf {
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>) {
        let Value::Number(n) = instance else {
            return;
        };
        if !self.divides(n) {
            scope.error(format!("must be multiple of {}", self.display));
        }
    }
}

pub(super) fn compile_multiple_of(ctx: &KeywordContext<'_>) -> Compiled {
    let divisor = number(ctx)?;
    if divisor <= 0.0 {
        return Err(ctx.invalid("must be greater than 0"));
    }
    Ok(Some(Box::new(MultipleOf {
        divisor,
        integer_divisor: ctx.value().as_i64(),
        display: ctx.value().to_string(),
    })))
}
