//! # Discriminator Tag Values
//!
//! A tag is the scalar value of the discriminator property. Tags are keyed by
//! `(runtime type, value)`: the string `"1"` and the number `1` are distinct
//! tags, as are `"true"` and `true`. Numbers are keyed by mathematical value,
//! so `2` and `2.0` select the same branch.
//!
//! Objects, arrays and `null` are never tags.

use std::fmt;

use serde_json::{Number, Value};

/// Hashable numeric key for a JSON number.
///
/// Integral values that fit `i64` always normalize to [`NumberTag::Int`],
/// larger non-negative integral values to [`NumberTag::UInt`], and everything
/// else to the bit pattern of the `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberTag {
    Int(i64),
    UInt(u64),
    Float(u64),
}

// 2^63 and 2^64 as exact f64 values.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

impl NumberTag {
    /// Normalize a JSON number. Returns `None` only for non-finite floats,
    /// which `serde_json` never produces from parsed input.
    pub fn from_number(n: &Number) -> Option<Self> {
        if let Some(i) = n.as_i64() {
            return Some(Self::Int(i));
        }
        if let Some(u) = n.as_u64() {
            return Some(Self::UInt(u));
        }
        let f = n.as_f64()?;
        if !f.is_finite() {
            return None;
        }
        if f.fract() == 0.0 {
            if (-I64_BOUND..I64_BOUND).contains(&f) {
                return Some(Self::Int(f as i64));
            }
            if (0.0..U64_BOUND).contains(&f) {
                return Some(Self::UInt(f as u64));
            }
        }
        Some(Self::Float(f.to_bits()))
    }

    fn to_json(self) -> Value {
        match self {
            Self::Int(i) => Value::from(i),
            Self::UInt(u) => Value::from(u),
            Self::Float(bits) => Number::from_f64(f64::from_bits(bits))
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

/// A scalar discriminator tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagValue {
    String(String),
    Number(NumberTag),
    Bool(bool),
}

impl TagValue {
    /// Interpret a JSON value as a tag. Returns `None` for objects, arrays
    /// and `null`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => NumberTag::from_number(n).map(Self::Number),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// The runtime type component of the tag key.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "boolean",
        }
    }

    /// The tag as a JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Number(n) => n.to_json(),
            Self::Bool(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
