//! Compile options.
//!
//! Defaults are permissive: unknown keywords are ignored, every error is
//! collected and `discriminator` is honoured. Override via environment
//! variables, a YAML/JSON document, or the builder methods.

use serde::{Deserialize, Serialize};

/// Default bound on nested schema evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Options controlling how a schema is compiled and how the resulting
/// validator reports errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    /// Reject keywords with no registered compiler instead of ignoring them.
    pub strict_keywords: bool,
    /// Stop collecting after the first validation error.
    pub fail_fast: bool,
    /// Honour `discriminator`. When off it is an annotation and `oneOf` is
    /// evaluated exhaustively.
    pub discriminator: bool,
    /// Maximum nesting of schema evaluation at a single instance location
    /// before a validation error is reported instead of recursing further.
    /// Descending into a property or item starts the count again, so deep
    /// instances of a recursive schema are bounded by the instance itself.
    pub max_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            strict_keywords: false,
            fail_fast: false,
            discriminator: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CompileOptions {
    /// Load options from environment variables.
    ///
    /// Variables (all optional):
    /// - `DISCRIM_STRICT_KEYWORDS` (default: `false`)
    /// - `DISCRIM_FAIL_FAST` (default: `false`)
    /// - `DISCRIM_DISCRIMINATOR` (default: `true`)
    /// - `DISCRIM_MAX_DEPTH` (default: 256)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load options from an arbitrary variable source.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_depth = match lookup("DISCRIM_MAX_DEPTH") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::InvalidValue("DISCRIM_MAX_DEPTH".to_string(), raw))
                }
                Ok(depth) => depth,
            },
            None => defaults.max_depth,
        };
        Ok(Self {
            strict_keywords: env_flag(&lookup, "DISCRIM_STRICT_KEYWORDS", defaults.strict_keywords)?,
            fail_fast: env_flag(&lookup, "DISCRIM_FAIL_FAST", defaults.fail_fast)?,
            discriminator: env_flag(&lookup, "DISCRIM_DISCRIMINATOR", defaults.discriminator)?,
            max_depth,
        })
    }

    /// Parse options from YAML (or JSON, which is valid YAML). Missing
    /// fields take their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Deserialize options from a JSON value.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn strict_keywords(mut self, strict: bool) -> Self {
        self.strict_keywords = strict;
        self
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn discriminator(mut self, enabled: bool) -> Self {
        self.discriminator = enabled;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }
}

fn env_flag<F>(lookup: &F, var: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(var.to_string(), raw)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
    #[error("invalid compile options: {0}")]
    Parse(String),
}
