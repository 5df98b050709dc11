//! # discrim-schema — Discriminator-Aware Schema Compiler
//!
//! Compiles JSON Schema documents into validators, with first-class
//! support for the `discriminator` keyword: a `oneOf` whose branches are
//! tagged by the value of one property is checked statically at compile
//! time and dispatched in constant time at run time, evaluating exactly
//! one branch.
//!
//! ## Pipeline
//!
//! ```text
//! SchemaStore → SchemaGraph → DiscriminatorAnalyzer → ValidationCompiler → Validator
//! ```
//!
//! - [`store`] holds root documents by base URI and answers pointer lookups.
//! - [`graph`] resolves every `$ref` into an arena of nodes; recursive
//!   schemas become cycles, dangling references fail.
//! - [`discriminator`] verifies tagged unions and builds dispatch tables.
//! - [`compiler`] walks the graph and produces a [`Validator`], delegating
//!   non-core keywords to the [`registry`].
//! - [`validator`] runs the compiled program and collects
//!   [`ValidationError`]s.
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//!
//! let validator = discrim_schema::compile(&json!({
//!     "type": "object",
//!     "discriminator": {"propertyName": "kind"},
//!     "required": ["kind"],
//!     "oneOf": [
//!         {"properties": {"kind": {"const": "circle"}, "r": {"type": "number"}}, "required": ["r"]},
//!         {"properties": {"kind": {"const": "square"}, "side": {"type": "number"}}, "required": ["side"]}
//!     ]
//! }))
//! .unwrap();
//!
//! assert!(validator.is_valid(&json!({"kind": "circle", "r": 1.5})));
//! let outcome = validator.validate(&json!({"kind": "hexagon"}));
//! assert_eq!(outcome.errors.len(), 1);
//! ```
//!
//! ## Crate Policy
//!
//! - Depends only on `discrim-core` internally.
//! - Compiled validators are immutable and `Send + Sync`.
//! - Schema errors abort compilation; data errors are always returned as
//!   values, never raised.

pub mod compiler;
pub mod discriminator;
pub mod graph;
pub mod keywords;
pub mod options;
mod plugins;
pub mod registry;
pub mod store;
pub mod validator;

pub use compiler::ValidationCompiler;
pub use discriminator::{DiscriminatorAnalyzer, DiscriminatorSpec, DispatchTable};
pub use graph::{Children, NodeId, SchemaBody, SchemaGraph, SchemaNode};
pub use options::{CompileOptions, ConfigError};
pub use registry::{KeywordCompiler, KeywordContext, KeywordRegistry, KeywordValidator};
pub use store::{SchemaStore, StoreError, DEFAULT_BASE_URI};
pub use validator::{ErrorCollector, PathSegment, Scope, ValidationOutcome, Validator};

pub use discrim_core::{
    JsonPointer, ResolutionError, SchemaError, SchemaErrorKind, SchemaLocation, TagValue,
    ValidationError, ValidationErrors,
};

use serde_json::Value;

/// Compile `schema` with default options.
pub fn compile(schema: &Value) -> Result<Validator, SchemaError> {
    compile_with(schema, CompileOptions::default())
}

/// Compile `schema` with `options` and the built-in plugins.
pub fn compile_with(schema: &Value, options: CompileOptions) -> Result<Validator, SchemaError> {
    ValidationCompiler::new(options).compile_document(schema)
}
