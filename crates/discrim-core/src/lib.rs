//! # discrim-core — Foundational Types
//!
//! Leaf crate of the discrim workspace. It defines the vocabulary shared by
//! schema resolution, discriminator analysis and validation:
//!
//! - [`JsonPointer`] / [`SchemaLocation`]: addresses into instances and
//!   schema documents. Every schema node is identified by a `SchemaLocation`.
//! - [`TagValue`]: a discriminator tag keyed by `(runtime type, value)`.
//! - [`InstanceType`] and [`json_equal`]: the `type` vocabulary and the
//!   numeric-aware equality used by `const`/`enum`.
//! - [`SchemaError`] (compile time) and [`ValidationError`] (run time): two
//!   disjoint error taxonomies.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `discrim-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod pointer;
pub mod tag;
pub mod value;

pub use error::{
    PointerError, ResolutionError, SchemaError, SchemaErrorKind, UnknownTypeName, ValidationError,
    ValidationErrors,
};
pub use pointer::{JsonPointer, SchemaLocation};
pub use tag::{NumberTag, TagValue};
pub use value::{is_integral, json_equal, numbers_equal, InstanceType};
