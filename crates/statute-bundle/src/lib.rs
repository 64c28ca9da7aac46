//! Bundle loading: parse interchange JSON, validate invariants, index.
//!
//! The result is an immutable [`Bundle`] safe for unsynchronized shared
//! reads. Loading is the only place schema problems can surface; the
//! evaluation crates assume a validated bundle throughout.

#![forbid(unsafe_code)]

pub mod model;
mod parse;
mod validate;

pub use model::{
    Bundle, CompareOp, Effect, Entity, FactDecl, Flow, Operation, Predicate, Rule, SourceLoc,
    Step, StepTarget, Stratum, Transition,
};

use statute_types::BundleError;

/// Load a bundle from its serialized text form.
pub fn load_str(input: &str) -> Result<Bundle, BundleError> {
    let value: serde_json::Value = serde_json::from_str(input)
        .map_err(|e| BundleError::invalid(format!("not valid JSON: {e}")))?;
    load_value(&value)
}

/// Load a bundle from an already-structured JSON value.
pub fn load_value(value: &serde_json::Value) -> Result<Bundle, BundleError> {
    let bundle = parse::parse_bundle(value)?;
    validate::validate(&bundle)?;
    Ok(bundle)
}
