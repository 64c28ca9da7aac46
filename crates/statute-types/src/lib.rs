//! Stable DTOs and value types shared across the statute workspace.
//!
//! This crate is intentionally boring:
//! - the runtime `Value` union and its type descriptors
//! - error kinds for loading and evaluation
//! - verdicts with provenance
//! - report shapes for action spaces and flow simulations

#![forbid(unsafe_code)]

pub mod error;
pub mod report;
pub mod value;
pub mod verdict;

pub use error::{BundleError, EvalError};
pub use report::{
    Action, ActionSpace, BlockedAction, BlockedReason, EntityStateChange, EntitySummary,
    FlowResult, StepResult, StepStatus, VerdictSummary,
};
pub use value::{FactSet, TypeSpec, Value, parse_literal_value, parse_typed_value};
pub use verdict::{Provenance, VerdictInstance, VerdictSet};
