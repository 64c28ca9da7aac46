//! Deterministic evaluation over a loaded bundle.
//!
//! Three entry points, all pure functions of (bundle, call inputs):
//! rule evaluation, action-space computation, and flow simulation. The
//! [`Evaluator`] owns an immutable bundle and is safe to share across
//! threads.

#![forbid(unsafe_code)]

mod action_space;
mod compare;
mod facts;
mod flow;
mod gates;
mod predicate;
mod provenance;
mod rules;

use std::collections::BTreeMap;

use statute_bundle::Bundle;
use statute_types::{ActionSpace, BundleError, EvalError, FlowResult, VerdictSet};

pub use flow::MAX_FLOW_STEPS;

/// Caller-supplied entity states: entity id -> current state name.
/// Entities absent from the map default to their declared initial state.
pub type EntityStateMap = BTreeMap<String, String>;

/// An immutable bundle plus its evaluation operations.
#[derive(Debug, Clone)]
pub struct Evaluator {
    bundle: Bundle,
}

impl Evaluator {
    /// Load from the serialized text form.
    pub fn from_str(input: &str) -> Result<Evaluator, BundleError> {
        Ok(Evaluator {
            bundle: statute_bundle::load_str(input)?,
        })
    }

    /// Load from an already-structured JSON value.
    pub fn from_value(value: &serde_json::Value) -> Result<Evaluator, BundleError> {
        Ok(Evaluator {
            bundle: statute_bundle::load_value(value)?,
        })
    }

    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    /// Run all rules over the supplied facts.
    pub fn evaluate(&self, facts: &serde_json::Value) -> Result<VerdictSet, EvalError> {
        let fact_set = facts::assemble_facts(&self.bundle, facts)?;
        rules::eval_strata(&self.bundle, &fact_set)
    }

    /// What the persona can and cannot do given these facts and states.
    pub fn compute_action_space(
        &self,
        facts: &serde_json::Value,
        entity_states: &EntityStateMap,
        persona_id: &str,
    ) -> Result<ActionSpace, EvalError> {
        action_space::compute_action_space(&self.bundle, facts, entity_states, persona_id)
    }

    /// Simulate one flow end to end without mutating anything.
    pub fn execute_flow(
        &self,
        flow_id: &str,
        facts: &serde_json::Value,
        entity_states: &EntityStateMap,
        persona_id: &str,
    ) -> Result<FlowResult, EvalError> {
        flow::execute_flow(&self.bundle, flow_id, facts, entity_states, persona_id)
    }
}
