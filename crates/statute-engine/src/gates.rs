//! The three operation gates, in their fixed order.
//!
//! 1. persona authorization
//! 2. precondition over verdicts
//! 3. entity source state per effect
//!
//! The first failing gate wins; a blocked operation is a result, not an
//! error. Both the action-space computation and the flow walk go through
//! this check so the two can never disagree on gating.

use std::collections::BTreeMap;

use statute_bundle::{Bundle, Operation};
use statute_types::{BlockedReason, EvalError, FactSet, VerdictSet};

use crate::predicate::eval_pred;
use crate::provenance::ProvenanceCollector;

/// Outcome of running the gates for one operation.
#[derive(Debug, Clone)]
pub enum GateCheck {
    /// All gates passed; carries the verdict types the precondition
    /// actually consulted and found present.
    Pass { enabling_verdicts: Vec<String> },
    Blocked(BlockedReason),
}

pub fn check_operation(
    bundle: &Bundle,
    op: &Operation,
    persona_id: &str,
    facts: &FactSet,
    verdicts: &VerdictSet,
    entity_states: &BTreeMap<String, String>,
) -> Result<GateCheck, EvalError> {
    if !op.allowed_personas.iter().any(|p| p == persona_id) {
        return Ok(GateCheck::Blocked(BlockedReason::PersonaNotAuthorized));
    }

    let mut collector = ProvenanceCollector::new();
    let satisfied = eval_pred(&op.precondition, facts, verdicts, &mut collector)?.as_bool()?;
    if !satisfied {
        let missing_verdicts = op
            .precondition
            .verdict_refs()
            .into_iter()
            .filter(|v| !verdicts.has_verdict(v))
            .collect();
        return Ok(GateCheck::Blocked(BlockedReason::PreconditionNotMet {
            missing_verdicts,
        }));
    }

    for effect in &op.effects {
        let current = current_state(bundle, entity_states, &effect.entity_id);
        if current != effect.from {
            return Ok(GateCheck::Blocked(BlockedReason::EntityNotInSourceState {
                entity_id: effect.entity_id.clone(),
                current_state: current,
                required_state: effect.from.clone(),
            }));
        }
    }

    let enabling_verdicts = collector
        .verdicts_used()
        .iter()
        .filter(|v| verdicts.has_verdict(v))
        .cloned()
        .collect();
    Ok(GateCheck::Pass { enabling_verdicts })
}

/// Current state of an entity, defaulting to its declared initial state
/// when the caller's map does not mention it.
pub fn current_state(
    bundle: &Bundle,
    entity_states: &BTreeMap<String, String>,
    entity_id: &str,
) -> String {
    if let Some(state) = entity_states.get(entity_id) {
        return state.clone();
    }
    bundle
        .entities
        .get(entity_id)
        .map(|e| e.initial.clone())
        .unwrap_or_default()
}
