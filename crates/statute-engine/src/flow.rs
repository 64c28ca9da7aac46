//! Flow simulation.
//!
//! A bounded walk over a flow's pre-resolved step arena. The verdict
//! context is evaluated once up front and frozen; entity states live in
//! a private working copy, so nothing caller-owned is ever touched.

use std::collections::BTreeMap;

use statute_bundle::{Bundle, StepTarget};
use statute_types::{
    BlockedReason, EntityStateChange, EvalError, FlowResult, StepResult, StepStatus,
};

use crate::facts::assemble_facts;
use crate::gates::{GateCheck, check_operation};
use crate::rules::eval_strata;

/// Ceiling on steps taken in one simulation. Step references are
/// resolved at load, so only an undetected cycle can reach this.
pub const MAX_FLOW_STEPS: usize = 1000;

pub fn execute_flow(
    bundle: &Bundle,
    flow_id: &str,
    facts: &serde_json::Value,
    entity_states: &BTreeMap<String, String>,
    persona_id: &str,
) -> Result<FlowResult, EvalError> {
    let flow = bundle.flow(flow_id).ok_or_else(|| EvalError::FlowNotFound {
        flow_id: flow_id.to_string(),
    })?;

    let fact_set = assemble_facts(bundle, facts)?;
    let verdicts = eval_strata(bundle, &fact_set)?;

    // Working copy: every declared entity at its initial state, then the
    // caller's overrides.
    let mut working: BTreeMap<String, String> = bundle
        .entities
        .values()
        .map(|e| (e.id.clone(), e.initial.clone()))
        .collect();
    for (entity_id, state) in entity_states {
        working.insert(entity_id.clone(), state.clone());
    }

    let mut steps = Vec::new();
    let mut would_transition = Vec::new();
    let mut taken = 0usize;
    let mut current = flow.entry;

    loop {
        taken += 1;
        if taken > MAX_FLOW_STEPS {
            return Err(EvalError::FlowExecution {
                flow_id: flow_id.to_string(),
                message: format!("exceeded step limit of {MAX_FLOW_STEPS}"),
            });
        }

        let step = &flow.steps[current];
        let op = bundle
            .operations
            .get(&step.operation)
            .ok_or_else(|| EvalError::FlowExecution {
                flow_id: flow_id.to_string(),
                message: format!("step '{}' references unknown operation", step.id),
            })?;

        let check = check_operation(bundle, op, persona_id, &fact_set, &verdicts, &working)?;
        let next = match check {
            GateCheck::Pass { .. } => {
                steps.push(StepResult {
                    step_id: step.id.clone(),
                    operation_id: op.id.clone(),
                    status: StepStatus::Success,
                    detail: None,
                });
                for effect in &op.effects {
                    working.insert(effect.entity_id.clone(), effect.to.clone());
                    would_transition.push(EntityStateChange {
                        entity_id: effect.entity_id.clone(),
                        from: effect.from.clone(),
                        to: effect.to.clone(),
                    });
                }
                &step.on_success
            }
            GateCheck::Blocked(reason) => {
                steps.push(StepResult {
                    step_id: step.id.clone(),
                    operation_id: op.id.clone(),
                    status: StepStatus::Failure,
                    detail: Some(blocked_detail(&reason)),
                });
                &step.on_failure
            }
        };

        match next {
            StepTarget::Terminal(outcome) => {
                return Ok(FlowResult {
                    flow_id: flow_id.to_string(),
                    persona: persona_id.to_string(),
                    outcome: outcome.clone(),
                    steps,
                    would_transition,
                });
            }
            StepTarget::Next(index) => current = *index,
        }
    }
}

fn blocked_detail(reason: &BlockedReason) -> String {
    match reason {
        BlockedReason::PersonaNotAuthorized => "persona not authorized".to_string(),
        BlockedReason::PreconditionNotMet { missing_verdicts } => {
            format!("precondition not met (missing: {})", missing_verdicts.join(", "))
        }
        BlockedReason::EntityNotInSourceState {
            entity_id,
            current_state,
            required_state,
        } => format!(
            "entity '{entity_id}' in state '{current_state}', requires '{required_state}'"
        ),
    }
}
