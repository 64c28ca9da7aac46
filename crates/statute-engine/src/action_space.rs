//! Action-space computation.
//!
//! One rule evaluation, then every flow is gated independently through
//! its entry operation. Flows appear in the output in bundle declaration
//! order.

use std::collections::BTreeMap;

use statute_bundle::{Bundle, Flow, Operation};
use statute_types::{
    Action, ActionSpace, BlockedAction, EntitySummary, EvalError, VerdictSet, VerdictSummary,
};

use crate::facts::assemble_facts;
use crate::gates::{GateCheck, check_operation, current_state};
use crate::rules::eval_strata;

pub fn compute_action_space(
    bundle: &Bundle,
    facts: &serde_json::Value,
    entity_states: &BTreeMap<String, String>,
    persona_id: &str,
) -> Result<ActionSpace, EvalError> {
    let fact_set = assemble_facts(bundle, facts)?;
    let verdicts = eval_strata(bundle, &fact_set)?;
    let current_verdicts = verdict_summaries(&verdicts);

    let mut actions = Vec::new();
    let mut blocked_actions = Vec::new();

    for flow in &bundle.flows {
        let entry_op = entry_operation(bundle, flow)?;
        let check = check_operation(
            bundle,
            entry_op,
            persona_id,
            &fact_set,
            &verdicts,
            entity_states,
        )?;
        match check {
            GateCheck::Pass { enabling_verdicts } => {
                actions.push(build_action(
                    bundle,
                    flow,
                    entry_op,
                    persona_id,
                    &current_verdicts,
                    &enabling_verdicts,
                    entity_states,
                ));
            }
            GateCheck::Blocked(reason) => {
                blocked_actions.push(BlockedAction {
                    flow_id: flow.id.clone(),
                    reason,
                });
            }
        }
    }

    Ok(ActionSpace {
        persona_id: persona_id.to_string(),
        current_verdicts,
        actions,
        blocked_actions,
    })
}

/// The operation referenced by the flow's entry step. The reference was
/// validated at load; a miss here means the bundle was built by hand.
fn entry_operation<'a>(bundle: &'a Bundle, flow: &Flow) -> Result<&'a Operation, EvalError> {
    let step = &flow.steps[flow.entry];
    bundle.operations.get(&step.operation).ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "flow '{}' entry references unknown operation '{}'",
            flow.id, step.operation
        ))
    })
}

fn verdict_summaries(verdicts: &VerdictSet) -> Vec<VerdictSummary> {
    verdicts
        .iter()
        .map(|v| VerdictSummary {
            verdict_type: v.verdict_type.clone(),
            payload: v.payload.to_json(),
            producing_rule: v.provenance.rule.clone(),
            stratum: v.provenance.stratum,
        })
        .collect()
}

fn build_action(
    bundle: &Bundle,
    flow: &Flow,
    entry_op: &Operation,
    persona_id: &str,
    current_verdicts: &[VerdictSummary],
    enabling_verdicts: &[String],
    entity_states: &BTreeMap<String, String>,
) -> Action {
    let enabling = current_verdicts
        .iter()
        .filter(|s| enabling_verdicts.contains(&s.verdict_type))
        .cloned()
        .collect();

    let mut affected_entities: Vec<EntitySummary> = Vec::new();
    for effect in &entry_op.effects {
        if affected_entities.iter().any(|e| e.entity_id == effect.entity_id) {
            continue;
        }
        let state = current_state(bundle, entity_states, &effect.entity_id);
        let possible_transitions = bundle
            .entities
            .get(&effect.entity_id)
            .map(|e| e.transitions_from(&state))
            .unwrap_or_default();
        affected_entities.push(EntitySummary {
            entity_id: effect.entity_id.clone(),
            current_state: state,
            possible_transitions,
        });
    }

    Action {
        flow_id: flow.id.clone(),
        persona_id: persona_id.to_string(),
        entry_operation_id: entry_op.id.clone(),
        enabling_verdicts: enabling,
        affected_entities,
        description: format!(
            "Execute flow '{}' starting with operation '{}'",
            flow.id, entry_op.id
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statute_types::BlockedReason;

    fn bundle() -> Bundle {
        statute_bundle::load_value(&crate::testutil::scenario_bundle()).unwrap()
    }

    fn states(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn action_available_when_all_gates_pass() {
        let bundle = bundle();
        let space = compute_action_space(
            &bundle,
            &serde_json::json!({"is_active": true}),
            &states(&[("Order", "pending")]),
            "admin",
        )
        .unwrap();
        assert_eq!(space.persona_id, "admin");
        assert_eq!(space.actions.len(), 1);
        assert!(space.blocked_actions.is_empty());
        let action = &space.actions[0];
        assert_eq!(action.flow_id, "approval_flow");
        assert_eq!(action.entry_operation_id, "approve_order");
        assert_eq!(action.enabling_verdicts.len(), 1);
        assert_eq!(action.enabling_verdicts[0].verdict_type, "account_active");
        assert_eq!(action.affected_entities.len(), 1);
        assert_eq!(action.affected_entities[0].current_state, "pending");
        assert_eq!(
            action.affected_entities[0].possible_transitions,
            vec!["approved"]
        );
        assert!(action.description.contains("approval_flow"));
        assert!(action.description.contains("approve_order"));
    }

    #[test]
    fn unauthorized_persona_is_blocked() {
        let bundle = bundle();
        let space = compute_action_space(
            &bundle,
            &serde_json::json!({"is_active": true}),
            &states(&[("Order", "pending")]),
            "guest",
        )
        .unwrap();
        assert!(space.actions.is_empty());
        assert_eq!(space.blocked_actions.len(), 1);
        assert!(matches!(
            space.blocked_actions[0].reason,
            BlockedReason::PersonaNotAuthorized
        ));
    }

    #[test]
    fn unmet_precondition_is_blocked() {
        let bundle = bundle();
        let space = compute_action_space(
            &bundle,
            &serde_json::json!({"is_active": false}),
            &states(&[("Order", "pending")]),
            "admin",
        )
        .unwrap();
        assert!(matches!(
            space.blocked_actions[0].reason,
            BlockedReason::PreconditionNotMet { .. }
        ));
    }

    #[test]
    fn wrong_source_state_is_blocked() {
        let bundle = bundle();
        let space = compute_action_space(
            &bundle,
            &serde_json::json!({"is_active": true}),
            &states(&[("Order", "approved")]),
            "admin",
        )
        .unwrap();
        assert!(matches!(
            space.blocked_actions[0].reason,
            BlockedReason::EntityNotInSourceState { .. }
        ));
    }

    #[test]
    fn entity_state_defaults_to_initial() {
        let bundle = bundle();
        let space = compute_action_space(
            &bundle,
            &serde_json::json!({"is_active": true}),
            &BTreeMap::new(),
            "admin",
        )
        .unwrap();
        assert_eq!(space.actions.len(), 1);
        assert_eq!(space.current_verdicts.len(), 1);
        assert_eq!(space.current_verdicts[0].verdict_type, "account_active");
        assert_eq!(space.current_verdicts[0].producing_rule, "check_active");
        assert_eq!(space.current_verdicts[0].stratum, 0);
    }
}
