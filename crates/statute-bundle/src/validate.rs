//! Cross-construct invariant checks, run once at load.
//!
//! Everything here is a schema error: the bundle parsed, but references
//! or stratification are wrong. Checking stratification at load is what
//! lets evaluation be a single ascending pass with no cycle handling.

use statute_types::BundleError;

use crate::model::{Bundle, Operation, Predicate};

pub fn validate(bundle: &Bundle) -> Result<(), BundleError> {
    for entity in bundle.entities.values() {
        if !entity.states.contains(&entity.initial) {
            return Err(BundleError::schema(
                &entity.id,
                format!("initial state '{}' not in states", entity.initial),
            ));
        }
        for t in &entity.transitions {
            for state in [&t.from, &t.to] {
                if !entity.states.contains(state) {
                    return Err(BundleError::schema(
                        &entity.id,
                        format!("transition state '{state}' not in states"),
                    ));
                }
            }
        }
    }

    for rule in &bundle.rules {
        check_fact_refs(bundle, &rule.condition, &rule.id)?;
        // A rule may only consume verdicts produced strictly below it.
        for verdict_type in rule.condition.verdict_refs() {
            let producers = bundle.producer_strata(&verdict_type);
            if producers.is_empty() {
                return Err(BundleError::schema(
                    &rule.id,
                    format!("no rule produces verdict type '{verdict_type}'"),
                ));
            }
            if producers.iter().any(|&s| s >= rule.stratum) {
                return Err(BundleError::schema(
                    &rule.id,
                    format!(
                        "verdict type '{verdict_type}' is produced at stratum >= {}",
                        rule.stratum
                    ),
                ));
            }
        }
    }

    for op in bundle.operations.values() {
        check_fact_refs(bundle, &op.precondition, &op.id)?;
        for verdict_type in op.precondition.verdict_refs() {
            if bundle.producer_strata(&verdict_type).is_empty() {
                return Err(BundleError::schema(
                    &op.id,
                    format!("no rule produces verdict type '{verdict_type}'"),
                ));
            }
        }
        check_effects(bundle, op)?;
    }

    for flow in &bundle.flows {
        if flow.snapshot != "at_initiation" {
            return Err(BundleError::schema(
                &flow.id,
                format!("unsupported snapshot policy '{}'", flow.snapshot),
            ));
        }
        for step in &flow.steps {
            if !bundle.operations.contains_key(&step.operation) {
                return Err(BundleError::schema(
                    &flow.id,
                    format!(
                        "step '{}' references unknown operation '{}'",
                        step.id, step.operation
                    ),
                ));
            }
        }
    }

    Ok(())
}

fn check_fact_refs(bundle: &Bundle, pred: &Predicate, cid: &str) -> Result<(), BundleError> {
    for fact_id in pred.fact_refs() {
        if !bundle.facts.contains_key(&fact_id) {
            return Err(BundleError::schema(
                cid,
                format!("reference to undeclared fact '{fact_id}'"),
            ));
        }
    }
    Ok(())
}

fn check_effects(bundle: &Bundle, op: &Operation) -> Result<(), BundleError> {
    for effect in &op.effects {
        let entity = bundle.entities.get(&effect.entity_id).ok_or_else(|| {
            BundleError::schema(
                &op.id,
                format!("effect references unknown entity '{}'", effect.entity_id),
            )
        })?;
        let declared = entity
            .transitions
            .iter()
            .any(|t| t.from == effect.from && t.to == effect.to);
        if !declared {
            return Err(BundleError::schema(
                &op.id,
                format!(
                    "effect {} -> {} is not a declared transition of '{}'",
                    effect.from, effect.to, entity.id
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_bundle;

    fn bundle_with(constructs: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": "test",
            "kind": "Bundle",
            "tenor": "1.0",
            "tenor_version": "1.0.0",
            "constructs": constructs,
        })
    }

    fn fact(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "kind": "Fact",
            "tenor": "1.0",
            "provenance": {"file": "t.tenor", "line": 1},
            "source": {"system": "s", "field": "f"},
            "type": {"base": "Bool"},
        })
    }

    fn rule(id: &str, stratum: u64, when: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "kind": "Rule",
            "tenor": "1.0",
            "provenance": {"file": "t.tenor", "line": 2},
            "stratum": stratum,
            "body": {
                "when": when,
                "produce": {
                    "verdict_type": format!("{id}_verdict"),
                    "payload": {"type": {"base": "Bool"}, "value": true},
                },
            },
        })
    }

    #[test]
    fn accepts_well_formed_bundle() {
        let json = bundle_with(serde_json::json!([
            fact("is_active"),
            rule("r0", 0, serde_json::json!({"fact_ref": "is_active"})),
            rule("r1", 1, serde_json::json!({"verdict_present": "r0_verdict"})),
        ]));
        let bundle = parse_bundle(&json).unwrap();
        validate(&bundle).unwrap();
    }

    #[test]
    fn rejects_initial_state_outside_states() {
        let json = bundle_with(serde_json::json!([{
            "id": "Order",
            "kind": "Entity",
            "tenor": "1.0",
            "provenance": {"file": "t.tenor", "line": 1},
            "initial": "missing",
            "states": ["pending", "approved"],
            "transitions": [],
        }]));
        let bundle = parse_bundle(&json).unwrap();
        let err = validate(&bundle).unwrap_err();
        assert!(err.to_string().contains("initial state"));
    }

    #[test]
    fn rejects_same_stratum_verdict_dependency() {
        let json = bundle_with(serde_json::json!([
            fact("is_active"),
            rule("r0", 0, serde_json::json!({"fact_ref": "is_active"})),
            rule("r1", 0, serde_json::json!({"verdict_present": "r0_verdict"})),
        ]));
        let bundle = parse_bundle(&json).unwrap();
        let err = validate(&bundle).unwrap_err();
        match err {
            BundleError::Schema { construct_id, .. } => assert_eq!(construct_id, "r1"),
            other => panic!("expected Schema, got {other:?}"),
        }
    }

    #[test]
    fn rejects_undeclared_fact_reference() {
        let json = bundle_with(serde_json::json!([
            rule("r0", 0, serde_json::json!({"fact_ref": "ghost"})),
        ]));
        let bundle = parse_bundle(&json).unwrap();
        let err = validate(&bundle).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn rejects_effect_without_declared_transition() {
        let json = bundle_with(serde_json::json!([
            {
                "id": "Order",
                "kind": "Entity",
                "tenor": "1.0",
                "provenance": {"file": "t.tenor", "line": 1},
                "initial": "pending",
                "states": ["pending", "approved"],
                "transitions": [{"from": "pending", "to": "approved"}],
            },
            {
                "id": "reopen",
                "kind": "Operation",
                "tenor": "1.0",
                "provenance": {"file": "t.tenor", "line": 2},
                "allowed_personas": ["admin"],
                "precondition": {"literal": true, "type": {"base": "Bool"}},
                "effects": [{"entity_id": "Order", "from": "approved", "to": "pending"}],
                "error_contract": [],
            },
        ]));
        let bundle = parse_bundle(&json).unwrap();
        let err = validate(&bundle).unwrap_err();
        assert!(err.to_string().contains("not a declared transition"));
    }
}
