//! Interchange JSON parsing.
//!
//! Turns the serialized bundle form into the indexed model. Structural
//! problems inside a construct surface as schema errors carrying the
//! construct id; a top level that is not a bundle at all is invalid.

use std::collections::BTreeMap;

use statute_types::{BundleError, TypeSpec, Value, parse_literal_value};

use crate::model::{
    Bundle, CompareOp, Effect, Entity, FactDecl, Flow, Operation, Predicate, Rule, SourceLoc,
    Step, StepTarget, Stratum, Transition,
};

pub fn parse_bundle(v: &serde_json::Value) -> Result<Bundle, BundleError> {
    let obj = v
        .as_object()
        .ok_or_else(|| BundleError::invalid("bundle must be a JSON object"))?;
    let kind = obj.get("kind").and_then(|k| k.as_str()).unwrap_or("");
    if kind != "Bundle" {
        return Err(BundleError::invalid(format!(
            "top-level kind must be 'Bundle', got '{kind}'"
        )));
    }
    let id = top_str(obj, "id")?;
    let tenor = top_str(obj, "tenor")?;
    let tenor_version = top_str(obj, "tenor_version")?;
    let constructs = obj
        .get("constructs")
        .and_then(|c| c.as_array())
        .ok_or_else(|| BundleError::invalid("bundle missing 'constructs' array"))?;

    let mut facts = BTreeMap::new();
    let mut entities = BTreeMap::new();
    let mut rules = Vec::new();
    let mut operations = BTreeMap::new();
    let mut flows = Vec::new();
    let mut personas = Vec::new();
    let mut seen_ids = std::collections::BTreeSet::new();

    for construct in constructs {
        let cid = construct
            .get("id")
            .and_then(|i| i.as_str())
            .unwrap_or("<unnamed>")
            .to_string();
        let kind = construct
            .get("kind")
            .and_then(|k| k.as_str())
            .ok_or_else(|| BundleError::schema(&cid, "construct missing 'kind'"))?;
        if !seen_ids.insert(cid.clone()) {
            return Err(BundleError::schema(&cid, "duplicate construct id"));
        }
        match kind {
            "Fact" => {
                let fact = parse_fact(construct, &cid)?;
                facts.insert(fact.id.clone(), fact);
            }
            "Entity" => {
                let entity = parse_entity(construct, &cid)?;
                entities.insert(entity.id.clone(), entity);
            }
            "Rule" => rules.push(parse_rule(construct, &cid)?),
            "Operation" => {
                let op = parse_operation(construct, &cid)?;
                operations.insert(op.id.clone(), op);
            }
            "Flow" => flows.push(parse_flow(construct, &cid)?),
            "Persona" => personas.push(cid),
            // Unknown construct kinds are ignored for forward compatibility.
            _ => {}
        }
    }

    let strata = group_strata(&rules);
    let flow_index = flows
        .iter()
        .enumerate()
        .map(|(i, f)| (f.id.clone(), i))
        .collect();

    Ok(Bundle {
        id,
        tenor,
        tenor_version,
        facts,
        entities,
        rules,
        strata,
        operations,
        flows,
        personas,
        flow_index,
    })
}

fn group_strata(rules: &[Rule]) -> Vec<Stratum> {
    let mut by_number: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, rule) in rules.iter().enumerate() {
        by_number.entry(rule.stratum).or_default().push(i);
    }
    by_number
        .into_iter()
        .map(|(number, rules)| Stratum { number, rules })
        .collect()
}

fn top_str(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Result<String, BundleError> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| BundleError::invalid(format!("bundle missing '{field}'")))
}

fn req_str(v: &serde_json::Value, field: &str, cid: &str) -> Result<String, BundleError> {
    v.get(field)
        .and_then(|f| f.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| BundleError::schema(cid, format!("missing string field '{field}'")))
}

fn str_list(v: &serde_json::Value, field: &str) -> Vec<String> {
    v.get(field)
        .and_then(|a| a.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|s| s.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_loc(v: &serde_json::Value) -> SourceLoc {
    let prov = v.get("provenance");
    SourceLoc {
        file: prov
            .and_then(|p| p.get("file"))
            .and_then(|f| f.as_str())
            .unwrap_or("<unknown>")
            .to_string(),
        line: prov
            .and_then(|p| p.get("line"))
            .and_then(|l| l.as_u64())
            .unwrap_or(0),
    }
}

fn parse_type(v: &serde_json::Value, cid: &str) -> Result<TypeSpec, BundleError> {
    TypeSpec::from_json(v).map_err(|e| BundleError::schema(cid, e.to_string()))
}

fn parse_fact(v: &serde_json::Value, cid: &str) -> Result<FactDecl, BundleError> {
    let id = req_str(v, "id", cid)?;
    let source = v
        .get("source")
        .ok_or_else(|| BundleError::schema(cid, "Fact missing 'source'"))?;
    let source_system = req_str(source, "system", cid)?;
    let source_field = req_str(source, "field", cid)?;
    let type_val = v
        .get("type")
        .ok_or_else(|| BundleError::schema(cid, "Fact missing 'type'"))?;
    let spec = parse_type(type_val, cid)?;
    let default = match v.get("default") {
        Some(def) => Some(
            parse_literal_value(def, &spec).map_err(|e| BundleError::schema(cid, e.to_string()))?,
        ),
        None => None,
    };
    Ok(FactDecl {
        id,
        source_system,
        source_field,
        spec,
        default,
        loc: parse_loc(v),
    })
}

fn parse_entity(v: &serde_json::Value, cid: &str) -> Result<Entity, BundleError> {
    let id = req_str(v, "id", cid)?;
    let initial = req_str(v, "initial", cid)?;
    let states = str_list(v, "states");
    if states.is_empty() {
        return Err(BundleError::schema(cid, "Entity missing 'states'"));
    }
    let transitions = v
        .get("transitions")
        .and_then(|t| t.as_array())
        .map(|arr| {
            arr.iter()
                .map(|t| {
                    Ok(Transition {
                        from: req_str(t, "from", cid)?,
                        to: req_str(t, "to", cid)?,
                    })
                })
                .collect::<Result<Vec<_>, BundleError>>()
        })
        .transpose()?
        .unwrap_or_default();
    Ok(Entity {
        id,
        states,
        initial,
        transitions,
        loc: parse_loc(v),
    })
}

fn parse_rule(v: &serde_json::Value, cid: &str) -> Result<Rule, BundleError> {
    let id = req_str(v, "id", cid)?;
    let stratum = v
        .get("stratum")
        .and_then(|s| s.as_u64())
        .ok_or_else(|| BundleError::schema(cid, "Rule missing 'stratum'"))?;
    let stratum = u32::try_from(stratum)
        .map_err(|_| BundleError::schema(cid, format!("stratum {stratum} out of range")))?;
    let body = v
        .get("body")
        .ok_or_else(|| BundleError::schema(cid, "Rule missing 'body'"))?;
    let when = body
        .get("when")
        .ok_or_else(|| BundleError::schema(cid, "Rule body missing 'when'"))?;
    let condition = parse_predicate(when, cid)?;
    let produce = body
        .get("produce")
        .ok_or_else(|| BundleError::schema(cid, "Rule body missing 'produce'"))?;
    let verdict_type = req_str(produce, "verdict_type", cid)?;
    let payload_obj = produce
        .get("payload")
        .ok_or_else(|| BundleError::schema(cid, "produce clause missing 'payload'"))?;
    let type_val = payload_obj
        .get("type")
        .ok_or_else(|| BundleError::schema(cid, "produce payload missing 'type'"))?;
    let payload_type = parse_type(type_val, cid)?;
    let value_val = payload_obj
        .get("value")
        .ok_or_else(|| BundleError::schema(cid, "produce payload missing 'value'"))?;
    let payload = parse_literal_value(value_val, &payload_type)
        .map_err(|e| BundleError::schema(cid, e.to_string()))?;
    Ok(Rule {
        id,
        stratum,
        condition,
        verdict_type,
        payload_type,
        payload,
        loc: parse_loc(v),
    })
}

fn parse_operation(v: &serde_json::Value, cid: &str) -> Result<Operation, BundleError> {
    let id = req_str(v, "id", cid)?;
    let allowed_personas = str_list(v, "allowed_personas");
    // An absent or null precondition is an operation that is always
    // precondition-satisfied.
    let precondition = match v.get("precondition") {
        Some(p) if !p.is_null() => parse_predicate(p, cid)?,
        _ => Predicate::Literal {
            value: Value::Bool(true),
            spec: TypeSpec::bare("Bool"),
        },
    };
    let effects = v
        .get("effects")
        .and_then(|e| e.as_array())
        .map(|arr| {
            arr.iter()
                .map(|e| {
                    Ok(Effect {
                        entity_id: req_str(e, "entity_id", cid)?,
                        from: req_str(e, "from", cid)?,
                        to: req_str(e, "to", cid)?,
                    })
                })
                .collect::<Result<Vec<_>, BundleError>>()
        })
        .transpose()?
        .unwrap_or_default();
    let error_contract = str_list(v, "error_contract");
    Ok(Operation {
        id,
        allowed_personas,
        precondition,
        effects,
        error_contract,
        loc: parse_loc(v),
    })
}

/// Parse a flow, resolving step references to arena indices. Duplicate
/// step ids and dangling references fail here, at load time.
fn parse_flow(v: &serde_json::Value, cid: &str) -> Result<Flow, BundleError> {
    let id = req_str(v, "id", cid)?;
    let snapshot = v
        .get("snapshot")
        .and_then(|s| s.as_str())
        .unwrap_or("at_initiation")
        .to_string();
    let entry = req_str(v, "entry", cid)?;
    let steps_arr = v
        .get("steps")
        .and_then(|s| s.as_array())
        .ok_or_else(|| BundleError::schema(cid, "Flow missing 'steps'"))?;

    struct RawStep {
        id: String,
        operation: String,
        persona: String,
        on_success: RawTarget,
        on_failure: RawTarget,
    }
    enum RawTarget {
        Terminal(String),
        Ref(String),
    }

    let mut raw = Vec::new();
    for step in steps_arr {
        let kind = req_str(step, "kind", cid)?;
        if kind != "OperationStep" {
            return Err(BundleError::schema(
                cid,
                format!("unsupported step kind '{kind}'"),
            ));
        }
        let step_id = req_str(step, "id", cid)?;
        let operation = req_str(step, "op", cid)?;
        let persona = req_str(step, "persona", cid)?;
        let success_val = step
            .get("outcomes")
            .and_then(|o| o.get("success"))
            .ok_or_else(|| BundleError::schema(cid, "OperationStep missing 'outcomes.success'"))?;
        let failure_val = step
            .get("on_failure")
            .ok_or_else(|| BundleError::schema(cid, "OperationStep missing 'on_failure'"))?;
        let on_success = parse_target(success_val, cid)?;
        let on_failure = parse_target(failure_val, cid)?;
        raw.push(RawStep {
            id: step_id,
            operation,
            persona,
            on_success,
            on_failure,
        });
    }

    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    for (i, step) in raw.iter().enumerate() {
        if index.insert(step.id.as_str(), i).is_some() {
            return Err(BundleError::schema(
                cid,
                format!("duplicate step id '{}'", step.id),
            ));
        }
    }
    let resolve = |target: &RawTarget| -> Result<StepTarget, BundleError> {
        match target {
            RawTarget::Terminal(outcome) => Ok(StepTarget::Terminal(outcome.clone())),
            RawTarget::Ref(step_id) => index
                .get(step_id.as_str())
                .map(|&i| StepTarget::Next(i))
                .ok_or_else(|| {
                    BundleError::schema(cid, format!("dangling step reference '{step_id}'"))
                }),
        }
    };

    let entry = *index
        .get(entry.as_str())
        .ok_or_else(|| BundleError::schema(cid, format!("entry step '{entry}' not declared")))?;
    let steps = raw
        .iter()
        .map(|s| {
            Ok(Step {
                id: s.id.clone(),
                operation: s.operation.clone(),
                persona: s.persona.clone(),
                on_success: resolve(&s.on_success)?,
                on_failure: resolve(&s.on_failure)?,
            })
        })
        .collect::<Result<Vec<_>, BundleError>>()?;

    return Ok(Flow {
        id,
        snapshot,
        entry,
        steps,
        loc: parse_loc(v),
    });

    /// A target is a bare step id string, `{kind:"Next", next_step_id}`,
    /// or a terminal `{kind:"Terminal"|"Terminate", outcome}`. Bare
    /// `{outcome}` objects are accepted as terminals.
    fn parse_target(v: &serde_json::Value, cid: &str) -> Result<RawTarget, BundleError> {
        if let Some(s) = v.as_str() {
            return Ok(RawTarget::Ref(s.to_string()));
        }
        if v.is_object() {
            match v.get("kind").and_then(|k| k.as_str()) {
                Some("Next") => return Ok(RawTarget::Ref(req_str(v, "next_step_id", cid)?)),
                Some("Terminal") | Some("Terminate") | None => {
                    return Ok(RawTarget::Terminal(req_str(v, "outcome", cid)?));
                }
                Some(other) => {
                    return Err(BundleError::schema(
                        cid,
                        format!("unknown step target kind '{other}'"),
                    ));
                }
            }
        }
        Err(BundleError::schema(cid, "invalid step target"))
    }
}

/// Parse a condition expression. Operator nodes are checked before
/// literals so `{op, literal}` shapes never misparse as bare literals.
pub fn parse_predicate(v: &serde_json::Value, cid: &str) -> Result<Predicate, BundleError> {
    if let Some(vp) = v.get("verdict_present") {
        let id = vp
            .as_str()
            .ok_or_else(|| BundleError::schema(cid, "'verdict_present' must be a string"))?;
        return Ok(Predicate::VerdictPresent(id.to_string()));
    }
    if let Some(fr) = v.get("fact_ref") {
        let id = fr
            .as_str()
            .ok_or_else(|| BundleError::schema(cid, "'fact_ref' must be a string"))?;
        return Ok(Predicate::FactRef(id.to_string()));
    }
    if let Some(vv) = v.get("verdict_value").or_else(|| v.get("verdict_type")) {
        let id = vv
            .as_str()
            .ok_or_else(|| BundleError::schema(cid, "verdict reference must be a string"))?;
        return Ok(Predicate::VerdictValue(id.to_string()));
    }

    if let Some(op_val) = v.get("op") {
        let op = op_val
            .as_str()
            .ok_or_else(|| BundleError::schema(cid, "'op' must be a string"))?;
        match op {
            "and" => {
                let (left, right) = binary_operands(v, "and", cid)?;
                return Ok(Predicate::And {
                    left: Box::new(left),
                    right: Box::new(right),
                });
            }
            "or" => {
                let (left, right) = binary_operands(v, "or", cid)?;
                return Ok(Predicate::Or {
                    left: Box::new(left),
                    right: Box::new(right),
                });
            }
            "not" => {
                let operand = v
                    .get("operand")
                    .ok_or_else(|| BundleError::schema(cid, "'not' missing 'operand'"))?;
                return Ok(Predicate::Not {
                    operand: Box::new(parse_predicate(operand, cid)?),
                });
            }
            _ => {
                let compare_op = CompareOp::parse(op)
                    .ok_or_else(|| BundleError::schema(cid, format!("unknown operator '{op}'")))?;
                let (left, right) = binary_operands(v, op, cid)?;
                return Ok(Predicate::Compare {
                    left: Box::new(left),
                    op: compare_op,
                    right: Box::new(right),
                });
            }
        }
    }

    if let Some(literal) = v.get("literal") {
        let (value, spec) = match v.get("type") {
            Some(type_val) => {
                let spec = parse_type(type_val, cid)?;
                let value = parse_literal_value(literal, &spec)
                    .map_err(|e| BundleError::schema(cid, e.to_string()))?;
                (value, spec)
            }
            None => infer_literal(literal, cid)?,
        };
        return Ok(Predicate::Literal { value, spec });
    }

    Err(BundleError::schema(
        cid,
        format!("unrecognized condition expression: {v}"),
    ))
}

fn binary_operands(
    v: &serde_json::Value,
    op: &str,
    cid: &str,
) -> Result<(Predicate, Predicate), BundleError> {
    let left = v
        .get("left")
        .ok_or_else(|| BundleError::schema(cid, format!("'{op}' missing 'left'")))?;
    let right = v
        .get("right")
        .ok_or_else(|| BundleError::schema(cid, format!("'{op}' missing 'right'")))?;
    Ok((parse_predicate(left, cid)?, parse_predicate(right, cid)?))
}

/// Some literal nodes omit 'type'; infer it from the JSON shape.
fn infer_literal(v: &serde_json::Value, cid: &str) -> Result<(Value, TypeSpec), BundleError> {
    match v {
        serde_json::Value::Bool(b) => Ok((Value::Bool(*b), TypeSpec::bare("Bool"))),
        serde_json::Value::Number(n) => {
            let i = n.as_i64().ok_or_else(|| {
                BundleError::schema(cid, "untyped numeric literal must be an integer")
            })?;
            Ok((Value::Int(i), TypeSpec::bare("Int")))
        }
        serde_json::Value::String(s) => Ok((Value::Text(s.clone()), TypeSpec::bare("Text"))),
        other => Err(BundleError::schema(
            cid,
            format!("cannot infer type of literal {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_bundle_kind() {
        let err = parse_bundle(&serde_json::json!({"id": "x", "kind": "Rule"})).unwrap_err();
        assert!(matches!(err, BundleError::Invalid { .. }));
    }

    #[test]
    fn parses_comparison_predicate() {
        let pred = parse_predicate(
            &serde_json::json!({
                "op": ">=",
                "left": {"fact_ref": "amount"},
                "right": {"literal": "100.00", "type": {"base": "Decimal"}},
            }),
            "r1",
        )
        .unwrap();
        match pred {
            Predicate::Compare { op, .. } => assert_eq!(op, CompareOp::Ge),
            other => panic!("expected Compare, got {other:?}"),
        }
    }

    #[test]
    fn oversized_stratum_is_schema_error() {
        let err = parse_bundle(&serde_json::json!({
            "id": "b",
            "kind": "Bundle",
            "tenor": "1.0",
            "tenor_version": "1.0.0",
            "constructs": [{
                "id": "r1",
                "kind": "Rule",
                "tenor": "1.0",
                "provenance": {"file": "t", "line": 1},
                "stratum": 4_294_967_296u64,
                "body": {
                    "when": {"literal": true, "type": {"base": "Bool"}},
                    "produce": {
                        "verdict_type": "v",
                        "payload": {"type": {"base": "Bool"}, "value": true},
                    },
                },
            }],
        }))
        .unwrap_err();
        match err {
            BundleError::Schema { construct_id, message } => {
                assert_eq!(construct_id, "r1");
                assert!(message.contains("out of range"));
            }
            other => panic!("expected Schema, got {other:?}"),
        }
    }

    #[test]
    fn dangling_step_reference_is_schema_error() {
        let err = parse_bundle(&serde_json::json!({
            "id": "b",
            "kind": "Bundle",
            "tenor": "1.0",
            "tenor_version": "1.0.0",
            "constructs": [{
                "id": "f1",
                "kind": "Flow",
                "tenor": "1.0",
                "provenance": {"file": "t", "line": 1},
                "entry": "s1",
                "steps": [{
                    "kind": "OperationStep",
                    "id": "s1",
                    "op": "o1",
                    "persona": "admin",
                    "outcomes": {"success": {"kind": "Next", "next_step_id": "nowhere"}},
                    "on_failure": {"kind": "Terminate", "outcome": "failed"},
                }],
            }],
        }))
        .unwrap_err();
        match err {
            BundleError::Schema { construct_id, message } => {
                assert_eq!(construct_id, "f1");
                assert!(message.contains("nowhere"));
            }
            other => panic!("expected Schema, got {other:?}"),
        }
    }
}
