//! Condition expression evaluation.
//!
//! Logical nodes evaluate to Bool; references and literals evaluate to
//! their value. `and`/`or` short-circuit, so a fact only appears in
//! provenance if its branch was actually taken.

use statute_bundle::Predicate;
use statute_types::{EvalError, FactSet, Value, VerdictSet};

use crate::compare;
use crate::provenance::ProvenanceCollector;

pub fn eval_pred(
    pred: &Predicate,
    facts: &FactSet,
    verdicts: &VerdictSet,
    collector: &mut ProvenanceCollector,
) -> Result<Value, EvalError> {
    match pred {
        Predicate::FactRef(id) => {
            collector.record_fact(id);
            facts.get(id).cloned().ok_or_else(|| EvalError::MissingFact {
                fact_id: id.clone(),
            })
        }

        Predicate::VerdictPresent(verdict_type) => {
            collector.record_verdict(verdict_type);
            Ok(Value::Bool(verdicts.has_verdict(verdict_type)))
        }

        Predicate::VerdictValue(verdict_type) => {
            collector.record_verdict(verdict_type);
            verdicts
                .get_verdict(verdict_type)
                .map(|v| v.payload.clone())
                .ok_or_else(|| {
                    EvalError::type_mismatch(format!(
                        "verdict '{verdict_type}' has no value in this context"
                    ))
                })
        }

        Predicate::Literal { value, .. } => Ok(value.clone()),

        Predicate::Compare { left, op, right } => {
            let left_val = eval_pred(left, facts, verdicts, collector)?;
            let right_val = eval_pred(right, facts, verdicts, collector)?;
            Ok(Value::Bool(compare::compare_values(
                &left_val, &right_val, *op,
            )?))
        }

        Predicate::And { left, right } => {
            if !eval_pred(left, facts, verdicts, collector)?.as_bool()? {
                return Ok(Value::Bool(false));
            }
            let right_val = eval_pred(right, facts, verdicts, collector)?;
            Ok(Value::Bool(right_val.as_bool()?))
        }

        Predicate::Or { left, right } => {
            if eval_pred(left, facts, verdicts, collector)?.as_bool()? {
                return Ok(Value::Bool(true));
            }
            let right_val = eval_pred(right, facts, verdicts, collector)?;
            Ok(Value::Bool(right_val.as_bool()?))
        }

        Predicate::Not { operand } => {
            let val = eval_pred(operand, facts, verdicts, collector)?;
            Ok(Value::Bool(!val.as_bool()?))
        }
    }
}
