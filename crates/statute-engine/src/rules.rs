//! Stratified rule evaluation.
//!
//! Strata run in ascending order using the grouping precomputed at load.
//! Each stratum's verdicts are buffered and merged only after the whole
//! stratum finishes, so rules never observe same-stratum output.

use statute_bundle::{Bundle, Rule};
use statute_types::{EvalError, FactSet, VerdictInstance, VerdictSet};

use crate::predicate::eval_pred;
use crate::provenance::ProvenanceCollector;

pub fn eval_strata(bundle: &Bundle, facts: &FactSet) -> Result<VerdictSet, EvalError> {
    let mut verdicts = VerdictSet::new();

    for stratum in &bundle.strata {
        let mut produced = Vec::new();
        for &rule_index in &stratum.rules {
            let rule = &bundle.rules[rule_index];
            if let Some(verdict) = eval_rule(rule, facts, &verdicts)? {
                produced.push(verdict);
            }
        }
        for verdict in produced {
            verdicts.push(verdict);
        }
    }

    Ok(verdicts)
}

/// Evaluate one rule's condition. A true condition yields exactly one
/// verdict carrying the references the evaluation actually touched.
fn eval_rule(
    rule: &Rule,
    facts: &FactSet,
    verdicts: &VerdictSet,
) -> Result<Option<VerdictInstance>, EvalError> {
    let mut collector = ProvenanceCollector::new();
    let result = eval_pred(&rule.condition, facts, verdicts, &mut collector)?;
    if !result.as_bool()? {
        return Ok(None);
    }
    Ok(Some(VerdictInstance {
        verdict_type: rule.verdict_type.clone(),
        payload: rule.payload.clone(),
        provenance: collector.into_provenance(rule.id.clone(), rule.stratum),
    }))
}
