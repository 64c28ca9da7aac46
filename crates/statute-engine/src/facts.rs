//! Fact assembly: caller JSON -> typed FactSet.
//!
//! Supplied facts are typechecked against their declarations. Absent
//! facts with a declared default get the default; absent facts without
//! one are simply left out, and fail the call only if a condition
//! actually references them.

use statute_bundle::Bundle;
use statute_types::{EvalError, FactSet, parse_typed_value};

pub fn assemble_facts(bundle: &Bundle, facts: &serde_json::Value) -> Result<FactSet, EvalError> {
    let provided = facts
        .as_object()
        .ok_or_else(|| EvalError::type_mismatch("facts must be a JSON object"))?;

    let mut out = FactSet::new();
    for decl in bundle.facts.values() {
        match provided.get(&decl.id) {
            Some(raw) => {
                let value = parse_typed_value(raw, &decl.spec).map_err(|e| match e {
                    EvalError::TypeMismatch { message } => EvalError::TypeMismatch {
                        message: format!("fact '{}': {message}", decl.id),
                    },
                    other => other,
                })?;
                out.insert(decl.id.clone(), value);
            }
            None => {
                if let Some(default) = &decl.default {
                    out.insert(decl.id.clone(), default.clone());
                }
            }
        }
    }
    // Supplied keys with no matching declaration are ignored.
    Ok(out)
}
