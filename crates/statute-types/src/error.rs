//! Error kinds for bundle loading and evaluation.
//!
//! Load-time errors (`BundleError`) are reported once, when a bundle is
//! parsed and validated. Call-time errors (`EvalError`) abort the whole
//! evaluating call: no partial verdict set, action space, or flow result
//! is ever returned. A blocked action is a successful result, not an error.

use thiserror::Error;

/// Errors produced while loading a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleError {
    /// The input could not be parsed into the structured bundle form.
    #[error("invalid bundle: {message}")]
    Invalid { message: String },

    /// The structured form violates a bundle invariant (unknown id
    /// reference, non-member state, stratum ordering, dangling step).
    #[error("bundle schema error in '{construct_id}': {message}")]
    Schema {
        construct_id: String,
        message: String,
    },
}

impl BundleError {
    pub fn invalid(message: impl Into<String>) -> Self {
        BundleError::Invalid {
            message: message.into(),
        }
    }

    pub fn schema(construct_id: impl Into<String>, message: impl Into<String>) -> Self {
        BundleError::Schema {
            construct_id: construct_id.into(),
            message: message.into(),
        }
    }
}

/// Errors produced while evaluating against a loaded bundle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A condition referenced a fact that was neither supplied nor
    /// covered by a declared default.
    #[error("missing required fact '{fact_id}'")]
    MissingFact { fact_id: String },

    /// Operand or fact value types are incompatible.
    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },

    /// The requested flow is not declared in the bundle.
    #[error("flow '{flow_id}' not found")]
    FlowNotFound { flow_id: String },

    /// Flow simulation hit the step-count safety bound.
    #[error("flow '{flow_id}' execution failed: {message}")]
    FlowExecution { flow_id: String, message: String },
}

impl EvalError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_error_messages() {
        let e = BundleError::invalid("not JSON");
        assert_eq!(e.to_string(), "invalid bundle: not JSON");

        let e = BundleError::schema("Order", "initial state 'x' not in states");
        assert_eq!(
            e.to_string(),
            "bundle schema error in 'Order': initial state 'x' not in states"
        );
    }

    #[test]
    fn eval_error_messages() {
        let e = EvalError::MissingFact {
            fact_id: "is_active".to_string(),
        };
        assert_eq!(e.to_string(), "missing required fact 'is_active'");

        let e = EvalError::FlowNotFound {
            flow_id: "nope".to_string(),
        };
        assert_eq!(e.to_string(), "flow 'nope' not found");
    }
}
