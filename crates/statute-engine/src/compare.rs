//! Value comparison.
//!
//! All numeric comparison is exact `rust_decimal` arithmetic. Mixed
//! Int/Decimal operands promote the integer side; everything else must
//! match variants exactly or the comparison is a type mismatch.

use rust_decimal::Decimal;
use statute_bundle::CompareOp;
use statute_types::{EvalError, Value};

pub fn compare_values(left: &Value, right: &Value, op: CompareOp) -> Result<bool, EvalError> {
    match (left, right) {
        (Value::Bool(l), Value::Bool(r)) => equality_only(op, l == r, "Bool"),
        (Value::Int(l), Value::Int(r)) => Ok(ordered(op, l.cmp(r))),
        (Value::Decimal(l), Value::Decimal(r)) => Ok(ordered(op, l.cmp(r))),
        (Value::Int(l), Value::Decimal(r)) => Ok(ordered(op, Decimal::from(*l).cmp(r))),
        (Value::Decimal(l), Value::Int(r)) => Ok(ordered(op, l.cmp(&Decimal::from(*r)))),
        (Value::Text(l), Value::Text(r)) => equality_only(op, l == r, "Text"),
        (Value::Enum(l), Value::Enum(r)) => equality_only(op, l == r, "Enum"),
        (
            Value::Money { amount: la, currency: lc },
            Value::Money { amount: ra, currency: rc },
        ) => {
            // Currency mismatch is an error before any magnitude check.
            if lc != rc {
                return Err(EvalError::type_mismatch(format!(
                    "cannot compare Money in '{lc}' with Money in '{rc}'"
                )));
            }
            Ok(ordered(op, la.cmp(ra)))
        }
        _ => Err(EvalError::type_mismatch(format!(
            "cannot compare {} with {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn ordered(op: CompareOp, ord: std::cmp::Ordering) -> bool {
    match op {
        CompareOp::Eq => ord.is_eq(),
        CompareOp::Ne => !ord.is_eq(),
        CompareOp::Lt => ord.is_lt(),
        CompareOp::Le => ord.is_le(),
        CompareOp::Gt => ord.is_gt(),
        CompareOp::Ge => ord.is_ge(),
    }
}

fn equality_only(op: CompareOp, eq: bool, type_name: &str) -> Result<bool, EvalError> {
    match op {
        CompareOp::Eq => Ok(eq),
        CompareOp::Ne => Ok(!eq),
        other => Err(EvalError::type_mismatch(format!(
            "operator '{}' not defined for {type_name}",
            other.as_str()
        ))),
    }
}
