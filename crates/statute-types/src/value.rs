//! Runtime values and type descriptors.
//!
//! Values form a closed tagged union. All numeric evaluation uses
//! `rust_decimal::Decimal`; no `f64` appears anywhere in the evaluation
//! path, so comparison results are identical across bindings.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::EvalError;

/// Facts assembled for one evaluating call: fact id -> typed value.
pub type FactSet = BTreeMap<String, Value>;

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Money { amount: Decimal, currency: String },
    Enum(String),
}

impl Value {
    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Decimal(_) => "Decimal",
            Value::Text(_) => "Text",
            Value::Money { .. } => "Money",
            Value::Enum(_) => "Enum",
        }
    }

    /// Extract a boolean, or fail with a type mismatch.
    pub fn as_bool(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(EvalError::type_mismatch(format!(
                "expected Bool, got {}",
                other.type_name()
            ))),
        }
    }

    /// Canonical JSON rendering. Decimal and money amounts serialize as
    /// strings so no binding ever round-trips them through floats.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::json!(i),
            Value::Decimal(d) => serde_json::Value::String(d.to_string()),
            Value::Text(s) | Value::Enum(s) => serde_json::Value::String(s.clone()),
            Value::Money { amount, currency } => serde_json::json!({
                "amount": amount.to_string(),
                "currency": currency,
            }),
        }
    }
}

/// Declared type of a fact, literal, or verdict payload.
///
/// Only the fields meaningful for the supported bases are populated;
/// unknown fields in the source JSON are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub base: String,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub currency: Option<String>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub max_length: Option<u32>,
    pub values: Option<Vec<String>>,
}

impl TypeSpec {
    /// A bare type with only a base name.
    pub fn bare(base: &str) -> TypeSpec {
        TypeSpec {
            base: base.to_string(),
            precision: None,
            scale: None,
            currency: None,
            min: None,
            max: None,
            max_length: None,
            values: None,
        }
    }

    /// Parse a type descriptor from its JSON object form.
    pub fn from_json(v: &serde_json::Value) -> Result<TypeSpec, EvalError> {
        let obj = v
            .as_object()
            .ok_or_else(|| EvalError::type_mismatch("type descriptor must be a JSON object"))?;
        let base = obj
            .get("base")
            .and_then(|b| b.as_str())
            .ok_or_else(|| EvalError::type_mismatch("type descriptor missing 'base'"))?
            .to_string();

        Ok(TypeSpec {
            base,
            precision: obj.get("precision").and_then(|v| v.as_u64()).map(|v| v as u32),
            scale: obj.get("scale").and_then(|v| v.as_u64()).map(|v| v as u32),
            currency: obj
                .get("currency")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            min: obj.get("min").and_then(|v| v.as_i64()),
            max: obj.get("max").and_then(|v| v.as_i64()),
            max_length: obj
                .get("max_length")
                .and_then(|v| v.as_u64())
                .map(|v| v as u32),
            values: obj.get("values").and_then(|v| v.as_array()).map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            }),
        })
    }
}

/// Parse a plain JSON value against a declared type.
///
/// This is the shape callers supply in facts JSON: booleans and integers
/// as native JSON, decimals as strings, money as `{"amount","currency"}`.
pub fn parse_typed_value(v: &serde_json::Value, spec: &TypeSpec) -> Result<Value, EvalError> {
    match spec.base.as_str() {
        "Bool" => {
            let b = v
                .as_bool()
                .ok_or_else(|| mismatch(spec, v))?;
            Ok(Value::Bool(b))
        }
        "Int" => {
            let i = v.as_i64().ok_or_else(|| mismatch(spec, v))?;
            if let Some(min) = spec.min
                && i < min
            {
                return Err(EvalError::type_mismatch(format!(
                    "value {i} below declared Int minimum {min}"
                )));
            }
            if let Some(max) = spec.max
                && i > max
            {
                return Err(EvalError::type_mismatch(format!(
                    "value {i} above declared Int maximum {max}"
                )));
            }
            Ok(Value::Int(i))
        }
        "Decimal" => {
            let s = v.as_str().ok_or_else(|| mismatch(spec, v))?;
            let d = s
                .parse::<Decimal>()
                .map_err(|e| EvalError::type_mismatch(format!("invalid decimal '{s}': {e}")))?;
            Ok(Value::Decimal(d))
        }
        "Money" => {
            let amount_str = v
                .get("amount")
                .and_then(|a| {
                    // Accept either a plain string amount or the structured
                    // interchange literal with a nested "value" string.
                    a.as_str()
                        .map(|s| s.to_string())
                        .or_else(|| a.get("value").and_then(|v| v.as_str()).map(|s| s.to_string()))
                })
                .ok_or_else(|| mismatch(spec, v))?;
            let amount = amount_str
                .parse::<Decimal>()
                .map_err(|e| EvalError::type_mismatch(format!("invalid money amount: {e}")))?;
            let currency = v
                .get("currency")
                .and_then(|c| c.as_str())
                .or(spec.currency.as_deref())
                .unwrap_or("")
                .to_string();
            Ok(Value::Money { amount, currency })
        }
        "Text" => {
            let s = v.as_str().ok_or_else(|| mismatch(spec, v))?;
            if let Some(max_len) = spec.max_length
                && s.len() > max_len as usize
            {
                return Err(EvalError::type_mismatch(format!(
                    "text of length {} exceeds max_length {max_len}",
                    s.len()
                )));
            }
            Ok(Value::Text(s.to_string()))
        }
        "Enum" => {
            let s = v.as_str().ok_or_else(|| mismatch(spec, v))?;
            if let Some(ref variants) = spec.values
                && !variants.iter().any(|vv| vv == s)
            {
                return Err(EvalError::type_mismatch(format!(
                    "enum value '{s}' not in declared values {variants:?}"
                )));
            }
            Ok(Value::Enum(s.to_string()))
        }
        other => Err(EvalError::type_mismatch(format!(
            "unsupported type base '{other}'"
        ))),
    }
}

/// Parse a literal value from interchange JSON. Structured literals carry
/// a `kind` tag (`bool_literal`, `int_literal`, `decimal_value`,
/// `money_value`); anything else falls back to the plain form.
pub fn parse_literal_value(v: &serde_json::Value, spec: &TypeSpec) -> Result<Value, EvalError> {
    if let Some(kind) = v.get("kind").and_then(|k| k.as_str()) {
        match kind {
            "bool_literal" => {
                let b = v
                    .get("value")
                    .and_then(|b| b.as_bool())
                    .ok_or_else(|| EvalError::type_mismatch("bool_literal missing 'value'"))?;
                return Ok(Value::Bool(b));
            }
            "int_literal" => {
                let i = v
                    .get("value")
                    .and_then(|i| i.as_i64())
                    .ok_or_else(|| EvalError::type_mismatch("int_literal missing 'value'"))?;
                return Ok(Value::Int(i));
            }
            "decimal_value" => {
                let s = v
                    .get("value")
                    .and_then(|s| s.as_str())
                    .ok_or_else(|| EvalError::type_mismatch("decimal_value missing 'value'"))?;
                let d = s
                    .parse::<Decimal>()
                    .map_err(|e| EvalError::type_mismatch(format!("invalid decimal: {e}")))?;
                return Ok(Value::Decimal(d));
            }
            "money_value" => {
                let currency = v
                    .get("currency")
                    .and_then(|c| c.as_str())
                    .ok_or_else(|| EvalError::type_mismatch("money_value missing 'currency'"))?
                    .to_string();
                let amount_str = v
                    .get("amount")
                    .and_then(|a| a.get("value"))
                    .and_then(|s| s.as_str())
                    .ok_or_else(|| EvalError::type_mismatch("money_value missing 'amount'"))?;
                let amount = amount_str
                    .parse::<Decimal>()
                    .map_err(|e| EvalError::type_mismatch(format!("invalid money amount: {e}")))?;
                return Ok(Value::Money { amount, currency });
            }
            _ => {}
        }
    }
    parse_typed_value(v, spec)
}

fn mismatch(spec: &TypeSpec, v: &serde_json::Value) -> EvalError {
    EvalError::type_mismatch(format!(
        "expected {}, got JSON {}",
        spec.base,
        json_type_name(v)
    ))
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
