//! Best-effort numeric coercion for fields read from the raw result files.
//!
//! This is the only place external numbers enter the pipeline. Everything
//! downstream assumes finite `f64` values and treats `None` as "no response".

use serde_json::Value;

/// Convert a JSON scalar to a finite `f64`.
///
/// - numbers pass through if finite
/// - strings are trimmed and parsed (`"0.75"`, `" 80 "`, `"1e2"`)
/// - booleans map to `1.0` / `0.0`
/// - everything else (null, arrays, objects, garbage text, NaN/Inf) is `None`
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let x = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    x.is_finite().then_some(x)
}

/// Coerce an optional field of a JSON object. Missing keys are `None`.
pub fn coerce_field(record: &Value, field: &str) -> Option<f64> {
    record.get(field).and_then(coerce_f64)
}
