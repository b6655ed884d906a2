//! Response parsing: completion text → [`ExtractionResult`].
//!
//! The completion must be a JSON object and nothing else. Fenced output,
//! trailing prose or a top-level array is a terminal [`IntakeError::Parse`];
//! no repair is attempted.

use crate::error::IntakeError;
use crate::output::ExtractionResult;
use serde_json::Value;

/// Parse the raw completion text.
pub fn parse_completion(raw: &str) -> Result<ExtractionResult, IntakeError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| IntakeError::Parse {
        detail: e.to_string(),
    })?;

    match value {
        Value::Object(fields) => Ok(ExtractionResult::new(fields)),
        other => Err(IntakeError::Parse {
            detail: format!("expected a JSON object, got {}", json_type(&other)),
        }),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
