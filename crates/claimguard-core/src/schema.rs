//! JSON Schema for raw model decisions.
//!
//! Generation providers return free-form JSON; structure is validated
//! against this schema before deserialization so malformed model
//! output surfaces as a schema error, not a partial parse.

use lazy_static::lazy_static;
use serde_json::{json, Value};
use thiserror::Error;

use crate::types::RawDecision;

lazy_static! {
    static ref DECISION_VALIDATOR: jsonschema::Validator =
        jsonschema::validator_for(&decision_schema()).unwrap();
}

/// Errors from parsing a raw decision out of model JSON.
#[derive(Error, Debug)]
pub enum DecisionParseError {
    #[error("decision JSON does not match schema: {0}")]
    Schema(String),

    #[error("failed to deserialize decision: {0}")]
    Json(#[from] serde_json::Error),
}

/// The JSON Schema a raw model decision must satisfy.
pub fn decision_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "RawDecision",
        "type": "object",
        "required": ["status", "explanation", "confidence"],
        "properties": {
            "status": {
                "enum": ["covered", "not_covered", "manual_review"]
            },
            "explanation": {
                "type": "string",
                "minLength": 1
            },
            "clause_references": {
                "type": "array",
                "items": { "type": "string" }
            },
            "required_documents": {
                "type": "array",
                "items": { "type": "string" }
            },
            "confidence": {
                "type": "number",
                "minimum": 0.0,
                "maximum": 1.0
            }
        },
        "additionalProperties": true
    })
}

/// Validate decision JSON against the schema, returning every violation.
pub fn validate_decision_json(value: &Value) -> Result<(), Vec<String>> {
    let errors: Vec<String> = DECISION_VALIDATOR
        .iter_errors(value)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate and deserialize a raw decision from model JSON.
pub fn decision_from_json(value: &Value) -> Result<RawDecision, DecisionParseError> {
    validate_decision_json(value)
        .map_err(|errors| DecisionParseError::Schema(errors.join("; ")))?;
    Ok(serde_json::from_value(value.clone())?)
}
