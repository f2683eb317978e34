//! Validation of the model's free-form JSON reply.
//!
//! The reply is parsed into an untyped `serde_json::Value` first and every field
//! is checked before a `GenerationResult` exists, so a malformed reply can only
//! ever surface as a `SchemaError`.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::llm_client::strip_json_fences;

pub const MAX_MATCH_SCORE: u8 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub optimized_resume: String,
    pub cover_letter: String,
    /// 0 – 100
    pub match_score: u8,
    pub key_changes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("response is not valid JSON: {0}")]
    NotJson(String),

    #[error("response is not a JSON object")]
    NotObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{0}` is empty")]
    EmptyField(&'static str),

    #[error("matchScore {0} is outside 0-100")]
    ScoreOutOfRange(f64),
}

/// Validates a raw model reply against the expected generation schema.
pub fn validate_generation(raw: &str) -> Result<GenerationResult, SchemaError> {
    let value: Value = serde_json::from_str(strip_json_fences(raw))
        .map_err(|e| SchemaError::NotJson(e.to_string()))?;
    let object = value.as_object().ok_or(SchemaError::NotObject)?;

    Ok(GenerationResult {
        optimized_resume: required_text(object, "optimizedResume")?,
        cover_letter: required_text(object, "coverLetter")?,
        match_score: match_score(object)?,
        key_changes: key_changes(object)?,
    })
}

fn required_text(object: &Map<String, Value>, field: &'static str) -> Result<String, SchemaError> {
    let text = object
        .get(field)
        .ok_or(SchemaError::MissingField(field))?
        .as_str()
        .ok_or(SchemaError::WrongType {
            field,
            expected: "a string",
        })?
        .trim();
    if text.is_empty() {
        return Err(SchemaError::EmptyField(field));
    }
    Ok(text.to_string())
}

fn match_score(object: &Map<String, Value>) -> Result<u8, SchemaError> {
    const FIELD: &str = "matchScore";
    let score = object
        .get(FIELD)
        .ok_or(SchemaError::MissingField(FIELD))?
        .as_f64()
        .ok_or(SchemaError::WrongType {
            field: FIELD,
            expected: "a number",
        })?;
    if !(0.0..=f64::from(MAX_MATCH_SCORE)).contains(&score) {
        return Err(SchemaError::ScoreOutOfRange(score));
    }
    Ok(score.round() as u8)
}

/// Blank entries are dropped. An empty list is valid; an absent field is not.
fn key_changes(object: &Map<String, Value>) -> Result<Vec<String>, SchemaError> {
    const FIELD: &str = "keyChanges";
    const EXPECTED: &str = "an array of strings";
    let items = object
        .get(FIELD)
        .ok_or(SchemaError::MissingField(FIELD))?
        .as_array()
        .ok_or(SchemaError::WrongType {
            field: FIELD,
            expected: EXPECTED,
        })?;

    let mut changes = Vec::with_capacity(items.len());
    for item in items {
        let text = item.as_str().ok_or(SchemaError::WrongType {
            field: FIELD,
            expected: EXPECTED,
        })?;
        let text = text.trim();
        if !text.is_empty() {
            changes.push(text.to_string());
        }
    }
    Ok(changes)
}
