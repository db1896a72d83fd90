// src/normalize.rs
//
// Model responses are free-form text that usually contains a JSON object,
// often wrapped in Markdown code fences or surrounded by commentary. This
// module recovers the object or reports why it could not.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("LLM did not return valid JSON: {reason}")]
pub struct NormalizationError {
    pub reason: String,
    /// Original model output, kept for diagnostics.
    pub raw_output: String,
}

impl NormalizationError {
    fn new(reason: impl Into<String>, raw_output: &str) -> Self {
        Self {
            reason: reason.into(),
            raw_output: raw_output.to_string(),
        }
    }
}

/// Extract a JSON object from raw model output.
///
/// Strips leading/trailing code fence markers, then takes the span from the
/// first `{` to the last `}` as the candidate document. Anything the model
/// printed before or after the object is tolerated.
pub fn normalize_llm_output(raw: &str) -> Result<Map<String, Value>, NormalizationError> {
    let mut cleaned = raw.trim();

    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    let cleaned = cleaned.trim();

    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) if start <= end => (start, end),
        _ => {
            return Err(NormalizationError::new(
                "No valid JSON object found in LLM output",
                raw,
            ))
        }
    };

    let candidate = &cleaned[start..=end];
    serde_json::from_str(candidate).map_err(|e| NormalizationError::new(e.to_string(), raw))
}
