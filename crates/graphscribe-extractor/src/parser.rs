//! Parse LLM replies into extraction results

use crate::error::ExtractorError;
use graphscribe_domain::ExtractionResult;
use serde_json::Value;

/// Strip an optional Markdown code fence around the reply
///
/// Handles both a fenced block (opening line with an optional info string
/// such as `json`, closing line) and a single-line fence.
pub fn extract_json(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn parse_error(message: impl Into<String>, reply: &str) -> ExtractorError {
    ExtractorError::Parse {
        message: message.into(),
        raw_reply: reply.to_string(),
    }
}

/// Parse the reply as JSON without checking its shape
pub fn parse_reply_value(reply: &str) -> Result<Value, ExtractorError> {
    serde_json::from_str(extract_json(reply))
        .map_err(|e| parse_error(format!("reply is not valid JSON: {}", e), reply))
}

/// Parse the reply strictly into an [`ExtractionResult`]
///
/// The reply must be a JSON object with `nodes` and `relationships` arrays,
/// and every attribute value must be an array of strings. Nothing is coerced.
/// Duplicate node ids or dangling relationship endpoints are reported as
/// validation errors.
pub fn parse_extraction(reply: &str) -> Result<ExtractionResult, ExtractorError> {
    let value = parse_reply_value(reply)?;
    if !value.is_object() {
        return Err(parse_error("reply must be a JSON object", reply));
    }

    // Deserialize from the text, not the Value, so attribute order is kept
    let result: ExtractionResult = serde_json::from_str(extract_json(reply))
        .map_err(|e| parse_error(format!("reply does not match the output contract: {}", e), reply))?;

    result
        .check_references()
        .map_err(|e| ExtractorError::Validation(e.to_string()))?;

    Ok(result)
}
