//! Response extraction
//!
//! Turns raw chat-completion text into JSON. Models asked for a strict JSON
//! object usually comply, but some wrap the object in prose and a markdown
//! fence, so a fenced `{...}` block is accepted as a fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::ParseFailure;

/// First fenced block (optionally tagged `json`) holding a `{...}` span.
/// The capture is non-greedy: it stops at the first `}` followed by a closing fence.
static FENCED_OBJECT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

/// Parse model output into a JSON value.
///
/// Whole-input parsing is tried first and wins whenever it succeeds, whatever
/// the JSON type of the result. Only then is the first fenced object parsed.
pub fn extract_json(raw: &str) -> Result<Value, ParseFailure> {
    let direct_err = match serde_json::from_str::<Value>(raw) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let Some(captures) = FENCED_OBJECT_PATTERN.captures(raw) else {
        debug!("No fenced JSON block in model output ({direct_err})");
        return Err(ParseFailure::new(format!(
            "not JSON and no fenced object: {direct_err}"
        )));
    };

    let span = &captures[1];
    debug!("Falling back to fenced JSON block ({} bytes)", span.len());
    serde_json::from_str::<Value>(span)
        .map_err(|e| ParseFailure::new(format!("fenced block is not valid JSON: {e}")))
}
