//! Pull the fenced JSON block out of a free-form model reply.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap());

/// Parse the first ```` ```json ```` block in `text`.
///
/// Returns `None` when there is no block or its content is not valid JSON.
pub fn extract_json(text: &str) -> Option<Value> {
    let Some(caps) = FENCED_JSON.captures(text) else {
        debug!("No JSON block in response");
        return None;
    };
    match serde_json::from_str(caps[1].trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "Malformed JSON block in response");
            None
        }
    }
}
