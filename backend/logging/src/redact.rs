//! Scrubs API keys and bearer tokens from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[A-Za-z0-9_\-]{20,})|(Bearer\s+[A-Za-z0-9\-\._~+/]+=*)").unwrap()
});

/// Redacts credentials in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    API_KEY_RE
        .replace_all(input, "[REDACTED_TOKEN]")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_keys_and_bearer_tokens() {
        let raw = "Incorrect API key provided: sk-proj-abcdefghijklmnopqrstuvwxyz012345 (Bearer eyJhbGciOiJIUzI1NiJ9)";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("sk-proj-abcdefghijklmnopqrstuvwxyz012345"));
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiJ9"));
        assert!(clean.starts_with("Incorrect API key provided: [REDACTED_TOKEN]"));
    }

    #[test]
    fn leaves_ordinary_text_alone() {
        let raw = "Revenue for 2023 was USD 500 million";
        assert_eq!(redact_sensitive_data(raw), raw);
    }
}
