//! Config redaction: mask secrets before a config is printed or logged.

use serde_json::Value;

static SENSITIVE_KEYS: &[&str] = &[
    "apiKey",
    "api_key",
    "organization",
    "token",
    "secret",
    "password",
];

/// Redact a config JSON value, keeping a short prefix of each secret.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_sensitive_key(key) && !s.is_empty() => {
            let hint: String = s.chars().take(4).collect();
            if s.chars().count() > 4 {
                Value::String(format!("{hint}***"))
            } else {
                Value::String("***".to_string())
            }
        }
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_api_key() {
        let redacted = redact(&json!({"openai": {"apiKey": "sk-abcdef123456"}}));
        let key = redacted["openai"]["apiKey"].as_str().unwrap();
        assert_eq!(key, "sk-a***");
    }

    #[test]
    fn short_secret_is_fully_masked() {
        let redacted = redact(&json!({"openai": {"organization": "org"}}));
        assert_eq!(redacted["openai"]["organization"], "***");
    }

    #[test]
    fn empty_key_stays_empty() {
        let redacted = redact(&json!({"openai": {"apiKey": ""}}));
        assert_eq!(redacted["openai"]["apiKey"], "");
    }

    #[test]
    fn passthrough_non_sensitive() {
        let v = json!({"logging": {"level": "debug"}, "run": {"concurrency": 2}});
        assert_eq!(redact(&v), v);
    }
}
