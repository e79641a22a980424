//! Config redaction: masks credentials before a config is printed or logged.

use serde_json::Value;

const SENSITIVE_KEYS: &[&str] = &[
    "api_key",
    "apikey",
    "token",
    "access_token",
    "secret",
    "password",
    "authorization",
];

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Redact a config JSON value, keeping a short prefix of each secret.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_sensitive_key(key) && !s.is_empty() => {
            let hint: String = if s.chars().count() > 8 {
                s.chars().take(3).collect()
            } else {
                String::new()
            };
            Value::String(format!("{hint}***"))
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Field paths that [`redact`] would mask.
pub fn collect_redacted_paths(value: &Value) -> Vec<String> {
    fn collect(value: &Value, path: &str, out: &mut Vec<String>) {
        match value {
            Value::String(s) if !s.is_empty() => {
                if is_sensitive_key(path.rsplit('.').next().unwrap_or("")) {
                    out.push(path.to_string());
                }
            }
            Value::Object(map) => {
                for (k, v) in map {
                    let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                    collect(v, &child, out);
                }
            }
            _ => {}
        }
    }
    let mut paths = Vec::new();
    collect(value, "", &mut paths);
    paths
}
