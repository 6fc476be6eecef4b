use serde_json::{Map, Value};

use crate::transport::ApiError;

/// Field names whose values never reach a log line, compared without
/// regard to case.
const DENYLIST: &[&str] = &[
    "token",
    "authtoken",
    "authenticatedusertoken",
    "accesstoken",
    "latitude",
    "longitude",
    "geolocation",
    "email",
    "phonenumber",
];

const CONTEXT_FIELD: &str = "customContext";
const MASK: &str = "[redacted]";

/// Scrubs sensitive fields from a payload shape before logging. Keys stay
/// visible so operators can see what was present; values are masked.
pub fn value(input: &Value) -> Value {
    match input {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, entry) in map {
                if is_denied(key) {
                    out.insert(key.clone(), Value::String(MASK.to_string()));
                } else if key == CONTEXT_FIELD {
                    out.insert(key.clone(), blank_values(entry));
                } else {
                    out.insert(key.clone(), value(entry));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(value).collect()),
        other => other.clone(),
    }
}

/// Loggable rendering of a wire error. Remote bodies can echo request
/// payloads back, so they go through the same scrub; bodies that are not
/// JSON are masked whole.
pub fn error_fields(err: &ApiError) -> Value {
    match err {
        ApiError::Remote {
            status,
            retry_after,
            message,
            transaction_id,
        } => {
            let body = serde_json::from_str::<Value>(message)
                .map(|parsed| value(&parsed))
                .unwrap_or_else(|_| Value::String(MASK.to_string()));
            serde_json::json!({
                "kind": "remote",
                "status": status.as_u16(),
                "retryAfterSecs": retry_after.map(|delay| delay.as_secs()),
                "transactionId": transaction_id,
                "body": body,
            })
        }
        ApiError::Transport(source) => serde_json::json!({
            "kind": "transport",
            "error": source.to_string(),
        }),
        ApiError::Config(source) => serde_json::json!({
            "kind": "config",
            "error": source.to_string(),
        }),
        ApiError::Decode(source) => serde_json::json!({
            "kind": "decode",
            "error": source.to_string(),
        }),
    }
}

fn is_denied(key: &str) -> bool {
    DENYLIST.iter().any(|denied| key.eq_ignore_ascii_case(denied))
}

// Context keys are routing hints and stay visible; the values are caller
// data and do not.
fn blank_values(input: &Value) -> Value {
    match input {
        Value::Object(map) => Value::Object(
            map.keys()
                .map(|key| (key.clone(), Value::String(MASK.to_string())))
                .collect(),
        ),
        other => value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_tokens_and_geolocation_keeps_region() {
        let scrubbed = value(&serde_json::json!({
            "token": "SECRET_TOKEN_123",
            "authToken": "also-secret",
            "geolocation": { "latitude": 48.85, "longitude": 2.35 },
            "region": "eu-west",
            "status": 200,
        }));
        assert_eq!(scrubbed["token"], MASK);
        assert_eq!(scrubbed["authToken"], MASK);
        assert_eq!(scrubbed["geolocation"], MASK);
        assert_eq!(scrubbed["region"], "eu-west");
        assert_eq!(scrubbed["status"], 200);
    }

    #[test]
    fn blanks_context_values_but_keeps_keys() {
        let scrubbed = value(&serde_json::json!({
            "customContext": { "plan": "gold", "team": "billing" },
        }));
        assert_eq!(scrubbed["customContext"]["plan"], MASK);
        assert_eq!(scrubbed["customContext"]["team"], MASK);
    }

    #[test]
    fn recurses_into_arrays_and_nests() {
        let scrubbed = value(&serde_json::json!({
            "entries": [ { "email": "who@example.com", "id": "e-1" } ],
        }));
        assert_eq!(scrubbed["entries"][0]["email"], MASK);
        assert_eq!(scrubbed["entries"][0]["id"], "e-1");
    }

    #[test]
    fn non_json_remote_body_is_masked_whole() {
        let err = ApiError::Remote {
            status: http::StatusCode::UNAUTHORIZED,
            retry_after: None,
            message: "bearer SECRET_TOKEN_123 rejected".to_string(),
            transaction_id: Some("tx-1".to_string()),
        };
        let fields = error_fields(&err);
        assert_eq!(fields["body"], MASK);
        assert_eq!(fields["status"], 401);
        assert!(!fields.to_string().contains("SECRET_TOKEN_123"));
    }

    #[test]
    fn json_remote_body_is_scrubbed_field_by_field() {
        let err = ApiError::Remote {
            status: http::StatusCode::BAD_REQUEST,
            retry_after: None,
            message: r#"{"authToken":"SECRET_TOKEN_123","reason":"expired"}"#.to_string(),
            transaction_id: None,
        };
        let fields = error_fields(&err);
        assert_eq!(fields["body"]["authToken"], MASK);
        assert_eq!(fields["body"]["reason"], "expired");
    }
}
