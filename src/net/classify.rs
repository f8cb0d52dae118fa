//! Maps HTTP outcomes to the typed error taxonomy
//!
//! Pure functions only: no I/O, no state. The transport-level half of the
//! taxonomy (`Network`/`Timeout`) comes from the `From<reqwest::Error>`
//! conversion on [`ApiError`].

use serde_json::Value;

use crate::error::ApiError;

/// Classify an HTTP status plus raw response body into a typed error.
///
/// The message is pulled from the server's JSON error envelope when possible;
/// unparseable bodies fall back to a generic per-status message rather than
/// raising a secondary error.
pub fn classify(status: u16, body: &str) -> ApiError {
    let message = extract_message(body).unwrap_or_else(|| fallback_message(status));

    match status {
        400 | 422 => ApiError::BadRequest(message),
        401 => ApiError::Unauthorized(message),
        403 => ApiError::Forbidden(message),
        404 => ApiError::NotFound(message),
        408 => ApiError::Timeout(message),
        _ => ApiError::Server { status, message },
    }
}

/// Extract a human-readable message from a JSON error envelope.
///
/// Lookup order: `message`, `error`, `detail`, then the first value inside an
/// `errors` map (or the first element of an `errors` array).
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let obj = value.as_object()?;

    for field in ["message", "error", "detail"] {
        if let Some(msg) = obj.get(field).and_then(Value::as_str) {
            if !msg.is_empty() {
                return Some(msg.to_string());
            }
        }
    }

    match obj.get("errors") {
        Some(Value::Object(map)) => map
            .values()
            .next()
            .and_then(first_string)
            .filter(|s| !s.is_empty()),
        Some(Value::Array(items)) => items
            .first()
            .and_then(first_string)
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// Field-level errors may be strings or arrays of strings
fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

fn fallback_message(status: u16) -> String {
    match status {
        400 | 422 => "Invalid request. Please check your input and try again.".to_string(),
        401 => "Your session has expired. Please sign in again.".to_string(),
        403 => "You don't have permission to access this resource.".to_string(),
        404 => "The requested resource was not found.".to_string(),
        408 => "The request timed out. Please try again.".to_string(),
        500..=599 => "Something went wrong on our end. Please try again shortly.".to_string(),
        _ => format!("Unexpected response (HTTP {}).", status),
    }
}
