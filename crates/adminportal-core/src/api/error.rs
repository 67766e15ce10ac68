use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::utils::truncate_string;
use crate::validation::{Field, FieldErrors};

/// Failures reported by the Auth API client.
///
/// Expected outcomes (bad password, taken email) are variants here rather
/// than panics; only `Network` and `Unknown` indicate something went wrong
/// outside the user's control.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("This email is already registered")]
    EmailTaken(FieldErrors),

    #[error("This username is already taken")]
    UsernameTaken(FieldErrors),

    #[error("Please fix the highlighted fields")]
    ValidationFailed(FieldErrors),

    #[error("{0}")]
    ExpiredOrInvalidCode(String),

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Unknown(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 200;

impl AuthError {
    /// Field-scoped server errors, for merging into a form's error map.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            AuthError::EmailTaken(errors)
            | AuthError::UsernameTaken(errors)
            | AuthError::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }

    /// Classify a transport failure (timeout, DNS, refused connection).
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::Network("Connection timed out. Please try again.".to_string())
        } else if err.is_connect() || err.is_request() {
            AuthError::Network(
                "Unable to connect to server. Check your internet connection.".to_string(),
            )
        } else if err.is_decode() {
            AuthError::Unknown("Unexpected response from server".to_string())
        } else {
            AuthError::Unknown(format!("Request failed: {}", err))
        }
    }

    /// Map a failed login response.
    ///
    /// Any 4xx carrying a JSON error body is a credentials problem; everything
    /// else is unknown.
    pub fn from_login_failure(status: StatusCode, body: &str) -> Self {
        if status.is_client_error() {
            if let Some(message) = error_message(body) {
                return AuthError::InvalidCredentials(message);
            }
        }
        Self::unexpected_status(status, body)
    }

    /// Map a failed registration response onto field errors.
    pub fn from_registration_failure(status: StatusCode, body: &str) -> Self {
        if status != StatusCode::BAD_REQUEST {
            return match error_message(body) {
                Some(message) if status.is_client_error() => AuthError::Unknown(message),
                _ => Self::unexpected_status(status, body),
            };
        }

        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
            return AuthError::Unknown(
                "Server error. The registration service returned an unreadable response."
                    .to_string(),
            );
        };

        let mut errors = FieldErrors::new();
        for (key, value) in &map {
            let Some(field) = Field::from_api_key(key) else {
                continue;
            };
            if let Some(message) = first_message(value) {
                if !errors.contains(field) {
                    errors.insert(field, message);
                }
            }
        }
        if errors.is_empty() {
            errors.insert(Field::General, "Registration failed");
        }

        // Legacy servers report duplicates as a bare {"error": "..."}
        let general = errors.get(Field::General).map(str::to_lowercase).unwrap_or_default();
        if errors.contains(Field::Email) || general.contains("email already") {
            AuthError::EmailTaken(errors)
        } else if errors.contains(Field::Username) || general.contains("username already") {
            AuthError::UsernameTaken(errors)
        } else {
            AuthError::ValidationFailed(errors)
        }
    }

    pub fn unexpected_status(status: StatusCode, body: &str) -> Self {
        let truncated = truncate_string(body, MAX_ERROR_BODY_LENGTH);
        match status.as_u16() {
            500..=599 => AuthError::Unknown(format!("Server error ({}). Please try again later.", status.as_u16())),
            _ if truncated.is_empty() => AuthError::Unknown(format!("Request failed ({})", status)),
            _ => AuthError::Unknown(format!("Request failed ({}): {}", status, truncated)),
        }
    }
}

/// Pull a human-readable message out of a JSON error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(first_message))
}

/// Django-style error values are either a string or an array of strings.
fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
}
