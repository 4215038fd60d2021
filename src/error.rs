//! Unified client error model and mapping helpers.
//! Every backend call, storage access and token decode funnels into `AppError` so screens
//! can render one message type. Only `SessionExpired` carries session-level meaning; the
//! pipeline raises it after it has already torn the session down.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// Message shown when the server did not provide one.
pub const GENERIC_MESSAGE: &str = "An error occurred. Please try again later.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    Transport { code: String, message: String },
    UserInput { code: String, message: String },
    Rejected { code: String, message: String, status: u16 },
    SessionExpired { code: String, message: String },
    Server { code: String, message: String, status: u16 },
    Decode { code: String, message: String },
    Storage { code: String, message: String },
    Config { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Transport { code, .. }
            | AppError::UserInput { code, .. }
            | AppError::Rejected { code, .. }
            | AppError::SessionExpired { code, .. }
            | AppError::Server { code, .. }
            | AppError::Decode { code, .. }
            | AppError::Storage { code, .. }
            | AppError::Config { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Transport { message, .. }
            | AppError::UserInput { message, .. }
            | AppError::Rejected { message, .. }
            | AppError::SessionExpired { message, .. }
            | AppError::Server { message, .. }
            | AppError::Decode { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Config { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn transport(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Transport { code: code.into(), message: msg.into() } }
    pub fn user(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn session_expired(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::SessionExpired { code: code.into(), message: msg.into() } }
    pub fn decode(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Decode { code: code.into(), message: msg.into() } }
    pub fn storage(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Storage { code: code.into(), message: msg.into() } }
    pub fn config(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Config { code: code.into(), message: msg.into() } }
    pub fn internal(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Classify a non-2xx response. The server's `message` field, when present, becomes the
    /// error text; otherwise the message is empty and `user_message` supplies the fallback.
    pub fn from_status(status: u16, body: &Value) -> Self {
        let message = server_message(body).unwrap_or_default();
        match status {
            401 => AppError::SessionExpired { code: "session_expired".into(), message },
            400..=499 => AppError::Rejected { code: format!("http_{}", status), message, status },
            _ => AppError::Server { code: format!("http_{}", status), message, status },
        }
    }

    /// HTTP status the error came from, if it came from a response at all.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            AppError::Rejected { status, .. } | AppError::Server { status, .. } => Some(*status),
            AppError::SessionExpired { .. } => Some(401),
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool { matches!(self, AppError::SessionExpired { .. }) }

    /// Replace an empty message with `fallback`, keeping the kind and code.
    pub fn or_message(mut self, fallback: &str) -> Self {
        match &mut self {
            AppError::Transport { message, .. }
            | AppError::UserInput { message, .. }
            | AppError::Rejected { message, .. }
            | AppError::SessionExpired { message, .. }
            | AppError::Server { message, .. }
            | AppError::Decode { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Config { message, .. }
            | AppError::Internal { message, .. } => {
                if message.trim().is_empty() {
                    *message = fallback.to_string();
                }
            }
        }
        self
    }

    /// Text for a blocking notice: the server-provided message, else `fallback`.
    pub fn user_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        let m = self.message();
        if m.trim().is_empty() { fallback } else { m }
    }
}

/// Only a JSON `message` field counts; raw bodies such as proxy error pages are dropped.
fn server_message(body: &Value) -> Option<String> {
    body.get("message").and_then(|m| m.as_str()).map(|s| s.to_string())
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect_failed"
        } else if err.is_builder() {
            "bad_request"
        } else {
            "transport_error"
        };
        AppError::Transport { code: code.into(), message: err.to_string() }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode { code: "json_decode".into(), message: err.to_string() }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage { code: "io_error".into(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_classification() {
        assert!(AppError::from_status(401, &json!({})).is_session_expired());
        assert!(matches!(AppError::from_status(403, &json!({})), AppError::Rejected { status: 403, .. }));
        assert!(matches!(AppError::from_status(404, &json!({})), AppError::Rejected { status: 404, .. }));
        assert!(matches!(AppError::from_status(500, &json!({})), AppError::Server { status: 500, .. }));
        assert!(matches!(AppError::from_status(503, &json!({})), AppError::Server { status: 503, .. }));
    }

    #[test]
    fn server_message_is_carried() {
        let e = AppError::from_status(400, &json!({"message": "Book not available"}));
        assert_eq!(e.message(), "Book not available");
        assert_eq!(e.user_message(GENERIC_MESSAGE), "Book not available");
        assert_eq!(e.http_status(), Some(400));
        assert_eq!(e.code_str(), "http_400");
    }

    #[test]
    fn raw_error_pages_are_not_shown() {
        let page = Value::String("<html><body><h1>502 Bad Gateway</h1></body></html>".into());
        let e = AppError::from_status(502, &page);
        assert_eq!(e.message(), "");
        assert_eq!(e.user_message(GENERIC_MESSAGE), GENERIC_MESSAGE);
        let e = AppError::from_status(400, &json!({"error": "nope"}));
        assert_eq!(e.user_message("Registration failed."), "Registration failed.");
    }

    #[test]
    fn fallback_when_server_is_silent() {
        let e = AppError::from_status(500, &Value::Null);
        assert_eq!(e.user_message("Registration failed."), "Registration failed.");
        let t = AppError::transport("connect_failed", "");
        assert_eq!(t.user_message(GENERIC_MESSAGE), GENERIC_MESSAGE);
        assert_eq!(t.http_status(), None);
    }

    #[test]
    fn serde_tagging() {
        let e = AppError::user("invalid_email", "Email is invalid");
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "user_input");
        let back: AppError = serde_json::from_value(v).unwrap();
        assert_eq!(back, e);
    }
}
