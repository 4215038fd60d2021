//! Claim extraction from backend-issued tokens.
//!
//! Tokens are read **without signature verification**. Claims only decide which screens
//! the client offers; the backend re-validates the token on every call.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::User, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClaimsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(ClaimsError::UnknownRole(other.to_string())),
        }
    }
}

/// The part of a token the client acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub subject_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimsError {
    #[error("token is not a JWT: expected at least 2 segments, found {0}")]
    Malformed(usize),
    #[error("token payload is not base64url: {0}")]
    Base64(String),
    #[error("token payload is not JSON: {0}")]
    Json(String),
    #[error("token carries no subject id")]
    MissingSubject,
    #[error("token carries unknown role '{0}'")]
    UnknownRole(String),
}

impl From<ClaimsError> for AppError {
    fn from(err: ClaimsError) -> Self {
        AppError::decode("token_claims", err.to_string())
    }
}

/// Decode `{subject_id, role}` from a JWT payload.
///
/// Accepted payload shapes:
/// - `{"user": {"id": "...", "role": "admin"}}` as issued by the library backend;
/// - `{"sub": "...", "role": "user"}` or `{"id": "...", ...}` at top level.
///
/// A missing role reads as `user`; an unrecognised role is an error.
pub fn decode_claims(token: &str) -> Result<Claims, ClaimsError> {
    let parts: Vec<&str> = token.trim().splitn(3, '.').collect();
    if parts.len() < 2 {
        return Err(ClaimsError::Malformed(parts.len()));
    }
    let payload = parts[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|e| ClaimsError::Base64(e.to_string()))?;
    let json: Value = serde_json::from_slice(&bytes).map_err(|e| ClaimsError::Json(e.to_string()))?;

    let nested = json.get("user").filter(|u| u.is_object());
    let subject = nested
        .and_then(|u| u.get("id").or_else(|| u.get("_id")))
        .or_else(|| json.get("sub"))
        .or_else(|| json.get("id"))
        .and_then(scalar_to_string)
        .filter(|s| !s.is_empty())
        .ok_or(ClaimsError::MissingSubject)?;

    let role = match nested.and_then(|u| u.get("role")).or_else(|| json.get("role")) {
        None | Some(Value::Null) => Role::User,
        Some(Value::String(s)) => s.parse()?,
        Some(other) => return Err(ClaimsError::UnknownRole(other.to_string())),
    };

    Ok(Claims { subject_id: subject, role })
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build an unsigned token around `payload`. Used by tests and the mock backend.
pub fn encode_unsigned(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.sig", header, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backend_shape() {
        let t = encode_unsigned(&json!({"user": {"id": "u1", "role": "admin"}, "iat": 1}));
        let c = decode_claims(&t).unwrap();
        assert_eq!(c, Claims { subject_id: "u1".into(), role: Role::Admin });
    }

    #[test]
    fn top_level_shape_and_default_role() {
        let t = encode_unsigned(&json!({"sub": "abc"}));
        let c = decode_claims(&t).unwrap();
        assert_eq!(c.subject_id, "abc");
        assert_eq!(c.role, Role::User);

        let t = encode_unsigned(&json!({"id": 42, "role": "USER"}));
        assert_eq!(decode_claims(&t).unwrap().subject_id, "42");
    }

    #[test]
    fn two_segment_token_is_accepted() {
        let t = encode_unsigned(&json!({"sub": "x"}));
        let short = t.rsplit_once('.').unwrap().0.to_string();
        assert_eq!(decode_claims(&short).unwrap().subject_id, "x");
    }

    #[test]
    fn malformed_tokens() {
        assert_eq!(decode_claims("opaque"), Err(ClaimsError::Malformed(1)));
        assert!(matches!(decode_claims("a.!!!.c"), Err(ClaimsError::Base64(_))));
        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode("nope"));
        assert!(matches!(decode_claims(&not_json), Err(ClaimsError::Json(_))));
        let t = encode_unsigned(&json!({"role": "admin"}));
        assert_eq!(decode_claims(&t), Err(ClaimsError::MissingSubject));
        let t = encode_unsigned(&json!({"sub": "x", "role": "librarian"}));
        assert_eq!(decode_claims(&t), Err(ClaimsError::UnknownRole("librarian".into())));
    }

    #[test]
    fn claims_error_maps_to_decode() {
        let e: AppError = ClaimsError::MissingSubject.into();
        assert_eq!(e.code_str(), "token_claims");
    }
}
