use std::fmt;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A pending backend call. Built by a caller, enriched by request interceptors, sent once.
#[derive(Clone)]
pub struct OutboundRequest {
    pub id: Uuid,
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: HeaderMap,
    // set once the session-expiry reaction has run for this request
    marked: bool,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        Self {
            id: Uuid::new_v4(),
            method,
            path,
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            marked: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self { Self::new(Method::GET, path) }
    pub fn delete(path: impl Into<String>) -> Self { Self::new(Method::DELETE, path) }
    pub fn post(path: impl Into<String>) -> Self { Self::new(Method::POST, path) }
    pub fn put(path: impl Into<String>) -> Self { Self::new(Method::PUT, path) }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn with_json<B: Serialize>(mut self, body: &B) -> AppResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> AppResult<Self> {
        self.set_header(name, value)?;
        Ok(self)
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> AppResult<()> {
        let n = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| AppError::internal("bad_header", format!("invalid header name: {}", name)))?;
        let v = HeaderValue::from_str(value)
            .map_err(|_| AppError::internal("bad_header", format!("invalid value for header {}", name)))?;
        self.headers.insert(n, v);
        Ok(())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_marked(&self) -> bool { self.marked }

    pub(crate) fn mark(&mut self) { self.marked = true; }
}

impl fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // header values can carry the session token
        let names: Vec<&str> = self.headers.keys().map(|k| k.as_str()).collect();
        f.debug_struct("OutboundRequest")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("headers", &names)
            .field("marked", &self.marked)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, headers: HeaderMap::new(), body }
    }

    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

    pub fn json<T: DeserializeOwned>(self) -> AppResult<T> {
        serde_json::from_value(self.body)
            .map_err(|e| AppError::decode("response_shape", e.to_string()))
    }
}

/// Response bodies are JSON when they parse, otherwise a JSON string of the raw text.
pub fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
