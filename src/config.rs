//! Client configuration. Values come from `PWLIB_*` environment variables with defaults,
//! and the CLI overrides individual fields from flags.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::{AppError, AppResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TOKEN_HEADER: &str = "x-auth-token";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const LOGIN_PATH: &str = "/login";
pub const LANDING_PATH: &str = "/app/book-list";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub state_dir: PathBuf,
    pub token_header: String,
    pub timeout: Duration,
    pub login_path: String,
    pub landing_path: String,
}

impl ClientConfig {
    pub fn new(base_url: &str, state_dir: PathBuf) -> AppResult<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            state_dir,
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            login_path: LOGIN_PATH.to_string(),
            landing_path: LANDING_PATH.to_string(),
        })
    }

    pub fn from_env() -> AppResult<Self> {
        let base = std::env::var("PWLIB_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let state_dir = std::env::var("PWLIB_STATE_DIR").map(PathBuf::from).unwrap_or_else(|_| default_state_dir());
        let mut cfg = Self::new(&base, state_dir)?;
        if let Ok(h) = std::env::var("PWLIB_TOKEN_HEADER") {
            cfg = cfg.with_token_header(&h)?;
        }
        if let Ok(t) = std::env::var("PWLIB_TIMEOUT_SECS") {
            let secs: u64 = t.trim().parse()
                .map_err(|_| AppError::config("bad_timeout", format!("PWLIB_TIMEOUT_SECS is not a number: {}", t)))?;
            cfg.timeout = Duration::from_secs(secs);
        }
        Ok(cfg)
    }

    pub fn with_base_url(mut self, base: &str) -> AppResult<Self> {
        self.base_url = parse_base_url(base)?;
        Ok(self)
    }

    pub fn with_state_dir(mut self, dir: PathBuf) -> Self {
        self.state_dir = dir;
        self
    }

    pub fn with_token_header(mut self, name: &str) -> AppResult<Self> {
        let name = name.trim().to_ascii_lowercase();
        reqwest::header::HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| AppError::config("bad_header", format!("invalid credential header name: {}", name)))?;
        self.token_header = name;
        Ok(self)
    }

    /// Storage key scope: one durable namespace per backend origin.
    pub fn origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }
}

fn parse_base_url(base: &str) -> AppResult<Url> {
    let url = Url::parse(base.trim())
        .map_err(|e| AppError::config("bad_base_url", format!("invalid base URL '{}': {}", base, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::config("bad_scheme", format!("unsupported URL scheme: {}", other))),
    }
}

fn default_state_dir() -> PathBuf {
    let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")).ok();
    match home {
        Some(h) => PathBuf::from(h).join(".pwlibrary"),
        None => PathBuf::from(".pwlibrary"),
    }
}
