use std::fmt;
use std::sync::Arc;

use crate::error::AppResult;
use crate::tprintln;

use super::claims::{decode_claims, Claims, Role};
use super::storage::{KeyValueStorage, MemoryStorage};

pub type SessionToken = String;

/// Storage key the bearer token lives under.
pub const TOKEN_KEY: &str = "token";

/// The logged-in principal as last written to storage.
///
/// `claims` is `None` when the token is present but cannot be decoded; such a session
/// still counts as authenticated but grants no role.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: SessionToken,
    pub claims: Option<Claims>,
}

impl Session {
    pub fn from_token(token: impl Into<SessionToken>) -> Self {
        let token = token.into();
        let claims = match decode_claims(&token) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::debug!(target: "session", error = %e, "token claims undecodable");
                None
            }
        };
        Self { token, claims }
    }

    pub fn role(&self) -> Option<Role> { self.claims.as_ref().map(|c| c.role) }

    pub fn subject_id(&self) -> Option<&str> { self.claims.as_ref().map(|c| c.subject_id.as_str()) }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("claims", &self.claims)
            .finish()
    }
}

/// Single owner of "who is logged in". Cloning shares the same backing storage.
///
/// The store caches nothing: every `get` reads storage, so a clear made through any handle
/// (or by another process sharing the file) is observed on the next read.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage, key: TOKEN_KEY.to_string() }
    }

    pub fn in_memory() -> Self { Self::new(Arc::new(MemoryStorage::new())) }

    pub fn get(&self) -> AppResult<Option<Session>> {
        Ok(self.token()?.map(Session::from_token))
    }

    /// Raw token without decoding. An empty stored value reads as absent.
    pub fn token(&self) -> AppResult<Option<SessionToken>> {
        Ok(self.storage.get_item(&self.key)?.filter(|t| !t.trim().is_empty()))
    }

    /// Overwrite whatever session exists.
    pub fn set(&self, token: &str) -> AppResult<()> {
        self.storage.set_item(&self.key, token)?;
        let s = Session::from_token(token);
        tprintln!("session.set subject={:?} role={:?}", s.subject_id(), s.role());
        Ok(())
    }

    pub fn clear(&self) -> AppResult<()> {
        self.storage.remove_item(&self.key)?;
        tprintln!("session.clear");
        Ok(())
    }

    /// Storage failures read as "not authenticated".
    pub fn is_authenticated(&self) -> bool {
        matches!(self.token(), Ok(Some(_)))
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").field("key", &self.key).finish()
    }
}
