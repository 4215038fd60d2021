//! Credential attachment and central handling of credential rejection.

use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::identity::SessionStore;

use super::events::{SessionEvent, SessionEvents, SESSION_EXPIRED_NOTICE};
use super::interceptor::{Outcome, RequestInterceptor, ResponseInterceptor};
use super::request::OutboundRequest;

/// Reads the store at send time and puts the token under the credential header.
pub struct CredentialInterceptor {
    store: SessionStore,
    header: String,
}

impl CredentialInterceptor {
    pub fn new(store: SessionStore, header: impl Into<String>) -> Self {
        Self { store, header: header.into() }
    }
}

impl RequestInterceptor for CredentialInterceptor {
    fn name(&self) -> &'static str { "credential" }

    fn before_send(&self, req: &mut OutboundRequest) -> AppResult<()> {
        let token = match self.store.token() {
            Ok(t) => t,
            Err(e) => {
                warn!(target: "pipeline", request_id = %req.id, error = %e, "session read failed; sending unauthenticated");
                None
            }
        };
        match token {
            Some(t) => req.set_header(&self.header, &t)?,
            None => {
                req.headers.remove(self.header.as_str());
            }
        }
        Ok(())
    }
}

/// Turns a 401 into session teardown.
///
/// For an unmarked request that carried a credential: mark it, clear the store, publish
/// `SessionEvent::Expired`. The caller always gets `SessionExpired` back and must not
/// expect data. A marked request never triggers teardown again. A 401 on a request sent
/// without a credential is an ordinary rejection (e.g. bad login) and is passed through
/// as `Rejected { status: 401 }`.
pub struct SessionExpiryInterceptor {
    store: SessionStore,
    events: SessionEvents,
    header: String,
    notice: String,
}

impl SessionExpiryInterceptor {
    pub fn new(store: SessionStore, events: SessionEvents, header: impl Into<String>) -> Self {
        Self { store, events, header: header.into(), notice: SESSION_EXPIRED_NOTICE.to_string() }
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = notice.into();
        self
    }

    fn teardown(&self, req: &OutboundRequest, sent_token: &str) {
        // a newer login must survive a late 401 for a token it already replaced
        match self.store.token() {
            Ok(Some(current)) if current == sent_token => {}
            Ok(_) => {
                info!(target: "pipeline", request_id = %req.id, "401 for a token no longer stored; teardown already done");
                return;
            }
            Err(e) => warn!(target: "pipeline", request_id = %req.id, error = %e, "session read failed during teardown"),
        }
        if let Err(e) = self.store.clear() {
            warn!(target: "pipeline", request_id = %req.id, error = %e, "failed to clear session after 401");
        }
        info!(target: "pipeline", request_id = %req.id, path = %req.path, "session expired; tearing down");
        self.events.publish(SessionEvent::Expired { notice: self.notice.clone(), request_id: req.id });
    }
}

impl ResponseInterceptor for SessionExpiryInterceptor {
    fn name(&self) -> &'static str { "session_expiry" }

    fn after_receive(&self, req: &mut OutboundRequest, outcome: Outcome) -> Outcome {
        let err = match outcome {
            Err(e) if e.is_session_expired() => e,
            other => return other,
        };
        if req.is_marked() {
            return Err(AppError::session_expired("session_expired", self.notice.clone()));
        }
        let sent_token = req.header(&self.header).map(|s| s.to_string());
        let Some(sent_token) = sent_token else {
            return Err(AppError::Rejected { code: "unauthorized".into(), message: err.message().to_string(), status: 401 });
        };
        req.mark();
        self.teardown(req, &sent_token);
        Err(AppError::session_expired("session_expired", self.notice.clone()))
    }
}
