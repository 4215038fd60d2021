//! Authenticated request pipeline.
//!
//! Every backend call goes through `Pipeline::execute`: request interceptors enrich the
//! request (credential header), the transport sends it, the status is classified, and
//! response interceptors react (session teardown on 401). Screens never touch auth.

mod auth;
mod events;
mod interceptor;
mod request;
mod transport;

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::identity::SessionStore;

pub use auth::{CredentialInterceptor, SessionExpiryInterceptor};
pub use events::{SessionEvent, SessionEvents, SESSION_EXPIRED_NOTICE};
pub use interceptor::{InterceptorChain, Outcome, RequestInterceptor, ResponseInterceptor};
pub use request::{parse_body, ApiResponse, OutboundRequest};
pub use transport::{FnTransport, HttpTransport, Transport};

pub struct Pipeline<T: Transport> {
    transport: T,
    chain: InterceptorChain,
}

impl<T: Transport> Pipeline<T> {
    pub fn new(transport: T, chain: InterceptorChain) -> Self {
        Self { transport, chain }
    }

    /// Standard chain: attach the credential, then react to credential rejection.
    pub fn with_session(transport: T, store: SessionStore, events: SessionEvents, header: &str) -> Self {
        let chain = InterceptorChain::new()
            .with_request(Arc::new(CredentialInterceptor::new(store.clone(), header)))
            .with_response(Arc::new(SessionExpiryInterceptor::new(store, events, header)));
        Self::new(transport, chain)
    }

    pub fn chain(&self) -> &InterceptorChain { &self.chain }

    pub fn transport(&self) -> &T { &self.transport }

    pub async fn execute(&self, mut req: OutboundRequest) -> AppResult<ApiResponse> {
        self.dispatch(&mut req).await
    }

    /// Like `execute` but leaves the request with the caller, so a resend of the same
    /// request keeps its single-shot teardown mark.
    pub async fn dispatch(&self, req: &mut OutboundRequest) -> AppResult<ApiResponse> {
        self.chain.run_request(req)?;
        let started = Instant::now();
        let sent = self.transport.send(req).await;
        let outcome = classify(sent);
        let status = match &outcome {
            Ok(r) => Some(r.status),
            Err(e) => e.http_status(),
        };
        debug!(
            target: "pipeline",
            request_id = %req.id,
            method = %req.method,
            path = %req.path,
            status = ?status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        self.chain.run_response(req, outcome)
    }

    pub async fn json<R: DeserializeOwned>(&self, req: OutboundRequest) -> AppResult<R> {
        self.execute(req).await?.json()
    }
}

fn classify(sent: AppResult<ApiResponse>) -> Outcome {
    match sent {
        Ok(resp) if resp.is_success() => Ok(resp),
        Ok(resp) => Err(AppError::from_status(resp.status, &resp.body)),
        Err(e) => Err(e),
    }
}
