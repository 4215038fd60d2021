use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Url;

use crate::config::ClientConfig;
use crate::error::{AppError, AppResult};

use super::request::{parse_body, ApiResponse, OutboundRequest};

/// Sends one request and reports whatever status came back. Only a missing response is an
/// error here; status classification happens in the pipeline.
pub trait Transport: Send + Sync {
    fn send(&self, req: &OutboundRequest) -> impl Future<Output = AppResult<ApiResponse>> + Send;
}

#[derive(Clone)]
pub struct HttpTransport {
    base: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(cfg: &ClientConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| AppError::config("http_client", e.to_string()))?;
        Ok(Self { base: cfg.base_url.clone(), client })
    }

    pub fn base(&self) -> &Url { &self.base }

    /// Appends `path` to the base URL, keeping any path prefix the base carries.
    pub fn url_for(&self, path: &str) -> AppResult<Url> {
        let joined = format!("{}{}", self.base.as_str().trim_end_matches('/'), path);
        Url::parse(&joined).map_err(|e| AppError::internal("bad_url", format!("{}: {}", joined, e)))
    }
}

impl Transport for HttpTransport {
    async fn send(&self, req: &OutboundRequest) -> AppResult<ApiResponse> {
        let url = self.url_for(&req.path)?;
        let mut builder = self.client.request(req.method.clone(), url).headers(req.headers.clone());
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await?;
        Ok(ApiResponse { status, headers, body: parse_body(&bytes) })
    }
}

type Responder = dyn Fn(&OutboundRequest) -> AppResult<ApiResponse> + Send + Sync;

/// In-process transport answering from a closure and recording every request it saw.
#[derive(Clone)]
pub struct FnTransport {
    responder: Arc<Responder>,
    seen: Arc<Mutex<Vec<OutboundRequest>>>,
}

impl FnTransport {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&OutboundRequest) -> AppResult<ApiResponse> + Send + Sync + 'static,
    {
        Self { responder: Arc::new(f), seen: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn seen(&self) -> Vec<OutboundRequest> { self.seen.lock().clone() }
}

impl Transport for FnTransport {
    async fn send(&self, req: &OutboundRequest) -> AppResult<ApiResponse> {
        self.seen.lock().push(req.clone());
        tokio::task::yield_now().await;
        (self.responder)(req)
    }
}
