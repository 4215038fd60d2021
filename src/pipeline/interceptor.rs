use std::sync::Arc;

use crate::error::AppResult;

use super::request::{ApiResponse, OutboundRequest};

/// What a sent request resolved to: a 2xx response or a classified error.
pub type Outcome = AppResult<ApiResponse>;

pub trait RequestInterceptor: Send + Sync {
    fn name(&self) -> &'static str;
    fn before_send(&self, req: &mut OutboundRequest) -> AppResult<()>;
}

pub trait ResponseInterceptor: Send + Sync {
    fn name(&self) -> &'static str;
    fn after_receive(&self, req: &mut OutboundRequest, outcome: Outcome) -> Outcome;
}

/// Ordered pre- and post-hooks. Both lists run in insertion order; a failing pre-hook
/// stops the chain and the request is never sent.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    pre: Vec<Arc<dyn RequestInterceptor>>,
    post: Vec<Arc<dyn ResponseInterceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self { Self::default() }

    pub fn with_request(mut self, hook: Arc<dyn RequestInterceptor>) -> Self {
        self.pre.push(hook);
        self
    }

    pub fn with_response(mut self, hook: Arc<dyn ResponseInterceptor>) -> Self {
        self.post.push(hook);
        self
    }

    pub fn run_request(&self, req: &mut OutboundRequest) -> AppResult<()> {
        for hook in &self.pre {
            hook.before_send(req)?;
        }
        Ok(())
    }

    pub fn run_response(&self, req: &mut OutboundRequest, outcome: Outcome) -> Outcome {
        self.post.iter().fold(outcome, |acc, hook| hook.after_receive(req, acc))
    }

    pub fn request_hooks(&self) -> Vec<&'static str> { self.pre.iter().map(|h| h.name()).collect() }

    pub fn response_hooks(&self) -> Vec<&'static str> { self.post.iter().map(|h| h.name()).collect() }
}
