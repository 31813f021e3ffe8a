//! Access logging stage.
//!
//! Outermost stage on every route. Logs one event per request once the inner
//! stages return, and records the request metrics.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{body::Body, http::Request};

use crate::http::middleware::{
    Handler, Middleware, PipelineError, RequestContext, ResponseSink, SharedHandler,
};
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLog;

impl Middleware for AccessLog {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn wrap(&self, next: SharedHandler) -> SharedHandler {
        Arc::new(AccessLogHandler { next })
    }
}

struct AccessLogHandler {
    next: SharedHandler,
}

#[async_trait]
impl Handler for AccessLogHandler {
    async fn handle(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: Request<Body>,
    ) -> Result<(), PipelineError> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let result = self.next.handle(ctx, sink, request).await;

        // Mirrors what respond() will send for an uncommitted sink.
        let status = match (sink.status(), &result) {
            (Some(status), _) => status.as_u16(),
            (None, Ok(())) => 200,
            (None, Err(_)) => 500,
        };
        let elapsed = ctx.started.elapsed();

        tracing::debug!(
            request_id = %ctx.request_id,
            route = %ctx.route.path,
            method = %method,
            path = %path,
            status,
            latency_ms = elapsed.as_millis() as u64,
            "Request completed"
        );
        metrics::record_request(&ctx.route.path, status, elapsed);

        result
    }
}
