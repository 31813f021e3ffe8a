//! Terminal pipeline stage that forwards to the route's backend.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::IntoResponse,
};

use crate::http::middleware::{Handler, PipelineError, RequestContext, ResponseSink};
use crate::proxy::ReverseProxy;

/// Forwards the request and commits the backend response, or 502 on failure.
#[derive(Debug, Clone)]
pub struct ProxyHandler {
    proxy: Arc<ReverseProxy>,
}

impl ProxyHandler {
    pub fn new(proxy: Arc<ReverseProxy>) -> Self {
        Self { proxy }
    }
}

#[async_trait]
impl Handler for ProxyHandler {
    async fn handle(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: Request<Body>,
    ) -> Result<(), PipelineError> {
        let response = match self.proxy.forward(request, ctx.client_addr).await {
            Ok(response) => response.into_response(),
            Err(e) => {
                tracing::error!(
                    request_id = %ctx.request_id,
                    route = %ctx.route.path,
                    backend = %self.proxy.target(),
                    error = %e,
                    detail = ?e,
                    "Failed to forward request"
                );
                StatusCode::BAD_GATEWAY.into_response()
            }
        };
        sink.commit(response)
    }
}
