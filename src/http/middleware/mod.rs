//! Middleware pipeline.
//!
//! A pipeline is a terminal [`Handler`] wrapped by an ordered list of
//! [`Middleware`] stages. Binding stages `[M1, M2, .., Mn]` around `H` yields
//! `M1(M2(..Mn(H)))`: `M1` runs first on the way in and last on the way out.
//!
//! # Error contract
//! ```text
//! stage returns Err  → every outer stage sees the Err and returns it unchanged
//!                    → respond() logs it once
//!                    → 500 if nothing was committed, committed response otherwise
//! ```
//! Stages never write error responses themselves; only [`respond`] does.

pub mod access_log;
pub mod basic_auth;

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::routing::RouteSpec;

pub use access_log::AccessLog;
pub use basic_auth::BasicAuth;

/// Error returned by a pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("a response was already committed")]
    AlreadyCommitted,

    #[error("{stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl PipelineError {
    /// Wrap an arbitrary error raised by the named stage.
    pub fn stage(
        stage: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Stage {
            stage,
            source: source.into(),
        }
    }
}

/// Per-request values visible to every stage.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id (`x-request-id`).
    pub request_id: String,
    /// The route the request was dispatched to.
    pub route: Arc<RouteSpec>,
    /// Peer address of the inbound connection, when known.
    pub client_addr: Option<SocketAddr>,
    /// When dispatch started.
    pub started: Instant,
}

impl RequestContext {
    pub fn new(
        request_id: impl Into<String>,
        route: Arc<RouteSpec>,
        client_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            route,
            client_addr,
            started: Instant::now(),
        }
    }
}

/// Single-slot response writer shared by the stages of one request.
#[derive(Default)]
pub struct ResponseSink {
    response: Option<Response>,
}

impl fmt::Debug for ResponseSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSink")
            .field("status", &self.status())
            .finish()
    }
}

impl ResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit the response for this request. Only the first commit wins.
    pub fn commit(&mut self, response: Response) -> Result<(), PipelineError> {
        if self.response.is_some() {
            return Err(PipelineError::AlreadyCommitted);
        }
        self.response = Some(response);
        Ok(())
    }

    pub fn is_committed(&self) -> bool {
        self.response.is_some()
    }

    /// Status of the committed response, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(Response::status)
    }

    fn into_response(self) -> Option<Response> {
        self.response
    }
}

/// A request-handling stage: `(context, sink, request) -> Result`.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        ctx: &RequestContext,
        sink: &mut ResponseSink,
        request: Request<Body>,
    ) -> Result<(), PipelineError>;
}

/// A handler shared between the stages that wrap it.
pub type SharedHandler = Arc<dyn Handler>;

/// Wraps a handler with cross-cutting behavior.
pub trait Middleware: Send + Sync {
    /// Short stage name for logs and errors.
    fn name(&self) -> &'static str;

    /// Return a handler that runs this stage around `next`.
    fn wrap(&self, next: SharedHandler) -> SharedHandler;
}

/// An ordered, read-only list of middleware stages.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stages: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; it runs inside every stage added before it.
    pub fn with(mut self, stage: impl Middleware + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Append every stage of `other`, preserving its order.
    pub fn extend(&mut self, other: &MiddlewareChain) {
        self.stages.extend(other.stages.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Fold the stages around `terminal`, first stage outermost.
    pub fn bind(&self, terminal: SharedHandler) -> SharedHandler {
        self.stages
            .iter()
            .rev()
            .fold(terminal, |next, stage| stage.wrap(next))
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Run a bound pipeline and turn its outcome into the HTTP response.
///
/// This is the only place a pipeline error becomes a response.
pub async fn respond(
    handler: &dyn Handler,
    ctx: &RequestContext,
    request: Request<Body>,
) -> Response {
    let mut sink = ResponseSink::new();
    let result = handler.handle(ctx, &mut sink, request).await;

    match (result, sink.into_response()) {
        (Ok(()), Some(response)) => response,
        (Ok(()), None) => StatusCode::OK.into_response(),
        (Err(e), committed) => {
            tracing::error!(
                request_id = %ctx.request_id,
                route = %ctx.route.path,
                committed = committed.is_some(),
                error = %e,
                "Failed to handle the request"
            );
            committed.unwrap_or_else(|| {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use std::sync::Mutex;

    pub(crate) fn test_context() -> RequestContext {
        let spec = RouteSpec::from_config(&RouteConfig::new("/svc", "http://127.0.0.1:9")).unwrap();
        RequestContext::new("test-id", Arc::new(spec), None)
    }

    pub(crate) fn request() -> Request<Body> {
        Request::builder().uri("/svc").body(Body::empty()).unwrap()
    }

    pub(crate) type Log = Arc<Mutex<Vec<String>>>;

    struct Record {
        label: &'static str,
        log: Log,
    }

    struct RecordHandler {
        label: &'static str,
        log: Log,
        next: SharedHandler,
    }

    impl Middleware for Record {
        fn name(&self) -> &'static str {
            self.label
        }

        fn wrap(&self, next: SharedHandler) -> SharedHandler {
            Arc::new(RecordHandler {
                label: self.label,
                log: self.log.clone(),
                next,
            })
        }
    }

    #[async_trait]
    impl Handler for RecordHandler {
        async fn handle(
            &self,
            ctx: &RequestContext,
            sink: &mut ResponseSink,
            request: Request<Body>,
        ) -> Result<(), PipelineError> {
            self.log.lock().unwrap().push(format!("{}-pre", self.label));
            let result = self.next.handle(ctx, sink, request).await;
            self.log.lock().unwrap().push(format!("{}-post", self.label));
            result
        }
    }

    /// Terminal handler that records its call and commits `status`.
    pub(crate) struct Terminal {
        pub log: Log,
        pub status: StatusCode,
        pub fail_after_commit: bool,
    }

    impl Terminal {
        pub(crate) fn new(log: Log) -> Self {
            Self {
                log,
                status: StatusCode::OK,
                fail_after_commit: false,
            }
        }
    }

    #[async_trait]
    impl Handler for Terminal {
        async fn handle(
            &self,
            _ctx: &RequestContext,
            sink: &mut ResponseSink,
            _request: Request<Body>,
        ) -> Result<(), PipelineError> {
            self.log.lock().unwrap().push("H".to_string());
            sink.commit(self.status.into_response())?;
            if self.fail_after_commit {
                return Err(PipelineError::stage("terminal", "stream broke"));
            }
            Ok(())
        }
    }

    struct Fail;

    struct FailHandler;

    impl Middleware for Fail {
        fn name(&self) -> &'static str {
            "fail"
        }

        fn wrap(&self, _next: SharedHandler) -> SharedHandler {
            Arc::new(FailHandler)
        }
    }

    #[async_trait]
    impl Handler for FailHandler {
        async fn handle(
            &self,
            _ctx: &RequestContext,
            _sink: &mut ResponseSink,
            _request: Request<Body>,
        ) -> Result<(), PipelineError> {
            Err(PipelineError::stage("fail", "boom"))
        }
    }

    #[tokio::test]
    async fn test_onion_ordering() {
        let log: Log = Arc::default();
        let chain = MiddlewareChain::new()
            .with(Record { label: "A", log: log.clone() })
            .with(Record { label: "B", log: log.clone() });
        let handler = chain.bind(Arc::new(Terminal::new(log.clone())));

        let response = respond(handler.as_ref(), &test_context(), request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *log.lock().unwrap(),
            ["A-pre", "B-pre", "H", "B-post", "A-post"]
        );
        assert_eq!(chain.names(), ["A", "B"]);
    }

    #[tokio::test]
    async fn test_empty_chain_is_terminal() {
        let log: Log = Arc::default();
        let handler = MiddlewareChain::new().bind(Arc::new(Terminal::new(log.clone())));

        let response = respond(handler.as_ref(), &test_context(), request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), ["H"]);
    }

    #[tokio::test]
    async fn test_error_before_commit_is_500() {
        let log: Log = Arc::default();
        let chain = MiddlewareChain::new()
            .with(Record { label: "A", log: log.clone() })
            .with(Fail);
        let handler = chain.bind(Arc::new(Terminal::new(log.clone())));

        let response = respond(handler.as_ref(), &test_context(), request()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(*log.lock().unwrap(), ["A-pre", "A-post"]);
    }

    #[tokio::test]
    async fn test_error_after_commit_keeps_response() {
        let log: Log = Arc::default();
        let terminal = Terminal {
            log: log.clone(),
            status: StatusCode::ACCEPTED,
            fail_after_commit: true,
        };
        let handler = MiddlewareChain::new()
            .with(Record { label: "A", log: log.clone() })
            .bind(Arc::new(terminal));

        let response = respond(handler.as_ref(), &test_context(), request()).await;

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(*log.lock().unwrap(), ["A-pre", "H", "A-post"]);
    }

    #[test]
    fn test_sink_accepts_single_commit() {
        let mut sink = ResponseSink::new();
        assert!(!sink.is_committed());
        sink.commit(StatusCode::CREATED.into_response()).unwrap();
        assert!(matches!(
            sink.commit(StatusCode::OK.into_response()),
            Err(PipelineError::AlreadyCommitted)
        ));
        assert_eq!(sink.status(), Some(StatusCode::CREATED));
    }
}
