//! Path dispatch to per-route pipelines.
//!
//! # Matching
//! - A pattern ending in `/` matches its whole subtree (`/api/` matches `/api/x/y`)
//! - Any other pattern matches only the identical path
//! - The longest matching pattern wins
//! - `/api` with only `/api/` registered is redirected to `/api/`
//!
//! # Design Decisions
//! - Bindings are built once and never mutated (no locks on the request path)
//! - Subtree patterns are pre-sorted longest first; lookups are O(1) for exact
//!   paths and O(n) otherwise

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response};

use crate::http::middleware::{
    self, AccessLog, BasicAuth, MiddlewareChain, RequestContext, SharedHandler,
};
use crate::http::X_REQUEST_ID;
use crate::proxy::{ClientError, ProxyHandler, ReverseProxy};
use crate::routing::table::{RouteSpec, RouteTable};

/// A route wired to its forwarding engine and middleware pipeline.
pub struct ProxyBinding {
    spec: Arc<RouteSpec>,
    proxy: Arc<ReverseProxy>,
    chain: MiddlewareChain,
    handler: SharedHandler,
}

impl ProxyBinding {
    /// Build the engine for `spec` and bind its pipeline.
    ///
    /// Stage order: access log, basic auth (when configured), then `extra`.
    pub fn new(spec: Arc<RouteSpec>, extra: &MiddlewareChain) -> Result<Self, ClientError> {
        let proxy = Arc::new(ReverseProxy::new(spec.backend.clone(), spec.timeout)?);

        let mut chain = MiddlewareChain::new().with(AccessLog);
        if let Some(auth) = &spec.basic_auth {
            chain = chain.with(BasicAuth::new(auth));
        }
        chain.extend(extra);

        let handler = chain.bind(Arc::new(ProxyHandler::new(proxy.clone())));

        Ok(Self {
            spec,
            proxy,
            chain,
            handler,
        })
    }

    pub fn spec(&self) -> &Arc<RouteSpec> {
        &self.spec
    }

    pub fn proxy(&self) -> &ReverseProxy {
        &self.proxy
    }

    pub fn chain(&self) -> &MiddlewareChain {
        &self.chain
    }

    /// Run the bound pipeline for one request.
    pub async fn serve(&self, request: Request<Body>, client_addr: Option<SocketAddr>) -> Response {
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let ctx = RequestContext::new(request_id, self.spec.clone(), client_addr);
        middleware::respond(self.handler.as_ref(), &ctx, request).await
    }
}

impl std::fmt::Debug for ProxyBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyBinding")
            .field("path", &self.spec.path)
            .field("backend", &self.spec.backend.as_str())
            .field("chain", &self.chain)
            .finish()
    }
}

/// Result of looking up a request path.
#[derive(Debug)]
pub enum Dispatch<'a> {
    Matched(&'a ProxyBinding),
    /// Redirect target (path plus query) for a missing trailing slash.
    Redirect(String),
    NotFound,
}

/// Maps request paths to route bindings.
#[derive(Debug, Default)]
pub struct Dispatcher {
    bindings: Vec<Arc<ProxyBinding>>,
    exact: HashMap<String, usize>,
    /// Subtree patterns, longest first.
    subtrees: Vec<(String, usize)>,
}

impl Dispatcher {
    /// Bind every route of `table`, appending `extra` stages to each pipeline.
    pub fn new(table: &RouteTable, extra: &MiddlewareChain) -> Result<Self, ClientError> {
        let mut dispatcher = Self::default();

        for spec in table.routes() {
            let index = dispatcher.bindings.len();
            if spec.path.ends_with('/') {
                dispatcher.subtrees.push((spec.path.clone(), index));
            } else {
                dispatcher.exact.insert(spec.path.clone(), index);
            }
            dispatcher
                .bindings
                .push(Arc::new(ProxyBinding::new(spec.clone(), extra)?));
        }

        dispatcher
            .subtrees
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        Ok(dispatcher)
    }

    /// Find the binding whose pattern best matches `path`.
    pub fn lookup(&self, path: &str) -> Option<&ProxyBinding> {
        let index = self.exact.get(path).copied().or_else(|| {
            self.subtrees
                .iter()
                .find(|(pattern, _)| path.starts_with(pattern.as_str()))
                .map(|(_, index)| *index)
        })?;
        Some(&self.bindings[index])
    }

    /// Look up `path`, redirecting to `path/` when only the subtree is registered.
    ///
    /// The redirect takes precedence over shorter subtree matches, so `/static`
    /// goes to `/static/` even when `/` is registered.
    pub fn dispatch(&self, path: &str, query: Option<&str>) -> Dispatch<'_> {
        if !self.exact.contains_key(path) {
            let with_slash = format!("{}/", path);
            if self.subtrees.iter().any(|(pattern, _)| *pattern == with_slash) {
                return Dispatch::Redirect(match query {
                    Some(q) => format!("{}?{}", with_slash, q),
                    None => with_slash,
                });
            }
        }

        match self.lookup(path) {
            Some(binding) => Dispatch::Matched(binding),
            None => Dispatch::NotFound,
        }
    }

    /// All bindings in declaration order.
    pub fn bindings(&self) -> &[Arc<ProxyBinding>] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
