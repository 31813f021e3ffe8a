//! Single-backend forwarding engine.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the backend (scheme, authority, joined path)
//! - Strip hop-by-hop headers in both directions
//! - Stream request and response bodies without buffering
//! - Bound the TCP connect, TLS handshake and response-header wait by the
//!   route timeout
//!
//! # Design Decisions
//! - One engine (and one connection pool) per route
//! - Redirects are relayed, never followed
//! - Errors are returned to the caller for mapping to 502; their text is never
//!   sent downstream

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header::HOST, Request, Response, Uri, Version},
};
use thiserror::Error;
use tokio::time;
use url::{Position, Url};

use crate::proxy::client::{build_client, BackendClient, ClientError};
use crate::proxy::headers;

/// Errors raised while forwarding a request.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to build backend URI: {0}")]
    InvalidUri(#[from] axum::http::Error),

    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error("backend request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Transport timeouts for one route, all derived from its single timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTimeouts {
    /// TCP connect.
    pub connect: Duration,
    /// TLS handshake with an `https` backend.
    pub tls_handshake: Duration,
    /// From sending the request until the response headers arrive.
    pub response_header: Duration,
}

impl TransportTimeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            connect: timeout,
            tls_handshake: timeout,
            response_header: timeout,
        }
    }

    /// Deadline for one exchange: the handshake runs inside the header wait,
    /// so the longer of the two bounds both.
    fn exchange(&self) -> Duration {
        self.tls_handshake.max(self.response_header)
    }
}

/// Forwards requests to one fixed backend.
#[derive(Debug, Clone)]
pub struct ReverseProxy {
    target: Url,
    authority: String,
    timeouts: TransportTimeouts,
    client: BackendClient,
}

impl ReverseProxy {
    /// Create an engine for `target`, an absolute `http` or `https` URL with a host.
    pub fn new(target: Url, timeout: Duration) -> Result<Self, ClientError> {
        let timeouts = TransportTimeouts::uniform(timeout);
        let authority = target[Position::BeforeHost..Position::AfterPort].to_string();
        let client = build_client(timeouts.connect)?;

        Ok(Self {
            target,
            authority,
            timeouts,
            client,
        })
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn timeouts(&self) -> TransportTimeouts {
        self.timeouts
    }

    /// Map an inbound URI onto the backend.
    pub fn rewrite_uri(&self, uri: &Uri) -> Result<Uri, ForwardError> {
        let path = headers::join_path(self.target.path(), uri.path());
        let path_and_query = match headers::join_query(self.target.query(), uri.query()) {
            Some(query) => format!("{}?{}", path, query),
            None => path,
        };

        Ok(Uri::builder()
            .scheme(self.target.scheme())
            .authority(self.authority.as_str())
            .path_and_query(path_and_query)
            .build()?)
    }

    /// Forward `request` and return the backend's response, body still streaming.
    pub async fn forward(
        &self,
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = self.rewrite_uri(&parts.uri)?;
        parts.version = Version::HTTP_11;
        headers::strip_hop_by_hop(&mut parts.headers);
        // The client fills Host from the rewritten authority.
        if let Some(host) = parts.headers.remove(HOST) {
            headers::set_forwarded_host(&mut parts.headers, host);
        }
        if let Some(addr) = client_addr {
            headers::append_forwarded_for(&mut parts.headers, addr.ip());
        }

        let deadline = self.timeouts.exchange();
        let pending = self.client.request(Request::from_parts(parts, body));
        let response = time::timeout(deadline, pending)
            .await
            .map_err(|_| ForwardError::Timeout(deadline))??;

        let (mut parts, body) = response.into_parts();
        headers::strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
