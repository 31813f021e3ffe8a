//! Outbound HTTP(S) client shared by the forwarding engine and health monitors.
//!
//! One pooled client per route. Plain `http` backends use the TCP connection
//! as-is; `https` backends are wrapped in rustls with the webpki root store.
//! The connector bounds the TCP connect; callers bound the TLS handshake and
//! the response-header wait with their own deadline.

use std::time::Duration;

use axum::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

/// Pooled client able to reach `http` and `https` backends.
pub type BackendClient = Client<HttpsConnector<HttpConnector>, Body>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to configure TLS: {0}")]
    Tls(#[from] rustls::Error),
}

/// Build a client whose TCP connect is bounded by `connect_timeout`.
pub fn build_client(connect_timeout: Duration) -> Result<BackendClient, ClientError> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(connect_timeout));

    let https = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Ok(Client::builder(TokioExecutor::new()).build(https))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client() {
        assert!(build_client(Duration::from_secs(1)).is_ok());
    }
}
