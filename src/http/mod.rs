//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id + trace layers)
//!     → routing::Dispatcher (path → ProxyBinding)
//!     → middleware/ (access log → basic auth → extra stages)
//!     → proxy::ProxyHandler (forward, or 502)
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;

use axum::http::HeaderName;

/// Correlation header set on inbound requests and echoed on responses.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub use server::GatewayServer;
