//! hurrah: an HTTP API gateway.
//!
//! Requests are dispatched by path to one backend per route, run through a
//! per-route middleware pipeline, and forwarded by a streaming reverse proxy.
//! Routes with a health check path get a background liveness monitor.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
