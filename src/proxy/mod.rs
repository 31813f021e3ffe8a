//! Reverse proxy subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline terminal stage (handler.rs)
//!     → engine.rs (rewrite URI, strip hop-by-hop, forward under timeout)
//!     → backend
//!     → engine.rs (strip hop-by-hop, stream body back)
//!     → handler.rs (commit response, or 502 on ForwardError)
//! ```

pub mod client;
pub mod engine;
pub mod handler;
pub mod headers;

pub use client::{build_client, BackendClient, ClientError};
pub use engine::{ForwardError, ReverseProxy, TransportTimeouts};
pub use handler::ProxyHandler;
