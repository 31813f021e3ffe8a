//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route compilation (at startup):
//!     RouteConfig[]
//!     → table.rs (validate → RouteSpec, reject the whole batch on any error)
//!     → dispatcher.rs (one ProxyBinding per RouteSpec, pipeline bound once)
//!     → frozen, shared via Arc
//!
//! Incoming request (path)
//!     → dispatcher.rs (exact / longest subtree lookup)
//!     → matched binding, trailing-slash redirect, or NotFound
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Duplicate paths are a startup error, never a silent overwrite
//! - Deterministic: same path always dispatches to the same binding

pub mod dispatcher;
pub mod table;

pub use dispatcher::{Dispatch, Dispatcher, ProxyBinding};
pub use table::{RouteSpec, RouteTable};
