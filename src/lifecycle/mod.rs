//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build route table → Report → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Stop accepting + stop health monitors → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener starts last (traffic only when every route is bound)

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
