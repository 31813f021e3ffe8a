//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Per route with a health_check_path (active.rs):
//!     Interval tick
//!     → GET backend health URL (bounded by the route timeout)
//!     → state.rs (Unknown / Up / Down, task-local)
//!     → logs + metrics
//! ```
//!
//! # Design Decisions
//! - One task per route; no state is shared with the request path
//! - Results are observational only; routing never consults them
//! - Stops on the shutdown broadcast, never mid-probe

pub mod active;
pub mod state;

pub use active::{HealthMonitor, MonitorError, ProbeError};
pub use state::{HealthState, Status, Transition};
