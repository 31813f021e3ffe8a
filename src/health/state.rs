//! Backend health state.
//!
//! # States
//! - Unknown: no probe has completed yet
//! - Up: last probe returned 200
//! - Down: last probe failed
//!
//! Owned by a single monitor task; never shared.

use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Unknown,
    Up,
    Down,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Unknown => "unknown",
            Status::Up => "up",
            Status::Down => "down",
        })
    }
}

/// A change of status caused by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Status,
    pub to: Status,
}

/// Last probe outcome for one backend.
#[derive(Debug, Clone)]
pub struct HealthState {
    status: Status,
    last_probe: Option<Instant>,
    probes: u64,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            status: Status::Unknown,
            last_probe: None,
            probes: 0,
        }
    }

    /// Record a probe outcome, returning the transition if the status changed.
    pub fn record(&mut self, healthy: bool, at: Instant) -> Option<Transition> {
        let to = if healthy { Status::Up } else { Status::Down };
        let from = std::mem::replace(&mut self.status, to);
        self.last_probe = Some(at);
        self.probes += 1;

        (from != to).then_some(Transition { from, to })
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn last_probe(&self) -> Option<Instant> {
        self.last_probe
    }

    pub fn probes(&self) -> u64 {
        self.probes
    }
}
