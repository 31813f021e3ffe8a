//! Route table construction.
//!
//! # Responsibilities
//! - Turn raw route entries into typed, validated `RouteSpec`s
//! - Refuse to build when any entry is invalid (no partial route sets)
//!
//! # Design Decisions
//! - Immutable after construction; shared via `Arc` without locks
//! - Declaration order is preserved for logging

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::config::schema::{
    BasicAuthConfig, RouteConfig, DEFAULT_HEALTH_CHECK_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS,
};
use crate::config::validation::{parse_backend, resolve_health_check, validate_routes};
use crate::config::{ConfigError, ValidationError};

/// A validated route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSpec {
    /// Path pattern, unique within the table.
    pub path: String,
    /// Absolute backend URL.
    pub backend: Url,
    /// Bound for every outbound call made on behalf of this route.
    pub timeout: Duration,
    /// Health check path, resolved against `backend` when the monitor starts.
    pub health_check_path: Option<String>,
    /// Interval between health probes.
    pub health_check_interval: Duration,
    /// Credentials for the basic-auth stage.
    pub basic_auth: Option<BasicAuthConfig>,
}

impl RouteSpec {
    /// Build a spec from a single route entry.
    pub fn from_config(config: &RouteConfig) -> Result<Self, ValidationError> {
        if !config.path.starts_with('/') {
            return Err(ValidationError::InvalidPath {
                path: config.path.clone(),
            });
        }
        let backend = parse_backend(config)?;

        let timeout = match config.timeout {
            Some(secs) if secs > 0 => secs,
            _ => DEFAULT_TIMEOUT_SECS,
        };
        let interval = match config.health_check_interval {
            Some(secs) if secs > 0 => secs,
            _ => DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
        };

        Ok(Self {
            path: config.path.clone(),
            backend,
            timeout: Duration::from_secs(timeout),
            health_check_path: config.health_check_path.clone(),
            health_check_interval: Duration::from_secs(interval),
            basic_auth: config.basic_auth.clone(),
        })
    }

    /// Whether a health monitor should run for this route.
    pub fn health_check_enabled(&self) -> bool {
        self.health_check_path.is_some()
    }

    /// The absolute health check URL, if one is configured.
    pub fn health_check_url(&self) -> Option<Result<Url, ValidationError>> {
        self.health_check_path
            .as_deref()
            .map(|p| resolve_health_check(&self.path, &self.backend, p))
    }
}

/// The immutable set of routes served by the gateway.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<RouteSpec>>,
}

impl RouteTable {
    /// Build the table from route entries.
    ///
    /// Every entry is validated; any error fails the whole build.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, ConfigError> {
        let errors = validate_routes(routes);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        let routes = routes
            .iter()
            .map(|r| RouteSpec::from_config(r).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::Validation(vec![e]))?;

        Ok(Self { routes })
    }

    /// Routes in declaration order.
    pub fn routes(&self) -> &[Arc<RouteSpec>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
