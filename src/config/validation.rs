//! Configuration validation.
//!
//! Serde handles syntax; this module handles semantics. Backend URLs must be
//! absolute `http` or `https` URLs with a host and well-formed userinfo. Route
//! paths must be unique patterns that start with `/`. Health check paths must
//! resolve against their backend.
//! All errors are collected so a broken config is reported in one pass.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, RouteConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("route path {path:?} must start with '/'")]
    InvalidPath { path: String },

    #[error("route path {path:?} is declared more than once")]
    DuplicatePath { path: String },

    #[error("route {path:?}: invalid backend URL {backend:?}: {reason}")]
    InvalidBackend {
        path: String,
        backend: String,
        reason: String,
    },

    #[error("route {path:?}: invalid health check path {health_check_path:?}: {reason}")]
    InvalidHealthCheck {
        path: String,
        health_check_path: String,
        reason: String,
    },

    #[error("invalid metrics address {address:?}: {reason}")]
    InvalidMetricsAddress { address: String, reason: String },
}

/// Validate the whole configuration, returning every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(address) = &config.server.metrics_address {
        if let Err(e) = address.parse::<SocketAddr>() {
            errors.push(ValidationError::InvalidMetricsAddress {
                address: address.clone(),
                reason: e.to_string(),
            });
        }
    }

    errors.extend(validate_routes(&config.routes));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate route entries, returning every error found.
pub fn validate_routes(routes: &[RouteConfig]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for route in routes {
        if !route.path.starts_with('/') {
            errors.push(ValidationError::InvalidPath {
                path: route.path.clone(),
            });
        }
        if !seen.insert(route.path.as_str()) {
            errors.push(ValidationError::DuplicatePath {
                path: route.path.clone(),
            });
        }

        match parse_backend(route) {
            Ok(backend) => {
                if let Some(health_check_path) = &route.health_check_path {
                    if let Err(e) = resolve_health_check(&route.path, &backend, health_check_path) {
                        errors.push(e);
                    }
                }
            }
            Err(e) => errors.push(e),
        }
    }

    errors
}

/// Schemes the outbound client can reach.
const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

/// Parse a route's backend into an absolute `http(s)` URL with a host.
pub fn parse_backend(route: &RouteConfig) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidBackend {
        path: route.path.clone(),
        backend: route.backend.clone(),
        reason,
    };

    // The URL parser percent-encodes bad userinfo instead of failing.
    if let Some(userinfo) = raw_userinfo(&route.backend) {
        if let Some(c) = userinfo.chars().find(|c| !is_userinfo_char(*c)) {
            return Err(invalid(format!("invalid character {c:?} in userinfo")));
        }
    }

    let url = Url::parse(&route.backend).map_err(|e| invalid(e.to_string()))?;
    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// Resolve a health check path against the backend URL.
///
/// Relative references resolve the way a browser would (`/health` replaces the
/// backend path, `health` replaces its last segment); absolute URLs are used
/// as-is but must still be `http`.
pub fn resolve_health_check(
    route_path: &str,
    backend: &Url,
    health_check_path: &str,
) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidHealthCheck {
        path: route_path.to_string(),
        health_check_path: health_check_path.to_string(),
        reason,
    };

    if health_check_path.is_empty() {
        return Err(invalid("empty path".to_string()));
    }
    let url = backend
        .join(health_check_path)
        .map_err(|e| invalid(e.to_string()))?;
    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    Ok(url)
}

/// The userinfo of `scheme://userinfo@host...` exactly as written.
fn raw_userinfo(raw: &str) -> Option<&str> {
    let (_, rest) = raw.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    authority.rsplit_once('@').map(|(userinfo, _)| userinfo)
}

/// RFC 3986 userinfo characters (unreserved, sub-delims, ':' and escapes).
fn is_userinfo_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-._~!$&'()*+,;=:%@".contains(c)
}
