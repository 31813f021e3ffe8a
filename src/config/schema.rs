//! Configuration schema definitions.
//!
//! This module defines the on-disk configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default per-route timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default interval between health probes in seconds.
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 1;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Server-level settings.
    pub server: ServerConfig,

    /// Route definitions, in declaration order.
    pub routes: Vec<RouteConfig>,
}

/// Server-level settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind (without port).
    pub bind_address: String,

    /// Port to listen on.
    pub port: u16,

    /// Emit debug-level logs.
    pub debug: bool,

    /// Log output format.
    pub log_format: LogFormat,

    /// Prometheus exporter address (e.g., "127.0.0.1:9090"). Disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            debug: false,
            log_format: LogFormat::Json,
            metrics_address: None,
        }
    }
}

impl ServerConfig {
    /// The socket address string the listener binds to.
    pub fn listen_address(&self) -> String {
        if self.bind_address.contains(':') {
            format!("[{}]:{}", self.bind_address, self.port)
        } else {
            format!("{}:{}", self.bind_address, self.port)
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// A single path-to-backend route entry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    /// Path pattern (e.g., "/api/v1/users" or "/static/").
    pub path: String,

    /// Absolute backend URL (e.g., "http://localhost:8081").
    pub backend: String,

    /// Forwarding timeout in seconds. Zero or missing falls back to the default.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Health check path resolved against the backend URL (e.g., "/health").
    #[serde(default)]
    pub health_check_path: Option<String>,

    /// Seconds between health probes.
    #[serde(default)]
    pub health_check_interval: Option<u64>,

    /// Credentials required by the basic-auth stage.
    #[serde(default)]
    pub basic_auth: Option<BasicAuthConfig>,
}

impl RouteConfig {
    /// Create a route with defaults for every optional field.
    pub fn new(path: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            backend: backend.into(),
            timeout: None,
            health_check_path: None,
            health_check_interval: None,
            basic_auth: None,
        }
    }
}

/// Basic authentication credentials for a route.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,

    /// Realm advertised in the challenge header.
    #[serde(default = "default_realm")]
    pub realm: String,
}

fn default_realm() -> String {
    "hurrah".to_string()
}
