//! Startup reporting.
//!
//! Dumps the effective running condition at debug level once the logger is
//! installed and the route table has been built.

use std::path::Path;

use crate::config::GatewayConfig;
use crate::routing::RouteTable;

/// Gateway version reported at startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the running condition and the route table.
pub fn log_running_condition(config: &GatewayConfig, config_file: &Path, table: &RouteTable) {
    tracing::debug!(
        version = VERSION,
        address = %config.server.listen_address(),
        config_file = %config_file.display(),
        debug = config.server.debug,
        routes = table.len(),
        "Running condition"
    );

    for route in table.routes() {
        tracing::debug!(
            path = %route.path,
            backend = %route.backend,
            timeout_secs = route.timeout.as_secs(),
            health_check_path = route.health_check_path.as_deref().unwrap_or("-"),
            basic_auth = route.basic_auth.is_some(),
            "Route registered"
        );
    }
}
