//! Structured logging.
//!
//! The subscriber is installed once at startup. `RUST_LOG` overrides the
//! level derived from the debug flag.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Default filter directives for the given debug setting.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "hurrah=debug,tower_http=debug"
    } else {
        "hurrah=info,tower_http=info"
    }
}

/// Install the global tracing subscriber.
pub fn init_logging(debug: bool, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug).into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        for debug in [true, false] {
            assert!(EnvFilter::try_new(default_filter(debug)).is_ok());
        }
        assert!(default_filter(true).contains("hurrah=debug"));
    }
}
