//! hurrah: API gateway for microservices.
//!
//! ```text
//!  Client ─▶ listener ─▶ dispatcher ─▶ pipeline ─▶ reverse proxy ─▶ Backend
//!                        (by path)    (access log,  (one backend
//!                                      basic auth)   per route)
//!
//!  health monitors (one task per checked route) ─▶ Backend
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use hurrah::config::{self, GatewayConfig, LogFormat};
use hurrah::lifecycle::{signals, startup};
use hurrah::observability;
use hurrah::{GatewayServer, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "hurrah", version, about = "API gateway for microservices")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Port to listen on (overrides the configuration file).
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit debug logs, including the startup route table.
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            observability::init_logging(cli.debug, LogFormat::default());
            tracing::error!(error = %e, "Failed to initialize hurrah");
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.server.debug |= cli.debug;

    observability::init_logging(config.server.debug, config.server.log_format);

    match run(config, &cli.config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Failed to run hurrah");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    config: GatewayConfig,
    config_file: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(address) = &config.server.metrics_address {
        observability::init_metrics(address.parse()?)?;
    }

    let address = config.server.listen_address();
    let server = GatewayServer::new(config)?;
    startup::log_running_condition(server.config(), config_file, server.route_table());

    let listener = TcpListener::bind(&address).await?;

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
