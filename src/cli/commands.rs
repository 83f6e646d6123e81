//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::hub::{Hub, SharedHub};
use crate::transport::WebSocketServer;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_json;

/// Main CLI entry point
///
/// Parses arguments, installs logging and dispatches to the command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    init_logging();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(config.as_deref(), port),
        Command::CheckConfig { config } => check_config(&config),
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Resolve the effective configuration
pub fn resolve_config(config_path: Option<&Path>, port: Option<u16>) -> CliResult<ServerConfig> {
    let mut config = match config_path {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = port {
        config.port = port;
    }
    config.validate()?;
    Ok(config)
}

/// Run the WebSocket server and heartbeat monitor until Ctrl-C
pub fn serve(config_path: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    let config = resolve_config(config_path, port)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::serve_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let hub = SharedHub::new(Hub::with_keepalive_interval(config.keepalive_interval_ms));
        let server = Arc::new(WebSocketServer::new(config, hub));

        let stopper = Arc::clone(&server);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                stopper.shutdown();
            }
        });

        server.run().await
    })?;

    Ok(())
}

/// Load, validate and print a configuration file
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = resolve_config(Some(config_path), None)?;
    write_json(&config)
}
