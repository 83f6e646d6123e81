//! CLI argument definitions using clap
//!
//! Commands:
//! - fanhub serve [--config <path>] [--port <n>]
//! - fanhub check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fanhub - in-process pub/sub fan-out over WebSocket
#[derive(Parser, Debug)]
#[command(name = "fanhub")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the WebSocket server until interrupted
    Serve {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate a configuration file and print the effective settings
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./fanhub.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
