//! CLI module for fanhub
//!
//! Provides command-line interface for:
//! - serve: run the WebSocket fan-out server
//! - check-config: validate and print a configuration file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, resolve_config, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_json;
