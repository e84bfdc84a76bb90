//! CLI module for the cities service
//!
//! Provides command-line interface for:
//! - serve: connect to both stores and serve the HTTP API
//! - check: liveness check against both stores

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, run, run_command, serve};
pub use config::ServiceConfig;
pub use errors::{CliError, CliErrorCode, CliResult};
