//! CLI argument definitions using clap
//!
//! Commands:
//! - cities-service serve [--config <path>] [--port <port>]
//! - cities-service check [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cities service - city listings over MongoDB and SQL Server
#[derive(Parser, Debug)]
#[command(name = "cities-service")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to both stores and serve the HTTP API
    Serve {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on, overriding configuration
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a liveness check against both stores and exit
    Check {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
