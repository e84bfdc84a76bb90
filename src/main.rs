//! Cities service entry point
//!
//! Parses the command line, runs the command, and reports a failure on
//! stderr with a non-zero exit status. Everything else lives in `cli`.

use cities_service::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
