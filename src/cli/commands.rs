//! CLI command implementations
//!
//! `serve` boots in a fixed order: resolve configuration, build the
//! document client, open the relational pool and verify it answers, then
//! bind the listener. A relational store that fails its first liveness
//! check stops startup before any request is served.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::http_server::HttpServer;
use crate::observability::{log_event, Event, Logger};
use crate::store::{
    DocumentStore, MongoDocumentStore, RelationalStore, SqlServerStore, StoreResult,
};

use super::args::Command;
use super::config::ServiceConfig;
use super::errors::{CliError, CliResult};
use super::io::write_json;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(config.as_deref(), port),
        Command::Check { config } => check(config.as_deref()),
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))
}

fn load_config(config_path: Option<&Path>, port: Option<u16>) -> CliResult<ServiceConfig> {
    let mut config = ServiceConfig::resolve(config_path)?;
    if let Some(port) = port {
        config.http.port = port;
    }

    let mssql = config
        .mssql
        .as_ref()
        .map(|m| m.address())
        .unwrap_or_else(|| "disabled".to_string());
    Logger::event(
        Event::ConfigLoaded,
        &[
            ("listen", config.http.socket_addr().as_str()),
            ("mongo_collection", config.mongo.collection.as_str()),
            ("mongo_database", config.mongo.database.as_str()),
            ("mssql", mssql.as_str()),
        ],
    );

    Ok(config)
}

/// Connect to both stores and serve the HTTP API until the process exits
pub fn serve(config_path: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    log_event(Event::StartupBegin);
    let config = load_config(config_path, port)?;

    runtime()?.block_on(boot_and_serve(config))
}

async fn boot_and_serve(config: ServiceConfig) -> CliResult<()> {
    let documents = MongoDocumentStore::connect(config.mongo.clone()).await?;
    Logger::event(
        Event::DocumentStoreConnected,
        &[
            ("collection", config.mongo.collection.as_str()),
            ("database", config.mongo.database.as_str()),
        ],
    );

    let relational: Option<Arc<dyn RelationalStore>> = match &config.mssql {
        Some(mssql) => {
            let store = SqlServerStore::open(mssql.clone()).await.map_err(|e| {
                Logger::event(
                    Event::RelationalStoreUnreachable,
                    &[("addr", mssql.address().as_str()), ("message", e.to_string().as_str())],
                );
                CliError::boot_failed(format!("Relational store unreachable: {}", e))
            })?;
            Logger::event(Event::RelationalStoreConnected, &[("addr", mssql.address().as_str())]);
            let store: Arc<dyn RelationalStore> = Arc::new(store);
            Some(store)
        }
        None => {
            log_event(Event::RelationalStoreDisabled);
            None
        }
    };

    let server = HttpServer::new(config.http, Arc::new(documents), relational);
    server
        .start()
        .await
        .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
}

/// One line of `check` output
#[derive(Debug, Serialize)]
struct BackendStatus {
    backend: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl BackendStatus {
    fn from_outcome(backend: &'static str, outcome: StoreResult<()>) -> Self {
        match outcome {
            Ok(()) => {
                Logger::event(Event::BackendHealthy, &[("backend", backend)]);
                Self {
                    backend,
                    status: "ok",
                    message: None,
                }
            }
            Err(e) => {
                let message = e.to_string();
                Logger::event(
                    Event::BackendUnhealthy,
                    &[("backend", backend), ("message", message.as_str())],
                );
                Self {
                    backend,
                    status: "error",
                    message: Some(message),
                }
            }
        }
    }

    fn is_ok(&self) -> bool {
        self.message.is_none()
    }
}

/// Ping both stores, print one status line per backend, fail if any is down
pub fn check(config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path, None)?;

    let statuses = runtime()?.block_on(async {
        let mongo = match MongoDocumentStore::connect(config.mongo.clone()).await {
            Ok(store) => store.ping().await,
            Err(e) => Err(e),
        };
        let mut statuses = vec![BackendStatus::from_outcome("mongo", mongo)];

        if let Some(mssql) = &config.mssql {
            let outcome = SqlServerStore::new(mssql.clone()).ping().await;
            statuses.push(BackendStatus::from_outcome("mssql", outcome));
        }

        statuses
    });

    for status in &statuses {
        write_json(status)?;
    }

    let failed: Vec<&str> = statuses
        .iter()
        .filter(|s| !s.is_ok())
        .map(|s| s.backend)
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::check_failed(format!(
            "unhealthy backends: {}",
            failed.join(", ")
        )))
    }
}
