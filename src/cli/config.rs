//! Service configuration
//!
//! Resolution order, later layers winning:
//!
//! 1. built-in defaults (the local development backends)
//! 2. the JSON file passed with `--config`, if any
//! 3. `CITIES_*` environment variables
//! 4. command line flags (`--port`)
//!
//! The resolved configuration is validated once, before anything connects.

use std::fs;
use std::path::Path;

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::http_server::HttpServerConfig;
use crate::store::{MongoConfig, MssqlConfig};

/// Full configuration of the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub http: HttpServerConfig,

    #[serde(default)]
    pub mongo: MongoConfig,

    /// `null` runs the service without a relational store
    #[serde(default = "default_mssql")]
    pub mssql: Option<MssqlConfig>,
}

fn default_mssql() -> Option<MssqlConfig> {
    Some(MssqlConfig::default())
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http: HttpServerConfig::default(),
            mongo: MongoConfig::default(),
            mssql: default_mssql(),
        }
    }
}

impl ServiceConfig {
    /// Resolve defaults, file and process environment.
    pub fn resolve(path: Option<&Path>) -> CliResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file. Missing keys take defaults.
    pub fn from_file(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))
    }

    /// Apply `CITIES_*` overrides read through `lookup`.
    ///
    /// `CITIES_MSSQL_*` values only apply while the relational store is
    /// enabled; `CITIES_MSSQL_DISABLED=1` (or `true`) turns it off.
    pub fn apply_env<F>(&mut self, lookup: F) -> CliResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("CITIES_HTTP_HOST") {
            self.http.host = host;
        }
        if let Some(port) = lookup("CITIES_HTTP_PORT") {
            self.http.port = parse_port("CITIES_HTTP_PORT", &port)?;
        }

        if let Some(uri) = lookup("CITIES_MONGO_URI") {
            self.mongo.uri = uri;
        }
        if let Some(database) = lookup("CITIES_MONGO_DATABASE") {
            self.mongo.database = database;
        }
        if let Some(collection) = lookup("CITIES_MONGO_COLLECTION") {
            self.mongo.collection = collection;
        }

        if lookup("CITIES_MSSQL_DISABLED").is_some_and(|v| is_truthy(&v)) {
            self.mssql = None;
        }

        if let Some(mssql) = self.mssql.as_mut() {
            if let Some(host) = lookup("CITIES_MSSQL_HOST") {
                mssql.host = host;
            }
            if let Some(port) = lookup("CITIES_MSSQL_PORT") {
                mssql.port = parse_port("CITIES_MSSQL_PORT", &port)?;
            }
            if let Some(user) = lookup("CITIES_MSSQL_USER") {
                mssql.user = user;
            }
            if let Some(password) = lookup("CITIES_MSSQL_PASSWORD") {
                mssql.password = password;
            }
            if let Some(database) = lookup("CITIES_MSSQL_DATABASE") {
                mssql.database = database;
            }
        }

        Ok(())
    }

    /// Validate the resolved configuration
    pub fn validate(&self) -> CliResult<()> {
        self.http.parse_socket_addr().map_err(|e| {
            CliError::config_error(format!(
                "Invalid listen address '{}': {}",
                self.http.socket_addr(),
                e
            ))
        })?;

        for origin in &self.http.cors_origins {
            HeaderValue::from_str(origin).map_err(|_| {
                CliError::config_error(format!("Invalid CORS origin '{}'", origin))
            })?;
        }

        require_non_empty("mongo.uri", &self.mongo.uri)?;
        require_non_empty("mongo.database", &self.mongo.database)?;
        require_non_empty("mongo.collection", &self.mongo.collection)?;
        require_non_zero("mongo.connect_timeout_secs", self.mongo.connect_timeout_secs)?;
        require_non_zero("mongo.query_timeout_secs", self.mongo.query_timeout_secs)?;

        if let Some(mssql) = &self.mssql {
            require_non_empty("mssql.host", &mssql.host)?;
            require_non_empty("mssql.user", &mssql.user)?;
            require_non_empty("mssql.database", &mssql.database)?;
            require_non_zero("mssql.connect_timeout_secs", mssql.connect_timeout_secs)?;
            require_non_zero("mssql.query_timeout_secs", mssql.query_timeout_secs)?;
            require_non_zero("mssql.idle_timeout_secs", mssql.idle_timeout_secs)?;
            if mssql.pool_size == 0 {
                return Err(CliError::config_error("mssql.pool_size must be > 0"));
            }
        }

        Ok(())
    }
}

fn parse_port(key: &str, value: &str) -> CliResult<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::config_error(format!("{} is not a valid port: '{}'", key, value)))
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn require_non_empty(field: &str, value: &str) -> CliResult<()> {
    if value.trim().is_empty() {
        return Err(CliError::config_error(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_non_zero(field: &str, value: u64) -> CliResult<()> {
    if value == 0 {
        return Err(CliError::config_error(format!("{} must be > 0", field)));
    }
    Ok(())
}
