//! Store Configuration
//!
//! Connection settings for the document store and the relational store.
//! Defaults reproduce the fixed connection parameters the service has
//! always used against local development backends.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Document store (MongoDB) configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection string (default: "mongodb://localhost:27017")
    #[serde(default = "default_mongo_uri")]
    pub uri: String,

    /// Database name (default: "CitiesService")
    #[serde(default = "default_database")]
    pub database: String,

    /// Collection name (default: "cities")
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Startup connect timeout in seconds (default: 10)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Deadline for the list query in seconds (default: 30)
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "CitiesService".to_string()
}

fn default_collection() -> String {
    "cities".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_query_timeout_secs() -> u64 {
    30
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: default_mongo_uri(),
            database: default_database(),
            collection: default_collection(),
            connect_timeout_secs: default_connect_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl MongoConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Relational store (SQL Server) configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MssqlConfig {
    /// Server host (default: "localhost")
    #[serde(default = "default_mssql_host")]
    pub host: String,

    /// Server port (default: 1433)
    #[serde(default = "default_mssql_port")]
    pub port: u16,

    /// SQL login (default: "sa")
    #[serde(default = "default_mssql_user")]
    pub user: String,

    /// SQL password (default: empty)
    #[serde(default)]
    pub password: String,

    /// Database name (default: "CitiesService")
    #[serde(default = "default_database")]
    pub database: String,

    /// Accept the server certificate without validation (default: true)
    #[serde(default = "default_trust_cert")]
    pub trust_cert: bool,

    /// Maximum pooled connections (default: 10)
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connect and pool-acquire timeout in seconds (default: 10)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Deadline for each relational operation in seconds (default: 30)
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Idle pooled connections older than this are closed, in seconds (default: 300)
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_mssql_host() -> String {
    "localhost".to_string()
}

fn default_mssql_port() -> u16 {
    1433
}

fn default_mssql_user() -> String {
    "sa".to_string()
}

fn default_trust_cert() -> bool {
    true
}

fn default_pool_size() -> usize {
    10
}

fn default_idle_timeout_secs() -> u64 {
    300
}

impl Default for MssqlConfig {
    fn default() -> Self {
        Self {
            host: default_mssql_host(),
            port: default_mssql_port(),
            user: default_mssql_user(),
            password: String::new(),
            database: default_database(),
            trust_cert: default_trust_cert(),
            pool_size: default_pool_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl MssqlConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// `host:port` of the server, for logs
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mongo_defaults() {
        let config = MongoConfig::default();
        assert_eq!(config.uri, "mongodb://localhost:27017");
        assert_eq!(config.database, "CitiesService");
        assert_eq!(config.collection, "cities");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.query_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_mssql_defaults() {
        let config = MssqlConfig::default();
        assert_eq!(config.address(), "localhost:1433");
        assert_eq!(config.user, "sa");
        assert!(config.password.is_empty());
        assert_eq!(config.database, "CitiesService");
        assert_eq!(config.idle_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: MssqlConfig = serde_json::from_str(r#"{"host": "db.internal", "pool_size": 4}"#).unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.port, 1433);
    }
}
