//! # Stores
//!
//! The two independent backends behind the HTTP API:
//!
//! - a document store (MongoDB) holding free-form city documents, read only
//! - a relational store (SQL Server) holding the `Cities(Id, Name, Country)` table
//!
//! Handlers only see the [`DocumentStore`] and [`RelationalStore`] traits;
//! the concrete clients are built once at startup and shared.

mod city;
mod config;
mod errors;
mod mongo;
mod pool;
mod sqlserver;

use async_trait::async_trait;

pub use city::{DocumentCity, RelationalCity};
pub use config::{MongoConfig, MssqlConfig};
pub use errors::{with_deadline, StoreError, StoreResult};
pub use mongo::MongoDocumentStore;
pub use pool::{PooledClient, SqlServerPool};
pub use sqlserver::SqlServerStore;

/// Read access to the city document collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in the collection. Documents that do not decode are
    /// left out rather than failing the listing.
    async fn list_all(&self) -> StoreResult<Vec<DocumentCity>>;

    /// Liveness check
    async fn ping(&self) -> StoreResult<()>;
}

/// Access to the `Cities` table
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Liveness check
    async fn ping(&self) -> StoreResult<()>;

    /// Every row, in server order. Fails as a whole if any row fails to scan.
    async fn list_all(&self) -> StoreResult<Vec<RelationalCity>>;

    /// Insert one row and return the identifier the server assigned
    async fn insert_one(&self, name: &str, country: &str) -> StoreResult<i64>;
}
