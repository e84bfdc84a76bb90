//! SQL Server relational store client
//!
//! Every operation borrows one pooled connection, checks that it is alive,
//! then issues a single statement. There are no explicit transactions.

use std::time::Duration;

use async_trait::async_trait;
use tiberius::{Row, ToSql};

use super::city::RelationalCity;
use super::config::MssqlConfig;
use super::errors::{with_deadline, StoreError, StoreResult};
use super::pool::{SqlClient, SqlServerPool};
use super::RelationalStore;

const PING: &str = "SELECT 1;";

const SELECT_CITIES: &str = "SELECT Id, Name, Country FROM Cities;";

// Binds the positional protocol parameters to named variables so the
// statement itself only ever refers to @Name and @Country.
const INSERT_CITY: &str = "SET NOCOUNT ON; \
DECLARE @Name NVARCHAR(4000) = @P1, @Country NVARCHAR(4000) = @P2; \
INSERT INTO Cities (Name, Country) VALUES (@Name, @Country); \
SELECT CONVERT(bigint, SCOPE_IDENTITY());";

/// Relational store backed by the `Cities` table
#[derive(Clone)]
pub struct SqlServerStore {
    pool: SqlServerPool,
    query_timeout: Duration,
}

impl SqlServerStore {
    /// Create the store without touching the server
    pub fn new(config: MssqlConfig) -> Self {
        let query_timeout = config.query_timeout();
        Self {
            pool: SqlServerPool::new(config),
            query_timeout,
        }
    }

    /// Create the store and verify the server answers.
    ///
    /// The verified connection stays in the pool for the first request.
    pub async fn open(config: MssqlConfig) -> StoreResult<Self> {
        let store = Self::new(config);
        store.ping().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlServerPool {
        &self.pool
    }
}

async fn ping_client(client: &mut SqlClient) -> StoreResult<()> {
    client
        .simple_query(PING)
        .await
        .map_err(|e| StoreError::Ping(e.to_string()))?
        .into_results()
        .await
        .map(|_| ())
        .map_err(|e| StoreError::Ping(e.to_string()))
}

async fn select_cities(client: &mut SqlClient) -> StoreResult<Vec<RelationalCity>> {
    ping_client(client).await?;

    let rows = client
        .simple_query(SELECT_CITIES)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?
        .into_first_result()
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

    rows.iter().map(scan_city).collect()
}

async fn insert_city(client: &mut SqlClient, name: &str, country: &str) -> StoreResult<i64> {
    ping_client(client).await?;

    let name = name.to_string();
    let country = country.to_string();
    let params: [&dyn ToSql; 2] = [&name, &country];

    let row = client
        .query(INSERT_CITY, &params)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?
        .into_row()
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?
        .ok_or_else(|| StoreError::Query("insert returned no identity".to_string()))?;

    row.try_get::<i64, _>(0)
        .map_err(|e| StoreError::Decode(e.to_string()))?
        .ok_or_else(|| null_column("SCOPE_IDENTITY()"))
}

/// Scan `Id, Name, Country` positionally. NULLs and type mismatches fail
/// the whole listing.
fn scan_city(row: &Row) -> StoreResult<RelationalCity> {
    let id = match row.try_get::<i32, _>(0) {
        Ok(Some(id)) => i64::from(id),
        Ok(None) => return Err(null_column("Id")),
        Err(_) => row
            .try_get::<i64, _>(0)
            .map_err(|e| StoreError::Decode(e.to_string()))?
            .ok_or_else(|| null_column("Id"))?,
    };

    Ok(RelationalCity {
        id,
        name: scan_text(row, 1, "Name")?,
        country: scan_text(row, 2, "Country")?,
    })
}

fn scan_text(row: &Row, idx: usize, column: &str) -> StoreResult<String> {
    row.try_get::<&str, _>(idx)
        .map_err(|e| StoreError::Decode(e.to_string()))?
        .map(str::to_string)
        .ok_or_else(|| null_column(column))
}

fn null_column(column: &str) -> StoreError {
    StoreError::Decode(format!("NULL value in column {}", column))
}

#[async_trait]
impl RelationalStore for SqlServerStore {
    async fn ping(&self) -> StoreResult<()> {
        with_deadline("relational ping", self.query_timeout, async {
            let mut conn = self.pool.get().await?;
            let result = ping_client(conn.client()?).await;
            conn.release(&result);
            result
        })
        .await
    }

    async fn list_all(&self) -> StoreResult<Vec<RelationalCity>> {
        with_deadline("list rows", self.query_timeout, async {
            let mut conn = self.pool.get().await?;
            let result = select_cities(conn.client()?).await;
            conn.release(&result);
            result
        })
        .await
    }

    async fn insert_one(&self, name: &str, country: &str) -> StoreResult<i64> {
        with_deadline("insert row", self.query_timeout, async {
            let mut conn = self.pool.get().await?;
            let result = insert_city(conn.client()?, name, country).await;
            conn.release(&result);
            result
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_binds_named_variables() {
        assert!(INSERT_CITY.contains("VALUES (@Name, @Country)"));
        assert!(INSERT_CITY.contains("SCOPE_IDENTITY()"));
        assert!(!INSERT_CITY.contains("Warsaw"));
    }

    #[test]
    fn test_null_column_message() {
        let err = null_column("Name");
        assert_eq!(err.to_string(), "failed to decode row: NULL value in column Name");
    }

    #[tokio::test]
    async fn test_open_fails_when_server_unreachable() {
        let config = MssqlConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_secs: 2,
            query_timeout_secs: 3,
            ..MssqlConfig::default()
        };

        assert!(SqlServerStore::open(config).await.is_err());
    }

    #[tokio::test]
    async fn test_list_all_reports_error_when_server_unreachable() {
        let store = SqlServerStore::new(MssqlConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_secs: 2,
            query_timeout_secs: 3,
            ..MssqlConfig::default()
        });

        let err = store.list_all().await.unwrap_err();
        assert!(!err.to_string().is_empty());
        assert_eq!(store.pool().idle_count(), 0);
    }
}
