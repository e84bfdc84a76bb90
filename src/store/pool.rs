//! SQL Server connection pool
//!
//! A semaphore bounds the number of live connections. Idle connections are
//! kept in a stack and reused; a connection is only handed back to the
//! stack when the operation that borrowed it finished cleanly. A borrowed
//! connection whose future was dropped (client disconnect, deadline) is
//! closed instead of reused.
//!
//! An idle connection is checked before it is lent out. Connections idle
//! longer than the idle timeout, or failing the check, are closed and the
//! next candidate is tried; when none is left a fresh one is opened.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::config::MssqlConfig;
use super::errors::{with_deadline, StoreError, StoreResult};

/// A single authenticated TDS session
pub type SqlClient = Client<Compat<TcpStream>>;

/// Bounded pool of SQL Server connections
pub type SqlServerPool = ConnectionPool<TdsConnector>;

/// A SQL Server connection borrowed from [`SqlServerPool`]
pub type PooledClient = PooledConnection<TdsConnector>;

/// Opens and checks the connections a [`ConnectionPool`] manages
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: Send + 'static;

    async fn connect(&self) -> StoreResult<Self::Connection>;

    /// Whether an idle connection can still be used
    async fn is_valid(&self, conn: &mut Self::Connection) -> bool;
}

/// Connects with tiberius using the relational store settings
pub struct TdsConnector {
    config: MssqlConfig,
}

#[async_trait]
impl Connector for TdsConnector {
    type Connection = SqlClient;

    async fn connect(&self) -> StoreResult<SqlClient> {
        let config = &self.config;
        let mut tib_config = Config::new();
        tib_config.host(&config.host);
        tib_config.port(config.port);
        tib_config.database(&config.database);
        tib_config.application_name(env!("CARGO_PKG_NAME"));
        tib_config.authentication(AuthMethod::sql_server(&config.user, &config.password));
        if config.trust_cert {
            tib_config.trust_cert();
        }

        let tcp = TcpStream::connect(tib_config.get_addr())
            .await
            .map_err(|e| StoreError::Connection(format!("{}: {}", config.address(), e)))?;
        tcp.set_nodelay(true)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Client::connect(tib_config, tcp.compat_write())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn is_valid(&self, conn: &mut SqlClient) -> bool {
        match conn.simple_query("SELECT 1;").await {
            Ok(stream) => stream.into_results().await.is_ok(),
            Err(_) => false,
        }
    }
}

struct IdleConnection<C> {
    conn: C,
    idle_since: Instant,
}

struct PoolInner<M: Connector> {
    connector: M,
    config: MssqlConfig,
    idle: Mutex<Vec<IdleConnection<M::Connection>>>,
    permits: Arc<Semaphore>,
}

impl<M: Connector> PoolInner<M> {
    /// Pop the most recently returned connection that has not expired.
    /// Expired connections found on the way are closed.
    fn pop_idle(&self, idle_timeout: Duration) -> Option<M::Connection> {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(entry) = idle.pop() {
            if entry.idle_since.elapsed() <= idle_timeout {
                return Some(entry.conn);
            }
        }
        None
    }

    fn push_idle(&self, conn: M::Connection) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(IdleConnection {
                conn,
                idle_since: Instant::now(),
            });
    }
}

/// Bounded pool of connections opened by a [`Connector`]
pub struct ConnectionPool<M: Connector> {
    inner: Arc<PoolInner<M>>,
}

impl<M: Connector> Clone for ConnectionPool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ConnectionPool<TdsConnector> {
    /// Create an empty pool. Connections are opened on demand.
    pub fn new(config: MssqlConfig) -> Self {
        Self::with_connector(
            TdsConnector {
                config: config.clone(),
            },
            config,
        )
    }
}

impl<M: Connector> ConnectionPool<M> {
    pub fn with_connector(connector: M, config: MssqlConfig) -> Self {
        let size = config.pool_size.max(1);
        Self {
            inner: Arc::new(PoolInner {
                connector,
                config,
                idle: Mutex::new(Vec::with_capacity(size)),
                permits: Arc::new(Semaphore::new(size)),
            }),
        }
    }

    pub fn config(&self) -> &MssqlConfig {
        &self.inner.config
    }

    /// Number of open connections waiting to be borrowed
    pub fn idle_count(&self) -> usize {
        self.inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Borrow a connection, opening a new one when no usable one is idle.
    ///
    /// Waiting for a free slot, checking an idle connection and opening a
    /// connection are each bounded by the configured connect timeout.
    pub async fn get(&self) -> StoreResult<PooledConnection<M>> {
        let timeout = self.inner.config.connect_timeout();
        let idle_timeout = self.inner.config.idle_timeout();

        let permit = tokio::time::timeout(timeout, self.inner.permits.clone().acquire_owned())
            .await
            .map_err(|_| StoreError::PoolTimeout(timeout))?
            .map_err(|_| StoreError::Connection("connection pool is closed".to_string()))?;

        let mut reused = None;
        while let Some(mut conn) = self.inner.pop_idle(idle_timeout) {
            let valid = tokio::time::timeout(timeout, self.inner.connector.is_valid(&mut conn))
                .await
                .unwrap_or(false);
            if valid {
                reused = Some(conn);
                break;
            }
        }

        let conn = match reused {
            Some(conn) => conn,
            None => with_deadline("relational connect", timeout, self.inner.connector.connect()).await?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            reusable: false,
            _permit: permit,
        })
    }
}

/// A connection borrowed from a [`ConnectionPool`].
///
/// Dropped without [`PooledConnection::release`] the connection is closed.
pub struct PooledConnection<M: Connector> {
    conn: Option<M::Connection>,
    pool: Arc<PoolInner<M>>,
    reusable: bool,
    _permit: OwnedSemaphorePermit,
}

impl<M: Connector> PooledConnection<M> {
    pub fn client(&mut self) -> StoreResult<&mut M::Connection> {
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::Connection("pooled connection already released".to_string()))
    }

    /// Return the connection to the pool unless `outcome` says the session
    /// may be in an unknown state.
    pub fn release<T>(mut self, outcome: &StoreResult<T>) {
        self.reusable = match outcome {
            Ok(_) => true,
            Err(e) => !e.poisons_connection(),
        };
    }
}

impl<M: Connector> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.reusable {
                self.pool.push_idle(conn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn unreachable_config() -> MssqlConfig {
        MssqlConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            pool_size: 2,
            connect_timeout_secs: 2,
            ..MssqlConfig::default()
        }
    }

    /// Hands out numbered connections; numbers in `dead` fail the check.
    #[derive(Default)]
    struct CountingConnector {
        opened: AtomicU32,
        dead: Mutex<HashSet<u32>>,
    }

    impl CountingConnector {
        fn kill(&self, conn: u32) {
            self.dead.lock().unwrap().insert(conn);
        }
    }

    #[async_trait]
    impl Connector for Arc<CountingConnector> {
        type Connection = u32;

        async fn connect(&self) -> StoreResult<u32> {
            Ok(self.opened.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn is_valid(&self, conn: &mut u32) -> bool {
            !self.dead.lock().unwrap().contains(conn)
        }
    }

    fn counting_pool() -> (Arc<CountingConnector>, ConnectionPool<Arc<CountingConnector>>) {
        let connector = Arc::new(CountingConnector::default());
        let pool = ConnectionPool::with_connector(Arc::clone(&connector), unreachable_config());
        (connector, pool)
    }

    async fn borrow_and_return(pool: &ConnectionPool<Arc<CountingConnector>>) -> u32 {
        let mut conn = pool.get().await.unwrap();
        let id = *conn.client().unwrap();
        conn.release(&Ok::<(), StoreError>(()));
        id
    }

    #[test]
    fn test_new_pool_is_empty() {
        let pool = SqlServerPool::new(unreachable_config());
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.config().pool_size, 2);
    }

    #[test]
    fn test_zero_pool_size_still_allows_one_connection() {
        let pool = SqlServerPool::new(MssqlConfig {
            pool_size: 0,
            ..unreachable_config()
        });
        assert_eq!(pool.inner.permits.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_to_connect() {
        let pool = SqlServerPool::new(unreachable_config());

        let err = pool.get().await.err().unwrap();
        assert!(matches!(
            err,
            StoreError::Connection(_) | StoreError::Timeout { .. }
        ));
        // The permit is released with the failed attempt.
        assert_eq!(pool.inner.permits.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_healthy_idle_connection_is_reused() {
        let (connector, pool) = counting_pool();

        assert_eq!(borrow_and_return(&pool).await, 1);
        assert_eq!(borrow_and_return(&pool).await, 1);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_dead_idle_connection_is_discarded_and_reopened() {
        let (connector, pool) = counting_pool();

        assert_eq!(borrow_and_return(&pool).await, 1);
        connector.kill(1);

        // The server went away and came back: the stale session is dropped
        // and the caller gets a fresh one instead of an error.
        assert_eq!(borrow_and_return(&pool).await, 2);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_every_dead_idle_connection_is_skipped() {
        let (connector, pool) = counting_pool();

        let mut first = pool.get().await.unwrap();
        let mut second = pool.get().await.unwrap();
        let ids = (*first.client().unwrap(), *second.client().unwrap());
        first.release(&Ok::<(), StoreError>(()));
        second.release(&Ok::<(), StoreError>(()));
        assert_eq!(pool.idle_count(), 2);

        connector.kill(ids.0);
        connector.kill(ids.1);

        assert_eq!(borrow_and_return(&pool).await, 3);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_idle_connection_is_closed() {
        let (connector, pool) = counting_pool();
        let idle_timeout = pool.config().idle_timeout();

        assert_eq!(borrow_and_return(&pool).await, 1);
        tokio::time::advance(idle_timeout + Duration::from_secs(1)).await;

        assert_eq!(borrow_and_return(&pool).await, 2);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_operation_does_not_return_connection() {
        let (_connector, pool) = counting_pool();

        let conn = pool.get().await.unwrap();
        conn.release(&Err::<(), _>(StoreError::Query("deadlock".to_string())));

        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.inner.permits.available_permits(), 2);
    }
}
