//! # Store Errors
//!
//! Error types shared by the document and relational store clients.

use std::time::Duration;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
///
/// Payloads carry the driver's message verbatim; the HTTP layer passes it
/// through to the caller unchanged.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Invalid client configuration (bad URI, bad option)
    #[error("invalid store configuration: {0}")]
    Config(String),

    /// Could not open or authenticate a connection
    #[error("connection failed: {0}")]
    Connection(String),

    /// Liveness check failed
    #[error("liveness check failed: {0}")]
    Ping(String),

    /// Query issuance or result iteration failed
    #[error("query failed: {0}")]
    Query(String),

    /// A row could not be scanned into its record
    #[error("failed to decode row: {0}")]
    Decode(String),

    /// The backend did not answer within the operation deadline
    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// No pooled connection became available in time
    #[error("timed out after {}s waiting for a pooled connection", .0.as_secs())]
    PoolTimeout(Duration),
}

impl StoreError {
    /// Build a timeout error for the named operation
    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::Timeout { operation, after }
    }

    /// True when the connection that produced this error should not be reused.
    ///
    /// Only a scan failure happens after the result set is fully read; any
    /// other failure may leave the session mid-stream.
    pub fn poisons_connection(&self) -> bool {
        !matches!(self, StoreError::Decode(_))
    }
}

/// Run `fut` with a deadline, mapping elapsed deadlines to [`StoreError::Timeout`].
pub async fn with_deadline<T, F>(operation: &'static str, after: Duration, fut: F) -> StoreResult<T>
where
    F: std::future::Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::timeout(operation, after)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_keeps_driver_text() {
        let err = StoreError::Query("Invalid object name 'Cities'.".to_string());
        assert_eq!(err.to_string(), "query failed: Invalid object name 'Cities'.");
    }

    #[test]
    fn test_timeout_display() {
        let err = StoreError::timeout("list documents", Duration::from_secs(30));
        assert_eq!(err.to_string(), "list documents timed out after 30s");
        assert!(err.poisons_connection());
    }

    #[test]
    fn test_only_decode_keeps_connection() {
        assert!(!StoreError::Decode("NULL in Name".to_string()).poisons_connection());
        assert!(StoreError::Query("deadlock victim".to_string()).poisons_connection());
        assert!(StoreError::Ping("connection reset".to_string()).poisons_connection());
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_elapses() {
        let result: StoreResult<()> = with_deadline("ping", Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(StoreError::Timeout { operation: "ping", .. })));
    }

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let result = with_deadline("ping", Duration::from_secs(5), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
