use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RawQueryResult, SqlValue};

/// Trait for native client implementations.
/// Drivers are responsible for:
/// - Talking to the server
/// - Converting SqlValue parameters to wire parameters
/// - Executing statements and returning binary cells as RawQueryResult
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Execute a row-returning statement with the given parameters.
    /// Parameters use PostgreSQL-style placeholders ($1, $2, etc.)
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult>;

    /// Execute a statement that does not return rows and report the
    /// number of affected rows.
    async fn update(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Round trip to the server to check the link is still alive.
    async fn ping(&self) -> Result<()>;
}
