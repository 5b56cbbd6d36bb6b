use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{PgSqlError, Result};
use crate::traits::DatabaseDriver;
use crate::types::codec;
use crate::types::{ColumnDesc, Oid, RawQueryResult, SqlValue};

/// A recorded statement submission for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

enum Scripted {
    Rows(RawQueryResult),
    Failure(String),
}

/// An in-memory database driver for testing.
///
/// Allows configuring expected responses and verifying executed queries.
/// Responses are consumed in FIFO order by both `execute` and `update`.
/// Once the queue is empty, an echo driver mirrors the bound parameters back
/// as a single row; otherwise the default response is returned.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use pgsqldb::drivers::{InMemoryTestDriver, InMemoryTestResponseBuilder};
/// use pgsqldb::types::{oid, SqlValue};
///
/// let driver = Arc::new(
///     InMemoryTestDriver::new().with_response(
///         InMemoryTestResponseBuilder::new()
///             .column("id", oid::INT4)
///             .column("name", oid::TEXT)
///             .values(&[SqlValue::Int32(1), SqlValue::from("Alice")])
///             .build(),
///     ),
/// );
/// ```
pub struct InMemoryTestDriver {
    responses: Mutex<VecDeque<Scripted>>,
    recorded_queries: Mutex<Vec<RecordedQuery>>,
    default_response: RawQueryResult,
    echo_columns: Option<Vec<ColumnDesc>>,
    ping_failure: Option<String>,
}

impl InMemoryTestDriver {
    /// Create a new in-memory test driver with no pre-configured responses.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            recorded_queries: Mutex::new(Vec::new()),
            default_response: RawQueryResult::empty(),
            echo_columns: None,
            ping_failure: None,
        }
    }

    /// A driver that answers every unscripted statement with one row holding
    /// the bound parameters, encoded for `columns` as the server would.
    pub fn echo(columns: Vec<ColumnDesc>) -> Self {
        Self {
            echo_columns: Some(columns),
            ..Self::new()
        }
    }

    /// Add a response to be returned by the next query.
    pub fn with_response(self, response: RawQueryResult) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted::Rows(response));
        self
    }

    /// Add multiple responses to be returned by subsequent queries.
    pub fn with_responses(self, responses: impl IntoIterator<Item = RawQueryResult>) -> Self {
        let mut queue = self.responses.lock().unwrap();
        for response in responses {
            queue.push_back(Scripted::Rows(response));
        }
        drop(queue);
        self
    }

    /// Make the next query fail with `message` as the server error text.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted::Failure(message.into()));
        self
    }

    /// Set a default response to use when no queued responses remain.
    pub fn with_default_response(mut self, response: RawQueryResult) -> Self {
        self.default_response = response;
        self
    }

    /// Make every ping fail as if the server went away.
    pub fn with_ping_failure(mut self, message: impl Into<String>) -> Self {
        self.ping_failure = Some(message.into());
        self
    }

    /// Get all recorded queries that have been executed.
    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.recorded_queries.lock().unwrap().clone()
    }

    /// Get the last recorded query, if any.
    pub fn last_query(&self) -> Option<RecordedQuery> {
        self.recorded_queries.lock().unwrap().last().cloned()
    }

    /// Clear all recorded queries.
    pub fn clear_recorded_queries(&self) {
        self.recorded_queries.lock().unwrap().clear();
    }

    /// Assert that the last query matches the expected SQL and parameters.
    pub fn assert_last_query(&self, expected_sql: &str, expected_params: &[SqlValue]) {
        let last = self.last_query().expect("No queries were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.params, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.params
        );
    }

    /// Assert that exactly n queries were executed.
    pub fn assert_query_count(&self, expected: usize) {
        let actual = self.recorded_queries.lock().unwrap().len();
        assert_eq!(
            actual, expected,
            "Query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }

    fn record(&self, sql: &str, params: &[SqlValue]) {
        self.recorded_queries.lock().unwrap().push(RecordedQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }

    fn next_response(&self, params: &[SqlValue]) -> Result<RawQueryResult> {
        let scripted = self.responses.lock().unwrap().pop_front();
        match scripted {
            Some(Scripted::Rows(response)) => Ok(response),
            Some(Scripted::Failure(message)) => Err(PgSqlError::QueryFailed(message)),
            None => match &self.echo_columns {
                Some(columns) => mirror(columns, params),
                None => Ok(self.default_response.clone()),
            },
        }
    }
}

impl Default for InMemoryTestDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for InMemoryTestDriver {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        self.record(sql, params);
        self.next_response(params)
    }

    async fn update(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.record(sql, params);
        self.next_response(params).map(|r| r.rows_affected)
    }

    async fn ping(&self) -> Result<()> {
        match &self.ping_failure {
            Some(message) => Err(PgSqlError::ConnectionFailed(message.clone())),
            None => Ok(()),
        }
    }
}

fn mirror(columns: &[ColumnDesc], params: &[SqlValue]) -> Result<RawQueryResult> {
    let mut row = Vec::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        let cell = match params.get(index) {
            Some(value) => encode_cell(value, column.type_oid)?,
            None => None,
        };
        row.push(cell);
    }
    Ok(RawQueryResult::new(columns.to_vec(), vec![row]))
}

fn encode_cell(value: &SqlValue, type_oid: Oid) -> Result<Option<Bytes>> {
    Ok(codec::encode_param(value, type_oid)?.map(|encoded| Bytes::from(encoded.bytes)))
}

/// Builder for creating test responses easily.
pub struct InMemoryTestResponseBuilder {
    columns: Vec<ColumnDesc>,
    rows: Vec<Vec<Option<Bytes>>>,
    rows_affected: Option<u64>,
}

impl InMemoryTestResponseBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected: None,
        }
    }

    /// Append a result column.
    pub fn column(mut self, name: &str, type_oid: Oid) -> Self {
        self.columns.push(ColumnDesc::new(name, type_oid));
        self
    }

    /// Add a row of raw binary cells.
    pub fn row(mut self, cells: Vec<Option<Bytes>>) -> Self {
        self.rows.push(cells);
        self
    }

    /// Add a row of values, encoded for the declared column types.
    ///
    /// # Panics
    /// If a value cannot be encoded for its column.
    pub fn values(self, values: &[SqlValue]) -> Self {
        let cells = values
            .iter()
            .zip(&self.columns)
            .map(|(value, column)| {
                encode_cell(value, column.type_oid)
                    .unwrap_or_else(|e| panic!("cannot encode {value} for {}: {e}", column.name))
            })
            .collect();
        self.row(cells)
    }

    /// Override the affected-row count reported to `update`.
    pub fn rows_affected(mut self, count: u64) -> Self {
        self.rows_affected = Some(count);
        self
    }

    /// Build the RawQueryResult.
    pub fn build(self) -> RawQueryResult {
        let mut result = RawQueryResult::new(self.columns, self.rows);
        if let Some(count) = self.rows_affected {
            result.rows_affected = count;
        }
        result
    }
}

impl Default for InMemoryTestResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::oid;

    #[tokio::test]
    async fn test_queued_responses_then_default() {
        let driver = InMemoryTestDriver::new()
            .with_response(
                InMemoryTestResponseBuilder::new()
                    .column("n", oid::INT4)
                    .values(&[SqlValue::Int32(7)])
                    .build(),
            )
            .with_failure("relation \"missing\" does not exist");

        let first = driver.execute("SELECT 7 AS n", &[]).await.unwrap();
        assert_eq!(first.cell(0, 0), Some(&[0, 0, 0, 7][..]));

        let err = driver.execute("SELECT * FROM missing", &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "Query failed: relation \"missing\" does not exist");

        let third = driver.execute("SELECT 1", &[]).await.unwrap();
        assert!(third.is_empty());
        driver.assert_query_count(3);
    }

    #[tokio::test]
    async fn test_echo_mirrors_parameters() {
        let driver = InMemoryTestDriver::echo(vec![
            ColumnDesc::new("a", oid::INT4),
            ColumnDesc::new("b", oid::TEXT),
        ]);

        let result = driver
            .execute("SELECT $1::int4 AS a, $2::text AS b", &[SqlValue::Int32(-2), SqlValue::Null])
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.cell(0, 0), Some(&(-2i32).to_be_bytes()[..]));
        assert_eq!(result.cell(0, 1), None);
        driver.assert_last_query(
            "SELECT $1::int4 AS a, $2::text AS b",
            &[SqlValue::Int32(-2), SqlValue::Null],
        );
    }

    #[tokio::test]
    async fn test_update_reports_affected_rows() {
        let driver = InMemoryTestDriver::new()
            .with_response(InMemoryTestResponseBuilder::new().rows_affected(3).build());

        assert_eq!(driver.update("DELETE FROM t", &[]).await.unwrap(), 3);
        assert_eq!(driver.update("DELETE FROM t", &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_default_response_repeats_after_queue() {
        let driver = InMemoryTestDriver::new().with_default_response(
            InMemoryTestResponseBuilder::new()
                .column("ok", oid::BOOL)
                .values(&[SqlValue::Bool(true)])
                .build(),
        );

        for _ in 0..2 {
            let result = driver.execute("SELECT true AS ok", &[]).await.unwrap();
            assert_eq!(result.cell(0, 0), Some(&[1][..]));
        }
        driver.assert_query_count(2);

        driver.clear_recorded_queries();
        driver.assert_query_count(0);
        assert_eq!(driver.last_query(), None);
    }
}
