use std::error::Error;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio_postgres::types::{to_sql_checked, Format, FromSql, IsNull, ToSql, Type};
use tokio_postgres::{Client, NoTls, Statement};

use crate::config::ConnectOptions;
use crate::error::{PgSqlError, Result};
use crate::traits::DatabaseDriver;
use crate::types::codec::{self, WireFormat};
use crate::types::{ColumnDesc, RawQueryResult, SqlValue};

/// PostgreSQL driver implementation using tokio-postgres.
pub struct TokioPostgresDriver {
    client: Client,
}

impl TokioPostgresDriver {
    /// Connect to a PostgreSQL database.
    ///
    /// Must be called from within a tokio runtime; the connection task is
    /// spawned onto it and lives as long as that runtime.
    pub async fn connect(options: &ConnectOptions) -> Result<Self> {
        let (host, port) = options.endpoint()?;

        let mut config = tokio_postgres::Config::new();
        config
            .host(&host)
            .port(port)
            .dbname(&options.database)
            .user(&options.user)
            .keepalives(true);
        if !options.password.is_empty() {
            config.password(&options.password);
        }
        if let Some(timeout) = options.connect_timeout() {
            config.connect_timeout(timeout);
        }
        if let Some(name) = &options.application_name {
            config.application_name(name);
        }

        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|e| PgSqlError::ConnectionFailed(native_message(&e)))?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgresql connection error");
            }
        });

        Ok(Self { client })
    }

    async fn prepare(&self, sql: &str) -> Result<Statement> {
        self.client
            .prepare(sql)
            .await
            .map_err(|e| PgSqlError::QueryFailed(native_message(&e)))
    }
}

#[async_trait]
impl DatabaseDriver for TokioPostgresDriver {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        let statement = self.prepare(sql).await?;

        let wire: Vec<WireParam<'_>> = params.iter().map(WireParam).collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            wire.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let rows = self
            .client
            .query(&statement, &param_refs)
            .await
            .map_err(|e| PgSqlError::QueryFailed(native_message(&e)))?;

        // Column descriptors come from the statement so they survive an empty result.
        let columns: Vec<ColumnDesc> = statement
            .columns()
            .iter()
            .map(|c| ColumnDesc::new(c.name(), c.type_().oid()))
            .collect();

        let mut result_rows = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut cells = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                let cell: Option<RawCell> = row.try_get(index).map_err(|e| {
                    PgSqlError::Decode {
                        column: index,
                        reason: e.to_string(),
                    }
                })?;
                cells.push(cell.map(|c| c.0));
            }
            result_rows.push(cells);
        }

        Ok(RawQueryResult::new(columns, result_rows))
    }

    async fn update(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let statement = self.prepare(sql).await?;

        let wire: Vec<WireParam<'_>> = params.iter().map(WireParam).collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            wire.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        self.client
            .execute(&statement, &param_refs)
            .await
            .map_err(|e| PgSqlError::QueryFailed(native_message(&e)))
    }

    async fn ping(&self) -> Result<()> {
        if self.client.is_closed() {
            return Err(PgSqlError::ConnectionFailed(
                "connection to server was closed".to_string(),
            ));
        }
        self.client
            .simple_query("SELECT 1")
            .await
            .map(|_| ())
            .map_err(|e| PgSqlError::ConnectionFailed(native_message(&e)))
    }
}

/// The server's own message when there is one, else the client error text.
fn native_message(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => db.message().to_string(),
        None => e.to_string(),
    }
}

/// Binds a SqlValue using the crate codec for whatever type the server
/// inferred for the parameter.
#[derive(Debug)]
struct WireParam<'a>(&'a SqlValue);

impl ToSql for WireParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        match codec::encode_param(self.0, ty.oid())? {
            Some(encoded) => {
                out.extend_from_slice(&encoded.bytes);
                Ok(IsNull::No)
            }
            None => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, ty: &Type) -> Format {
        match codec::encode_param(self.0, ty.oid()) {
            Ok(Some(encoded)) if encoded.format == WireFormat::Text => Format::Text,
            _ => Format::Binary,
        }
    }

    to_sql_checked!();
}

/// Raw binary cell, copied out of the row buffer untouched.
struct RawCell(Bytes);

impl<'a> FromSql<'a> for RawCell {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawCell(Bytes::copy_from_slice(raw)))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}
