use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::Result;
use crate::types::DbVariable;

/// A database client: connection lifecycle plus a factory for queries.
pub trait Database {
    /// Connect to a database server.
    ///
    /// `port` 0 selects the default port, and a `host:port` host overrides it.
    /// With `keep_password` false the password is dropped after the handshake.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        database: &str,
        user: &str,
        password: &str,
        keep_password: bool,
    ) -> Result<()>;

    /// Disconnect from the database server. Safe to call when not connected.
    fn disconnect(&mut self);

    /// Check that the connection is still alive.
    fn ping_connection(&self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Create a query object for `query` on this connection.
    fn new_query<'a>(&'a self, name: &str, query: &str) -> Result<Box<dyn DbQuery + 'a>>;
}

/// A query with positional input slots and named output slots.
///
/// Setters fail with an out-of-range error when `attr` is not below the
/// number of placeholders in the template, and replace any previous value.
pub trait DbQuery {
    fn set_null(&mut self, attr: usize) -> Result<()>;
    fn set_bool(&mut self, attr: usize, v: bool) -> Result<()>;
    fn set_int32(&mut self, attr: usize, v: i32) -> Result<()>;
    fn set_uint32(&mut self, attr: usize, v: u32) -> Result<()>;
    fn set_int64(&mut self, attr: usize, v: i64) -> Result<()>;
    fn set_uint64(&mut self, attr: usize, v: u64) -> Result<()>;
    fn set_float(&mut self, attr: usize, v: f32) -> Result<()>;
    fn set_double(&mut self, attr: usize, v: f64) -> Result<()>;
    /// Binds character data. Must not contain a NUL byte.
    fn set_cstring(&mut self, attr: usize, v: &[u8]) -> Result<()>;
    fn set_date(&mut self, attr: usize, v: NaiveDate) -> Result<()>;
    fn set_timestamp(&mut self, attr: usize, v: NaiveDateTime) -> Result<()>;
    /// Binds a copy of `v`.
    fn set_array_u8(&mut self, attr: usize, v: &[u8]) -> Result<()>;
    /// Binds a shared buffer without copying it.
    fn set_smart_array_u8(&mut self, attr: usize, v: Bytes) -> Result<()>;

    /// Execute a row-returning statement.
    fn execute(&mut self) -> Result<()>;

    /// Execute an INSERT, UPDATE or DELETE.
    fn update(&mut self) -> Result<()>;

    /// Result rows after `execute`, affected rows after `update`.
    fn num_rows(&self) -> usize;

    fn generated_key(&self) -> u64;

    /// Load the next row into the output slots. Returns false when no row is left.
    fn fetch(&mut self) -> Result<bool>;

    fn tell_row(&self) -> usize;

    /// Move the cursor within the current result (seek 0 to restart).
    fn seek_row(&mut self, row: usize) -> Result<()>;

    /// Index of an output slot by column name.
    fn out_attr(&self, name: &str) -> Result<usize>;

    fn out_by_name(&self, name: &str) -> Result<&DbVariable>;

    fn out(&self, attr: usize) -> Result<&DbVariable>;

    /// Clear the bind-pending state.
    fn unbind(&mut self);
}
