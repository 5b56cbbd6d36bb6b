//! pgsqldb - a blocking PostgreSQL client adapter with typed slots
//!
//! A [`PgSqlDb`] owns one connection. Queries are created from it, bound
//! through typed setters on positional input slots, executed, and read back
//! row by row into typed output slots.
//!
//! # Example
//! ```no_run
//! use pgsqldb::{DbQuery, PgSql, PgSqlDb};
//!
//! # fn main() -> pgsqldb::Result<()> {
//! let lib = PgSql::init();
//! let mut db = PgSqlDb::new(&lib)?;
//! db.connect("127.0.0.1", 5432, "test", "test", "test", false)?;
//!
//! let mut query = db.new_query("by-id", "SELECT id, name FROM users WHERE id = $1")?;
//! query.set_int32(0, 2)?;
//! query.execute()?;
//! while query.fetch()? {
//!     let id = query.out_by_name("id")?.as_i32()?;
//!     let name = query.out_by_name("name")?.as_str()?;
//!     println!("{id}: {name}");
//! }
//! # drop(query);
//! # drop(db);
//! # lib.quit()
//! # }
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod placeholder;
pub mod traits;
pub mod types;

mod database;
mod library;
mod query;

// Re-export main types for convenient access
pub use config::{ConfigError, ConnectOptions};
pub use database::PgSqlDb;
pub use error::{PgSqlError, Result};
pub use library::PgSql;
pub use query::{PgSqlQuery, QueryMode};
pub use traits::{Database, DatabaseDriver, DbQuery};
pub use types::{DbVariable, SqlValue, VarType};
