mod database;
mod driver;

pub use database::{Database, DbQuery};
pub use driver::DatabaseDriver;
