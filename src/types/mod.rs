pub mod codec;
pub mod mapping;
mod row;
mod sql_value;
mod variable;

pub use mapping::{oid, Oid};
pub use row::{ColumnDesc, RawQueryResult};
pub use sql_value::SqlValue;
pub use variable::{ArrayTier, DbVariable, VarType};
