use bytes::Bytes;

use crate::types::mapping::Oid;

/// Name and wire type code of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDesc {
    pub name: String,
    pub type_oid: Oid,
}

impl ColumnDesc {
    pub fn new(name: impl Into<String>, type_oid: Oid) -> Self {
        Self {
            name: name.into(),
            type_oid,
        }
    }
}

/// Driver-agnostic raw result from a database query.
///
/// Cells hold the column's binary wire representation; `None` is SQL NULL.
/// Column descriptors are present even when no rows came back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQueryResult {
    /// Columns in order
    pub columns: Vec<ColumnDesc>,
    /// Rows, where each row holds one cell per column
    pub rows: Vec<Vec<Option<Bytes>>>,
    /// Rows affected by the command
    pub rows_affected: u64,
}

impl RawQueryResult {
    pub fn new(columns: Vec<ColumnDesc>, rows: Vec<Vec<Option<Bytes>>>) -> Self {
        let rows_affected = rows.len() as u64;
        Self {
            columns,
            rows,
            rows_affected,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the number of rows in this result.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if this result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw bytes of one cell, `None` for NULL or out-of-range positions.
    pub fn cell(&self, row: usize, column: usize) -> Option<&[u8]> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }
}
