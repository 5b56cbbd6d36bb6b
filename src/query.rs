use std::collections::HashMap;

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};

use crate::database::PgSqlDb;
use crate::error::{PgSqlError, Result};
use crate::placeholder;
use crate::traits::DbQuery;
use crate::types::codec;
use crate::types::mapping::unmap_type;
use crate::types::{DbVariable, RawQueryResult, SqlValue, VarType};

/// Which execution path ran last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Row-returning statement, run by `execute`.
    Select,
    /// Row-mutating statement, run by `update`.
    Update,
}

/// A query bound to a [`PgSqlDb`].
///
/// Input slots are positional (`$1` is slot 0). Output slots are created from
/// the first successful `execute` and reused afterwards; later executions must
/// return the same column shape.
pub struct PgSqlQuery<'db> {
    db: &'db PgSqlDb,
    name: String,
    template: String,
    inputs: Vec<Option<DbVariable>>,
    outputs: Vec<DbVariable>,
    columns_by_name: HashMap<String, usize>,
    shaped: bool,
    result: Option<RawQueryResult>,
    cursor: usize,
    num_rows: usize,
    needs_bind: bool,
    mode: QueryMode,
}

impl<'db> PgSqlQuery<'db> {
    pub(crate) fn new(db: &'db PgSqlDb, name: &str, template: &str) -> Result<Self> {
        let param_count = placeholder::param_count(template)?;
        Ok(Self {
            db,
            name: name.to_string(),
            template: template.to_string(),
            inputs: (0..param_count).map(|_| None).collect(),
            outputs: Vec::new(),
            columns_by_name: HashMap::new(),
            shaped: false,
            result: None,
            cursor: 0,
            num_rows: 0,
            needs_bind: false,
            mode: QueryMode::Select,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Number of input slots, the highest `$N` in the template.
    pub fn param_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of output slots; zero before the first successful `execute`.
    pub fn column_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// True when a value was bound since the last execution or `unbind`.
    pub fn is_bind_pending(&self) -> bool {
        self.needs_bind
    }

    /// The value bound at input slot `attr`, if any.
    pub fn input(&self, attr: usize) -> Result<Option<&DbVariable>> {
        self.inputs
            .get(attr)
            .map(Option::as_ref)
            .ok_or_else(|| PgSqlError::out_of_range("input", attr, self.inputs.len()))
    }

    fn bind(&mut self, attr: usize, value: SqlValue) -> Result<()> {
        let len = self.inputs.len();
        let slot = self
            .inputs
            .get_mut(attr)
            .ok_or_else(|| PgSqlError::out_of_range("input", attr, len))?;
        *slot = Some(DbVariable::input(value));
        self.needs_bind = true;
        Ok(())
    }

    fn params(&self) -> Result<Vec<SqlValue>> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(attr, slot)| match slot {
                Some(var) => Ok(var.value().clone()),
                None => Err(PgSqlError::InvalidOperation(format!(
                    "input {attr} of query '{}' is not bound",
                    self.name
                ))),
            })
            .collect()
    }

    fn release_result(&mut self) {
        self.result = None;
        self.cursor = 0;
    }

    /// Creates the output slots on first use, then checks that `result`
    /// keeps their shape.
    fn map_columns(&mut self, result: &RawQueryResult) -> Result<()> {
        let mapped: Vec<(VarType, usize)> = result
            .columns
            .iter()
            .map(|c| unmap_type(c.type_oid))
            .collect();

        if !self.shaped {
            self.outputs = mapped
                .iter()
                .map(|&(var_type, size)| DbVariable::new(var_type, size))
                .collect();
            for (index, column) in result.columns.iter().enumerate() {
                self.columns_by_name
                    .entry(column.name.clone())
                    .or_insert(index);
            }
            self.shaped = true;
            return Ok(());
        }

        if mapped.len() != self.outputs.len() {
            return Err(PgSqlError::ShapeMismatch(format!(
                "query '{}' returned {} columns, expected {}",
                self.name,
                mapped.len(),
                self.outputs.len()
            )));
        }
        for (index, ((var_type, _), slot)) in mapped.iter().zip(&self.outputs).enumerate() {
            if *var_type != slot.var_type() {
                return Err(PgSqlError::ShapeMismatch(format!(
                    "column {index} of query '{}' is now {var_type:?}, expected {:?}",
                    self.name,
                    slot.var_type()
                )));
            }
        }
        Ok(())
    }
}

impl DbQuery for PgSqlQuery<'_> {
    fn set_null(&mut self, attr: usize) -> Result<()> {
        self.bind(attr, SqlValue::Null)
    }

    fn set_bool(&mut self, attr: usize, v: bool) -> Result<()> {
        self.bind(attr, SqlValue::Bool(v))
    }

    fn set_int32(&mut self, attr: usize, v: i32) -> Result<()> {
        self.bind(attr, SqlValue::Int32(v))
    }

    fn set_uint32(&mut self, attr: usize, v: u32) -> Result<()> {
        self.bind(attr, SqlValue::UInt32(v))
    }

    fn set_int64(&mut self, attr: usize, v: i64) -> Result<()> {
        self.bind(attr, SqlValue::Int64(v))
    }

    fn set_uint64(&mut self, attr: usize, v: u64) -> Result<()> {
        self.bind(attr, SqlValue::UInt64(v))
    }

    fn set_float(&mut self, attr: usize, v: f32) -> Result<()> {
        self.bind(attr, SqlValue::Float(v))
    }

    fn set_double(&mut self, attr: usize, v: f64) -> Result<()> {
        self.bind(attr, SqlValue::Double(v))
    }

    fn set_cstring(&mut self, attr: usize, v: &[u8]) -> Result<()> {
        if v.contains(&0) {
            return Err(PgSqlError::InvalidParameter(format!(
                "string bound to input {attr} contains a NUL byte"
            )));
        }
        self.bind(attr, SqlValue::CString(v.to_vec()))
    }

    fn set_date(&mut self, attr: usize, v: NaiveDate) -> Result<()> {
        self.bind(attr, SqlValue::Date(v))
    }

    fn set_timestamp(&mut self, attr: usize, v: NaiveDateTime) -> Result<()> {
        self.bind(attr, SqlValue::Timestamp(v))
    }

    fn set_array_u8(&mut self, attr: usize, v: &[u8]) -> Result<()> {
        self.bind(attr, SqlValue::Bytes(Bytes::copy_from_slice(v)))
    }

    fn set_smart_array_u8(&mut self, attr: usize, v: Bytes) -> Result<()> {
        self.bind(attr, SqlValue::Bytes(v))
    }

    fn execute(&mut self) -> Result<()> {
        self.release_result();
        let params = self.params()?;

        let link = self.db.link()?;
        let result = match link.block_on(link.driver.execute(&self.template, &params)) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(query = %self.name, error = %e, "execute failed");
                return Err(e);
            }
        };
        self.map_columns(&result)?;

        self.num_rows = result.len();
        self.result = Some(result);
        self.mode = QueryMode::Select;
        self.needs_bind = false;
        tracing::debug!(query = %self.name, rows = self.num_rows, "executed");
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        self.release_result();
        let params = self.params()?;

        let link = self.db.link()?;
        let affected = match link.block_on(link.driver.update(&self.template, &params)) {
            Ok(affected) => affected,
            Err(e) => {
                tracing::warn!(query = %self.name, error = %e, "update failed");
                return Err(e);
            }
        };

        self.num_rows = usize::try_from(affected).unwrap_or(usize::MAX);
        self.mode = QueryMode::Update;
        self.needs_bind = false;
        tracing::debug!(query = %self.name, affected, "updated");
        Ok(())
    }

    fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// PostgreSQL has no insert id; use `RETURNING` instead.
    fn generated_key(&self) -> u64 {
        0
    }

    fn fetch(&mut self) -> Result<bool> {
        let Some(result) = self.result.as_ref() else {
            return Ok(false);
        };
        let Some(row) = result.rows.get(self.cursor) else {
            tracing::debug!(query = %self.name, rows = result.len(), "fetch reached end of result");
            return Ok(false);
        };

        // decode the whole row before touching any slot
        let mut values = Vec::with_capacity(self.outputs.len());
        for (index, slot) in self.outputs.iter().enumerate() {
            let value = match row.get(index).and_then(Option::as_deref) {
                Some(raw) => {
                    codec::decode_cell(index, slot.var_type(), result.columns[index].type_oid, raw)?
                }
                None => SqlValue::Null,
            };
            values.push(value);
        }
        for (slot, value) in self.outputs.iter_mut().zip(values) {
            slot.set_value(value);
        }

        self.cursor += 1;
        Ok(true)
    }

    fn tell_row(&self) -> usize {
        if self.result.is_some() {
            self.cursor
        } else {
            0
        }
    }

    fn seek_row(&mut self, row: usize) -> Result<()> {
        let len = self.result.as_ref().map_or(0, RawQueryResult::len);
        if row >= len {
            return Err(PgSqlError::out_of_range("row", row, len));
        }
        self.cursor = row;
        Ok(())
    }

    fn out_attr(&self, name: &str) -> Result<usize> {
        self.columns_by_name.get(name).copied().ok_or_else(|| {
            PgSqlError::InvalidParameter(format!(
                "query '{}' has no output column '{name}'",
                self.name
            ))
        })
    }

    fn out_by_name(&self, name: &str) -> Result<&DbVariable> {
        self.out(self.out_attr(name)?)
    }

    fn out(&self, attr: usize) -> Result<&DbVariable> {
        self.outputs
            .get(attr)
            .ok_or_else(|| PgSqlError::out_of_range("output", attr, self.outputs.len()))
    }

    fn unbind(&mut self) {
        self.needs_bind = false;
    }
}
