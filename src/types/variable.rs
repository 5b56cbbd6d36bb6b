use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{PgSqlError, Result};
use crate::types::SqlValue;

/// Size tier of a byte array variable.
/// Only sizes the variable's representation; it has no wire meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayTier {
    /// Fewer than 2^8 bytes.
    Tiny,
    /// Fewer than 2^16 bytes.
    Regular,
    /// Fewer than 2^24 bytes.
    Medium,
    Long,
}

impl ArrayTier {
    pub fn for_len(len: usize) -> Self {
        if len < 1 << 8 {
            ArrayTier::Tiny
        } else if len < 1 << 16 {
            ArrayTier::Regular
        } else if len < 1 << 24 {
            ArrayTier::Medium
        } else {
            ArrayTier::Long
        }
    }
}

/// Internal type tag of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Bool,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    CString,
    CharArray,
    ByteArray(ArrayTier),
    Date,
    Timestamp,
}

impl VarType {
    /// The tag a bound value is stored under.
    /// Returns `None` for `SqlValue::Null`, which has no kind of its own.
    pub fn of(value: &SqlValue) -> Option<Self> {
        Some(match value {
            SqlValue::Null => return None,
            SqlValue::Bool(_) => VarType::Bool,
            SqlValue::Int32(_) => VarType::Int32,
            SqlValue::UInt32(_) => VarType::UInt32,
            SqlValue::Int64(_) => VarType::Int64,
            SqlValue::UInt64(_) => VarType::UInt64,
            SqlValue::Float(_) => VarType::Float32,
            SqlValue::Double(_) => VarType::Float64,
            SqlValue::CString(_) => VarType::CString,
            SqlValue::CharArray(_) => VarType::CharArray,
            SqlValue::Bytes(b) => VarType::ByteArray(ArrayTier::for_len(b.len())),
            SqlValue::Date(_) => VarType::Date,
            SqlValue::Timestamp(_) => VarType::Timestamp,
        })
    }

    /// Fixed wire size for scalar kinds, `None` for variable-size kinds.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            VarType::Bool => Some(1),
            VarType::Int32 | VarType::UInt32 | VarType::Float32 | VarType::Date => Some(4),
            VarType::Int64 | VarType::UInt64 | VarType::Float64 | VarType::Timestamp => Some(8),
            VarType::CString | VarType::CharArray | VarType::ByteArray(_) => None,
        }
    }
}

/// A single positional input or output binding point.
///
/// Holds the slot's type tag, a maximum size hint, the current value and
/// its byte length. A null slot keeps its tag.
#[derive(Debug, Clone, PartialEq)]
pub struct DbVariable {
    var_type: VarType,
    max_size: usize,
    value: SqlValue,
    length: usize,
}

impl DbVariable {
    /// Creates an empty (null) output slot.
    pub fn new(var_type: VarType, max_size: usize) -> Self {
        Self {
            var_type,
            max_size,
            value: SqlValue::Null,
            length: 0,
        }
    }

    /// Wraps a bound input value. A null input is tagged as a C-string.
    pub fn input(value: SqlValue) -> Self {
        let var_type = VarType::of(&value).unwrap_or(VarType::CString);
        let length = value_length(&value);
        Self {
            var_type,
            max_size: var_type.fixed_size().unwrap_or(length),
            value,
            length,
        }
    }

    pub fn var_type(&self) -> VarType {
        self.var_type
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Byte length of the current value.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn set_null(&mut self) {
        self.value = SqlValue::Null;
        self.length = 0;
    }

    pub fn value(&self) -> &SqlValue {
        &self.value
    }

    pub(crate) fn set_value(&mut self, value: SqlValue) {
        self.length = value_length(&value);
        self.value = value;
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self.value {
            SqlValue::Bool(v) => Ok(v),
            _ => Err(self.mismatch("bool")),
        }
    }

    pub fn as_i32(&self) -> Result<i32> {
        match self.value {
            SqlValue::Int32(v) => Ok(v),
            _ => Err(self.mismatch("int32")),
        }
    }

    /// Unsigned view of a 32-bit slot; object-id columns arrive as Int32.
    pub fn as_u32(&self) -> Result<u32> {
        match self.value {
            SqlValue::UInt32(v) => Ok(v),
            SqlValue::Int32(v) => Ok(v as u32),
            _ => Err(self.mismatch("uint32")),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self.value {
            SqlValue::Int64(v) => Ok(v),
            SqlValue::Int32(v) => Ok(i64::from(v)),
            SqlValue::UInt32(v) => Ok(i64::from(v)),
            _ => Err(self.mismatch("int64")),
        }
    }

    pub fn as_u64(&self) -> Result<u64> {
        match self.value {
            SqlValue::UInt64(v) => Ok(v),
            SqlValue::UInt32(v) => Ok(u64::from(v)),
            SqlValue::Int64(v) => Ok(v as u64),
            _ => Err(self.mismatch("uint64")),
        }
    }

    pub fn as_f32(&self) -> Result<f32> {
        match self.value {
            SqlValue::Float(v) => Ok(v),
            _ => Err(self.mismatch("float")),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self.value {
            SqlValue::Double(v) => Ok(v),
            SqlValue::Float(v) => Ok(f64::from(v)),
            SqlValue::Int32(v) => Ok(f64::from(v)),
            _ => Err(self.mismatch("double")),
        }
    }

    /// Raw bytes of a byte array slot.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        match &self.value {
            SqlValue::Bytes(v) => Ok(v.as_ref()),
            _ => Err(self.mismatch("byte array")),
        }
    }

    /// Character data including its trailing NUL.
    pub fn as_char_array(&self) -> Result<&[u8]> {
        match &self.value {
            SqlValue::CharArray(v) | SqlValue::CString(v) => Ok(v.as_slice()),
            _ => Err(self.mismatch("char array")),
        }
    }

    /// Character data as UTF-8, without the terminator.
    pub fn as_str(&self) -> Result<&str> {
        let bytes = self
            .value
            .text_bytes()
            .ok_or_else(|| self.mismatch("string"))?;
        std::str::from_utf8(bytes).map_err(|_| PgSqlError::TypeMismatch {
            expected: "utf-8 string",
            found: "non utf-8 bytes",
        })
    }

    pub fn as_date(&self) -> Result<NaiveDate> {
        match self.value {
            SqlValue::Date(v) => Ok(v),
            SqlValue::Timestamp(v) => Ok(v.date()),
            _ => Err(self.mismatch("date")),
        }
    }

    pub fn as_timestamp(&self) -> Result<NaiveDateTime> {
        match self.value {
            SqlValue::Timestamp(v) => Ok(v),
            _ => Err(self.mismatch("timestamp")),
        }
    }

    fn mismatch(&self, expected: &'static str) -> PgSqlError {
        PgSqlError::TypeMismatch {
            expected,
            found: self.value.kind(),
        }
    }
}

fn value_length(value: &SqlValue) -> usize {
    match value {
        SqlValue::Null => 0,
        SqlValue::CString(v) | SqlValue::CharArray(v) => v.len(),
        SqlValue::Bytes(v) => v.len(),
        other => VarType::of(other)
            .and_then(|t| t.fixed_size())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_array_tier_boundaries() {
        assert_eq!(ArrayTier::for_len(0), ArrayTier::Tiny);
        assert_eq!(ArrayTier::for_len(255), ArrayTier::Tiny);
        assert_eq!(ArrayTier::for_len(256), ArrayTier::Regular);
        assert_eq!(ArrayTier::for_len(65_535), ArrayTier::Regular);
        assert_eq!(ArrayTier::for_len(65_536), ArrayTier::Medium);
        assert_eq!(ArrayTier::for_len(1 << 24), ArrayTier::Long);
    }

    #[test]
    fn test_input_variable_takes_tag_and_length() {
        let var = DbVariable::input(SqlValue::Bytes(Bytes::from(vec![0u8; 300])));
        assert_eq!(var.var_type(), VarType::ByteArray(ArrayTier::Regular));
        assert_eq!(var.length(), 300);

        let var = DbVariable::input(SqlValue::Int64(5));
        assert_eq!(var.var_type(), VarType::Int64);
        assert_eq!(var.length(), 8);
    }

    #[test]
    fn test_null_slot_keeps_tag() {
        let mut var = DbVariable::new(VarType::Int32, 4);
        var.set_value(SqlValue::Int32(9));
        assert_eq!(var.as_i32().unwrap(), 9);

        var.set_null();
        assert!(var.is_null());
        assert_eq!(var.var_type(), VarType::Int32);
        assert!(matches!(
            var.as_i32(),
            Err(PgSqlError::TypeMismatch { found: "null", .. })
        ));
    }

    #[test]
    fn test_widening_accessors() {
        let mut var = DbVariable::new(VarType::Int32, 4);
        var.set_value(SqlValue::Int32(-1));
        assert_eq!(var.as_i64().unwrap(), -1);
        assert_eq!(var.as_u32().unwrap(), u32::MAX);
        assert_eq!(var.as_f64().unwrap(), -1.0);
        assert!(var.as_bool().is_err());
    }

    #[test]
    fn test_as_str_strips_terminator() {
        let mut var = DbVariable::new(VarType::CharArray, 256);
        var.set_value(SqlValue::CharArray("héllo\0".as_bytes().to_vec()));
        assert_eq!(var.as_str().unwrap(), "héllo");
        assert_eq!(var.as_char_array().unwrap().last(), Some(&0));
        assert_eq!(var.length(), "héllo".len() + 1);
    }
}
