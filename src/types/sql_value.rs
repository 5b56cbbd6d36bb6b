use std::fmt;

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};

/// A typed value bound to an input slot or fetched into an output slot.
/// Drivers are responsible for converting these to their native types.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    /// C-string content, without the terminator.
    CString(Vec<u8>),
    /// Fetched character data, including the trailing NUL.
    CharArray(Vec<u8>),
    Bytes(Bytes),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int32(_) => "int32",
            SqlValue::UInt32(_) => "uint32",
            SqlValue::Int64(_) => "int64",
            SqlValue::UInt64(_) => "uint64",
            SqlValue::Float(_) => "float",
            SqlValue::Double(_) => "double",
            SqlValue::CString(_) => "cstring",
            SqlValue::CharArray(_) => "char array",
            SqlValue::Bytes(_) => "byte array",
            SqlValue::Date(_) => "date",
            SqlValue::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Character content without any trailing terminator.
    pub(crate) fn text_bytes(&self) -> Option<&[u8]> {
        match self {
            SqlValue::CString(v) => Some(v.as_slice()),
            SqlValue::CharArray(v) => Some(v.strip_suffix(&[0]).unwrap_or(v.as_slice())),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::Int32(v) => write!(f, "{v}"),
            SqlValue::UInt32(v) => write!(f, "{v}"),
            SqlValue::Int64(v) => write!(f, "{v}"),
            SqlValue::UInt64(v) => write!(f, "{v}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Double(v) => write!(f, "{v}"),
            SqlValue::CString(_) | SqlValue::CharArray(_) => {
                let text = self.text_bytes().unwrap_or_default();
                f.write_str(&String::from_utf8_lossy(text))
            }
            SqlValue::Bytes(v) => {
                f.write_str("\\x")?;
                for b in v.iter() {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            SqlValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            SqlValue::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::CString(value.as_bytes().to_vec())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::CString(value.into_bytes())
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int32(value)
    }
}

impl From<u32> for SqlValue {
    fn from(value: u32) -> Self {
        SqlValue::UInt32(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int64(value)
    }
}

impl From<u64> for SqlValue {
    fn from(value: u64) -> Self {
        SqlValue::UInt64(value)
    }
}

impl From<f32> for SqlValue {
    fn from(value: f32) -> Self {
        SqlValue::Float(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Double(value)
    }
}

impl From<&[u8]> for SqlValue {
    fn from(value: &[u8]) -> Self {
        SqlValue::Bytes(Bytes::copy_from_slice(value))
    }
}

impl From<Bytes> for SqlValue {
    fn from(value: Bytes) -> Self {
        SqlValue::Bytes(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_none_is_null() {
        let value: SqlValue = Option::<i32>::None.into();
        assert!(value.is_null());
        assert_eq!(SqlValue::from(Some(7)), SqlValue::Int32(7));
    }

    #[test]
    fn test_char_array_display_drops_terminator() {
        let value = SqlValue::CharArray(b"abc\0".to_vec());
        assert_eq!(value.to_string(), "abc");
        assert_eq!(value.text_bytes(), Some(&b"abc"[..]));
    }

    #[test]
    fn test_bytes_display_as_hex() {
        let value = SqlValue::from(&[0xde_u8, 0xad][..]);
        assert_eq!(value.to_string(), "\\xdead");
    }
}
