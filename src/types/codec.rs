//! Wire encoding of bound parameters and decoding of binary result cells.
//!
//! Both directions use network byte order, independent of the host.

use bytes::Bytes;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::error::{PgSqlError, Result};
use crate::types::mapping::{oid, Oid};
use crate::types::{SqlValue, VarType};

/// Seconds between the Unix epoch and the PostgreSQL epoch (2000-01-01).
const PG_EPOCH_UNIX_SECS: i64 = 946_684_800;

/// `num_days_from_ce` of 2000-01-01.
const PG_EPOCH_DAYS_FROM_CE: i32 = 730_120;

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Wire format of an encoded parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Text,
    Binary,
}

/// A parameter serialized for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedParam {
    pub format: WireFormat,
    pub bytes: Vec<u8>,
}

impl EncodedParam {
    fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            format: WireFormat::Binary,
            bytes: bytes.into(),
        }
    }

    fn text(text: impl Into<String>) -> Self {
        Self {
            format: WireFormat::Text,
            bytes: text.into().into_bytes(),
        }
    }
}

/// Serializes a bound value for a parameter the server declared as `param_oid`.
///
/// Values travel in binary when the declared type is their natural wire type
/// and as text otherwise, leaving the conversion to the server.
/// Returns `None` for SQL NULL.
pub fn encode_param(value: &SqlValue, param_oid: Oid) -> Result<Option<EncodedParam>> {
    let encoded = match value {
        SqlValue::Null => return Ok(None),
        SqlValue::Bool(v) => match param_oid {
            oid::BOOL => EncodedParam::binary([u8::from(*v)]),
            _ => EncodedParam::text(if *v { "t" } else { "f" }),
        },
        SqlValue::Int32(v) => encode_integer(i128::from(*v), param_oid)?,
        SqlValue::UInt32(v) => encode_integer(i128::from(*v), param_oid)?,
        SqlValue::Int64(v) => encode_integer(i128::from(*v), param_oid)?,
        SqlValue::UInt64(v) => encode_integer(i128::from(*v), param_oid)?,
        SqlValue::Float(v) => match param_oid {
            oid::FLOAT4 => EncodedParam::binary(v.to_be_bytes()),
            oid::FLOAT8 => EncodedParam::binary(f64::from(*v).to_be_bytes()),
            _ => EncodedParam::text(float_text(f64::from(*v), v.to_string())),
        },
        SqlValue::Double(v) => match param_oid {
            oid::FLOAT8 => EncodedParam::binary(v.to_be_bytes()),
            _ => EncodedParam::text(float_text(*v, v.to_string())),
        },
        SqlValue::CString(_) | SqlValue::CharArray(_) => {
            let text = value.text_bytes().unwrap_or_default();
            if param_oid == oid::BYTEA {
                EncodedParam::binary(text)
            } else {
                if text.contains(&0) {
                    return Err(PgSqlError::Encode(
                        "character data contains a NUL byte".to_string(),
                    ));
                }
                EncodedParam {
                    format: WireFormat::Text,
                    bytes: text.to_vec(),
                }
            }
        }
        SqlValue::Bytes(v) => EncodedParam::binary(v.to_vec()),
        SqlValue::Date(v) => match param_oid {
            oid::DATE => EncodedParam::binary(date_to_days(*v).to_be_bytes()),
            oid::TIMESTAMP | oid::TIMESTAMPTZ => {
                let midnight = v.and_hms_opt(0, 0, 0).ok_or_else(|| {
                    PgSqlError::Encode(format!("date {v} has no midnight"))
                })?;
                EncodedParam::binary(timestamp_to_micros(midnight).to_be_bytes())
            }
            _ => EncodedParam::text(v.format("%Y-%m-%d").to_string()),
        },
        SqlValue::Timestamp(v) => match param_oid {
            oid::TIMESTAMP | oid::TIMESTAMPTZ => {
                EncodedParam::binary(timestamp_to_micros(*v).to_be_bytes())
            }
            _ => EncodedParam::text(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        },
    };
    Ok(Some(encoded))
}

fn encode_integer(v: i128, param_oid: Oid) -> Result<EncodedParam> {
    let overflow = |name: &str| PgSqlError::Encode(format!("{v} does not fit in {name}"));
    Ok(match param_oid {
        oid::INT2 => {
            let v = i16::try_from(v).map_err(|_| overflow("int2"))?;
            EncodedParam::binary(v.to_be_bytes())
        }
        oid::INT4 => {
            let v = i32::try_from(v).map_err(|_| overflow("int4"))?;
            EncodedParam::binary(v.to_be_bytes())
        }
        oid::INT8 => {
            let v = i64::try_from(v).map_err(|_| overflow("int8"))?;
            EncodedParam::binary(v.to_be_bytes())
        }
        oid::OID | oid::REGPROC | oid::XID | oid::CID => {
            let v = u32::try_from(v).map_err(|_| overflow("an object identifier"))?;
            EncodedParam::binary(v.to_be_bytes())
        }
        _ => EncodedParam::text(v.to_string()),
    })
}

/// Shortest round-trippable text, with PostgreSQL's spelling of the specials.
fn float_text(v: f64, shortest: String) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "Infinity".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        shortest
    }
}

fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - PG_EPOCH_DAYS_FROM_CE
}

fn timestamp_to_micros(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros() - PG_EPOCH_UNIX_SECS * 1_000_000
}

/// Decodes one binary result cell into a value for a slot tagged `var_type`.
pub fn decode_cell(
    column: usize,
    var_type: VarType,
    type_oid: Oid,
    raw: &[u8],
) -> Result<SqlValue> {
    let decode_err = |reason: String| PgSqlError::Decode { column, reason };

    let value = match (var_type, raw.len()) {
        (VarType::Bool, 1) => SqlValue::Bool(raw[0] != 0),
        (VarType::Int32, 2) => SqlValue::Int32(i32::from(i16::from_be_bytes(be(raw)))),
        (VarType::Int32, 4) => SqlValue::Int32(i32::from_be_bytes(be(raw))),
        (VarType::UInt32, 4) => SqlValue::UInt32(u32::from_be_bytes(be(raw))),
        (VarType::Int64, 2) => SqlValue::Int64(i64::from(i16::from_be_bytes(be(raw)))),
        (VarType::Int64, 4) => SqlValue::Int64(i64::from(i32::from_be_bytes(be(raw)))),
        (VarType::Int64, 8) => SqlValue::Int64(i64::from_be_bytes(be(raw))),
        (VarType::UInt64, 4) => SqlValue::UInt64(u64::from(u32::from_be_bytes(be(raw)))),
        (VarType::UInt64, 8) => SqlValue::UInt64(u64::from_be_bytes(be(raw))),
        (VarType::Float32, 4) => SqlValue::Float(f32::from_be_bytes(be(raw))),
        (VarType::Float32, 8) => SqlValue::Float(f64::from_be_bytes(be(raw)) as f32),
        (VarType::Float64, _) if type_oid == oid::NUMERIC => {
            SqlValue::Double(decode_numeric(raw).map_err(decode_err)?)
        }
        (VarType::Float64, 4) => SqlValue::Double(f64::from(f32::from_be_bytes(be(raw)))),
        (VarType::Float64, 8) => SqlValue::Double(f64::from_be_bytes(be(raw))),
        (VarType::CString, _) => SqlValue::CString(raw.to_vec()),
        (VarType::CharArray, len) => {
            let mut chars = Vec::with_capacity(len + 1);
            chars.extend_from_slice(raw);
            chars.push(0);
            SqlValue::CharArray(chars)
        }
        (VarType::ByteArray(_), _) => SqlValue::Bytes(Bytes::copy_from_slice(raw)),
        (VarType::Date, 4) => {
            let days = i32::from_be_bytes(be(raw));
            SqlValue::Date(days_to_date(days).ok_or_else(|| {
                decode_err(format!("date {days} days from 2000-01-01 is not representable"))
            })?)
        }
        (VarType::Timestamp, 8) => {
            let micros = i64::from_be_bytes(be(raw));
            SqlValue::Timestamp(micros_to_timestamp(micros).ok_or_else(|| {
                decode_err(format!("timestamp {micros}us from 2000-01-01 is not representable"))
            })?)
        }
        (_, len) => return Err(decode_err(format!("{len} bytes cannot hold {var_type:?}"))),
    };
    Ok(value)
}

/// Copies a slice whose length the caller has already matched.
fn be<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(raw);
    out
}

fn days_to_date(days: i32) -> Option<NaiveDate> {
    // i32::MIN and i32::MAX encode -infinity and infinity
    if days == i32::MIN || days == i32::MAX {
        return None;
    }
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(PG_EPOCH_DAYS_FROM_CE)?)
}

fn micros_to_timestamp(micros: i64) -> Option<NaiveDateTime> {
    if micros == i64::MIN || micros == i64::MAX {
        return None;
    }
    let secs = micros.div_euclid(1_000_000).checked_add(PG_EPOCH_UNIX_SECS)?;
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
}

/// Decodes the binary NUMERIC layout: digit count, weight, sign, display
/// scale, then base-10000 digit groups.
fn decode_numeric(raw: &[u8]) -> std::result::Result<f64, String> {
    if raw.len() < 8 {
        return Err(format!("numeric header needs 8 bytes, got {}", raw.len()));
    }
    let word = |i: usize| u16::from_be_bytes([raw[i], raw[i + 1]]);
    let ndigits = usize::from(word(0));
    let weight = i64::from(word(2) as i16);
    let sign = word(4);

    match sign {
        NUMERIC_NAN => return Ok(f64::NAN),
        NUMERIC_PINF => return Ok(f64::INFINITY),
        NUMERIC_NINF => return Ok(f64::NEG_INFINITY),
        NUMERIC_POS | NUMERIC_NEG => {}
        other => return Err(format!("unknown numeric sign {other:#06x}")),
    }
    if raw.len() != 8 + 2 * ndigits {
        return Err(format!(
            "numeric with {ndigits} digit groups cannot be {} bytes",
            raw.len()
        ));
    }
    if ndigits == 0 {
        return Ok(0.0);
    }

    let mut text = String::with_capacity(ndigits * 4 + 8);
    if sign == NUMERIC_NEG {
        text.push('-');
    }
    for i in 0..ndigits {
        let group = word(8 + 2 * i);
        if group > 9999 {
            return Err(format!("numeric digit group {group} out of range"));
        }
        text.push_str(&format!("{group:04}"));
    }
    let exponent = 4 * (weight - ndigits as i64 + 1);
    text.push_str(&format!("e{exponent}"));
    text.parse::<f64>().map_err(|e| e.to_string())
}
