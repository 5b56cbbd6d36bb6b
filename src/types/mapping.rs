//! Wire type code (OID) to slot type mapping.

use crate::types::{ArrayTier, VarType};

/// PostgreSQL type identifier.
pub type Oid = u32;

/// PostgreSQL type OIDs the adapter knows about.
pub mod oid {
    use super::Oid;

    /// Server could not infer a parameter type.
    pub const UNKNOWN: Oid = 0;
    pub const BOOL: Oid = 16;
    pub const BYTEA: Oid = 17;
    pub const CHAR: Oid = 18;
    pub const NAME: Oid = 19;
    pub const INT8: Oid = 20;
    pub const INT2: Oid = 21;
    pub const INT4: Oid = 23;
    pub const REGPROC: Oid = 24;
    pub const TEXT: Oid = 25;
    pub const OID: Oid = 26;
    pub const XID: Oid = 28;
    pub const CID: Oid = 29;
    pub const JSON: Oid = 114;
    pub const FLOAT4: Oid = 700;
    pub const FLOAT8: Oid = 701;
    pub const BPCHAR: Oid = 1042;
    pub const VARCHAR: Oid = 1043;
    pub const DATE: Oid = 1082;
    pub const TIME: Oid = 1083;
    pub const TIMESTAMP: Oid = 1114;
    pub const TIMESTAMPTZ: Oid = 1184;
    pub const TIMETZ: Oid = 1266;
    pub const NUMERIC: Oid = 1700;
    pub const VOID: Oid = 2278;
    pub const JSONB: Oid = 3802;
}

/// Maximum size hint for columns that fall through to character data.
pub const DEFAULT_CHAR_SIZE: usize = 256;

/// Maximum size hint for bytea columns.
pub const BYTEA_SIZE: usize = 4096;

/// Maps a column's wire type code to the slot tag and maximum size hint.
///
/// Anything not listed is read as variable-length character data.
pub fn unmap_type(type_oid: Oid) -> (VarType, usize) {
    match type_oid {
        oid::BOOL => (VarType::Bool, 1),
        oid::INT2 | oid::INT4 | oid::OID | oid::REGPROC | oid::XID | oid::CID => {
            (VarType::Int32, 4)
        }
        oid::INT8 => (VarType::Int64, 8),
        oid::NUMERIC | oid::FLOAT4 | oid::FLOAT8 => (VarType::Float64, 8),
        oid::BYTEA => (VarType::ByteArray(ArrayTier::Long), BYTEA_SIZE),
        oid::DATE => (VarType::Date, 4),
        oid::TIMESTAMP | oid::TIMESTAMPTZ => (VarType::Timestamp, 8),
        _ => (VarType::CharArray, DEFAULT_CHAR_SIZE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_family_maps_to_int32() {
        for code in [oid::INT2, oid::INT4, oid::OID, oid::REGPROC, oid::XID, oid::CID] {
            assert_eq!(unmap_type(code), (VarType::Int32, 4), "oid {code}");
        }
        assert_eq!(unmap_type(oid::INT8), (VarType::Int64, 8));
    }

    #[test]
    fn test_float_family_maps_to_double() {
        for code in [oid::NUMERIC, oid::FLOAT4, oid::FLOAT8] {
            assert_eq!(unmap_type(code), (VarType::Float64, 8));
        }
    }

    #[test]
    fn test_binary_and_temporal_types() {
        assert_eq!(unmap_type(oid::BOOL), (VarType::Bool, 1));
        assert_eq!(
            unmap_type(oid::BYTEA),
            (VarType::ByteArray(ArrayTier::Long), 4096)
        );
        assert_eq!(unmap_type(oid::DATE), (VarType::Date, 4));
        assert_eq!(unmap_type(oid::TIMESTAMPTZ), (VarType::Timestamp, 8));
    }

    #[test]
    fn test_unknown_types_fall_back_to_char_data() {
        for code in [oid::VARCHAR, oid::TEXT, oid::TIME, oid::VOID, oid::JSON, 99_999] {
            assert_eq!(unmap_type(code), (VarType::CharArray, DEFAULT_CHAR_SIZE));
        }
    }
}
