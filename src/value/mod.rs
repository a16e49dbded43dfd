//! The BSON value model: the closed sum of every type BSON's binary wire
//! format can carry (spec §3, §4.D).
//!
//! Widened from a 14-member subset to the full ~20-variant BSON type set and
//! built on top of [`crate::document::Document`] / [`crate::array::Array`]
//! rather than a case-insensitive document.

use std::fmt;

use crate::array::Array;
use crate::binary::Binary;
use crate::datetime::DateTime;
use crate::decimal128::Decimal128;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::oid::ObjectId;
use crate::regex::Regex;
use crate::timestamp::Timestamp;

/// The one-byte (or, for MinKey, one-signed-byte) BSON element type tag.
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BsonType {
    Double = 0x01,
    String = 0x02,
    Document = 0x03,
    Array = 0x04,
    Binary = 0x05,
    Undefined = 0x06,
    ObjectId = 0x07,
    Boolean = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    RegularExpression = 0x0B,
    DbPointer = 0x0C,
    JavaScript = 0x0D,
    Symbol = 0x0E,
    JavaScriptWithScope = 0x0F,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
    Decimal128 = 0x13,
    MinKey = -1,
    MaxKey = 0x7F,
}

impl BsonType {
    pub fn tag(self) -> i8 {
        self as i8
    }

    pub fn from_tag(tag: i8) -> Option<BsonType> {
        Some(match tag {
            0x01 => BsonType::Double,
            0x02 => BsonType::String,
            0x03 => BsonType::Document,
            0x04 => BsonType::Array,
            0x05 => BsonType::Binary,
            0x06 => BsonType::Undefined,
            0x07 => BsonType::ObjectId,
            0x08 => BsonType::Boolean,
            0x09 => BsonType::DateTime,
            0x0A => BsonType::Null,
            0x0B => BsonType::RegularExpression,
            0x0C => BsonType::DbPointer,
            0x0D => BsonType::JavaScript,
            0x0E => BsonType::Symbol,
            0x0F => BsonType::JavaScriptWithScope,
            0x10 => BsonType::Int32,
            0x11 => BsonType::Timestamp,
            0x12 => BsonType::Int64,
            0x13 => BsonType::Decimal128,
            -1 => BsonType::MinKey,
            0x7F => BsonType::MaxKey,
            _ => return None,
        })
    }

    /// Name used in `Error::unexpected_type` messages and EJSON diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            BsonType::Double => "Double",
            BsonType::String => "String",
            BsonType::Document => "Document",
            BsonType::Array => "Array",
            BsonType::Binary => "Binary",
            BsonType::Undefined => "Undefined",
            BsonType::ObjectId => "ObjectId",
            BsonType::Boolean => "Boolean",
            BsonType::DateTime => "DateTime",
            BsonType::Null => "Null",
            BsonType::RegularExpression => "RegularExpression",
            BsonType::DbPointer => "DbPointer",
            BsonType::JavaScript => "JavaScript",
            BsonType::Symbol => "Symbol",
            BsonType::JavaScriptWithScope => "JavaScriptWithScope",
            BsonType::Int32 => "Int32",
            BsonType::Timestamp => "Timestamp",
            BsonType::Int64 => "Int64",
            BsonType::Decimal128 => "Decimal128",
            BsonType::MinKey => "MinKey",
            BsonType::MaxKey => "MaxKey",
        }
    }
}

/// A DBPointer value (deprecated BSON type, kept only because the wire
/// format still defines it): a namespace string plus an ObjectId.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbPointer {
    pub namespace: String,
    pub id: ObjectId,
}

/// Deprecated BSON type carrying a JavaScript expression alongside the
/// scope document it closed over.
#[derive(Debug, Clone, PartialEq)]
pub struct JavaScriptWithScope {
    pub code: String,
    pub scope: Document,
}

/// Any value BSON's binary format can represent.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Double(f64),
    String(String),
    Document(Document),
    Array(Array),
    Binary(Binary),
    Undefined,
    ObjectId(ObjectId),
    Boolean(bool),
    DateTime(DateTime),
    Null,
    RegularExpression(Regex),
    DbPointer(DbPointer),
    JavaScript(String),
    Symbol(String),
    JavaScriptWithScope(JavaScriptWithScope),
    Int32(i32),
    Timestamp(Timestamp),
    Int64(i64),
    Decimal128(Decimal128),
    MinKey,
    MaxKey,
}

macro_rules! narrowing_accessor {
    ($is_name:ident, $as_name:ident, $as_mut_name:ident, $variant:ident, $ty:ty) => {
        pub fn $is_name(&self) -> bool {
            matches!(self, Value::$variant(_))
        }

        pub fn $as_name(&self) -> Result<&$ty> {
            match self {
                Value::$variant(v) => Ok(v),
                other => Err(Error::unexpected_type(
                    BsonType::$variant.name(),
                    other.ty().name(),
                )),
            }
        }

        pub fn $as_mut_name(&mut self) -> Result<&mut $ty> {
            let actual = self.ty().name();
            match self {
                Value::$variant(v) => Ok(v),
                _ => Err(Error::unexpected_type(BsonType::$variant.name(), actual)),
            }
        }
    };
}

impl Value {
    pub fn ty(&self) -> BsonType {
        match self {
            Value::Double(_) => BsonType::Double,
            Value::String(_) => BsonType::String,
            Value::Document(_) => BsonType::Document,
            Value::Array(_) => BsonType::Array,
            Value::Binary(_) => BsonType::Binary,
            Value::Undefined => BsonType::Undefined,
            Value::ObjectId(_) => BsonType::ObjectId,
            Value::Boolean(_) => BsonType::Boolean,
            Value::DateTime(_) => BsonType::DateTime,
            Value::Null => BsonType::Null,
            Value::RegularExpression(_) => BsonType::RegularExpression,
            Value::DbPointer(_) => BsonType::DbPointer,
            Value::JavaScript(_) => BsonType::JavaScript,
            Value::Symbol(_) => BsonType::Symbol,
            Value::JavaScriptWithScope(_) => BsonType::JavaScriptWithScope,
            Value::Int32(_) => BsonType::Int32,
            Value::Timestamp(_) => BsonType::Timestamp,
            Value::Int64(_) => BsonType::Int64,
            Value::Decimal128(_) => BsonType::Decimal128,
            Value::MinKey => BsonType::MinKey,
            Value::MaxKey => BsonType::MaxKey,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    narrowing_accessor!(is_double, as_double, as_double_mut, Double, f64);
    narrowing_accessor!(is_str, as_str_value, as_str_value_mut, String, String);
    narrowing_accessor!(is_document, as_document, as_document_mut, Document, Document);
    narrowing_accessor!(is_array, as_array, as_array_mut, Array, Array);
    narrowing_accessor!(is_binary, as_binary, as_binary_mut, Binary, Binary);
    narrowing_accessor!(is_object_id, as_object_id, as_object_id_mut, ObjectId, ObjectId);
    narrowing_accessor!(is_boolean, as_boolean, as_boolean_mut, Boolean, bool);
    narrowing_accessor!(is_date_time, as_date_time, as_date_time_mut, DateTime, DateTime);
    narrowing_accessor!(is_regex, as_regex, as_regex_mut, RegularExpression, Regex);
    narrowing_accessor!(is_db_pointer, as_db_pointer, as_db_pointer_mut, DbPointer, DbPointer);
    narrowing_accessor!(is_int32, as_int32, as_int32_mut, Int32, i32);
    narrowing_accessor!(is_timestamp, as_timestamp, as_timestamp_mut, Timestamp, Timestamp);
    narrowing_accessor!(is_int64, as_int64, as_int64_mut, Int64, i64);
    narrowing_accessor!(is_decimal128, as_decimal128, as_decimal128_mut, Decimal128, Decimal128);

    pub fn as_str(&self) -> Result<&str> {
        self.as_str_value().map(String::as_str)
    }

    pub fn as_i32(&self) -> Result<i32> {
        self.as_int32().copied()
    }

    pub fn as_i64(&self) -> Result<i64> {
        self.as_int64().copied()
    }

    pub fn as_f64(&self) -> Result<f64> {
        self.as_double().copied()
    }

    /// Numeric widening: a BSON numeric type read as `f64`, truncating where
    /// necessary. `Int64`/`Int32` convert exactly; `Decimal128` is not a
    /// numeric conversion source since it cannot round-trip through `f64`
    /// without loss in general (spec §4.D).
    pub fn as_number(&self) -> Result<f64> {
        match self {
            Value::Int32(v) => Ok(*v as f64),
            Value::Int64(v) => Ok(*v as f64),
            Value::Double(v) => Ok(*v),
            other => Err(Error::unexpected_type("numeric", other.ty().name())),
        }
    }

    /// Numeric value as `i32`: `Int32` exactly, `Int64`/`Double` truncated
    /// (spec §4.D's "int_value" conversion).
    pub fn int_value(&self) -> Result<i32> {
        match self {
            Value::Int32(v) => Ok(*v),
            Value::Int64(v) => Ok(*v as i32),
            Value::Double(v) => Ok(*v as i32),
            other => Err(Error::unexpected_type("numeric", other.ty().name())),
        }
    }

    /// Numeric value as `i64`: `Int32`/`Int64` exactly, `Double` truncated
    /// (spec §4.D's "long_value" conversion).
    pub fn long_value(&self) -> Result<i64> {
        match self {
            Value::Int32(v) => Ok(*v as i64),
            Value::Int64(v) => Ok(*v),
            Value::Double(v) => Ok(*v as i64),
            other => Err(Error::unexpected_type("numeric", other.ty().name())),
        }
    }

    /// Numeric value as `f64`: `Int32`/`Int64` widened, `Double` exact
    /// (spec §4.D's "double_value" conversion). Same rule as [`Value::as_number`].
    pub fn double_value(&self) -> Result<f64> {
        self.as_number()
    }
}

impl fmt::Display for BsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

mod from_impls {
    use super::*;

    impl From<f64> for Value {
        fn from(v: f64) -> Value {
            Value::Double(v)
        }
    }

    impl From<String> for Value {
        fn from(v: String) -> Value {
            Value::String(v)
        }
    }

    impl From<&str> for Value {
        fn from(v: &str) -> Value {
            Value::String(v.to_string())
        }
    }

    impl From<Document> for Value {
        fn from(v: Document) -> Value {
            Value::Document(v)
        }
    }

    impl From<Array> for Value {
        fn from(v: Array) -> Value {
            Value::Array(v)
        }
    }

    impl From<Binary> for Value {
        fn from(v: Binary) -> Value {
            Value::Binary(v)
        }
    }

    impl From<ObjectId> for Value {
        fn from(v: ObjectId) -> Value {
            Value::ObjectId(v)
        }
    }

    impl From<bool> for Value {
        fn from(v: bool) -> Value {
            Value::Boolean(v)
        }
    }

    impl From<DateTime> for Value {
        fn from(v: DateTime) -> Value {
            Value::DateTime(v)
        }
    }

    impl From<Regex> for Value {
        fn from(v: Regex) -> Value {
            Value::RegularExpression(v)
        }
    }

    impl From<i32> for Value {
        fn from(v: i32) -> Value {
            Value::Int32(v)
        }
    }

    impl From<Timestamp> for Value {
        fn from(v: Timestamp) -> Value {
            Value::Timestamp(v)
        }
    }

    impl From<i64> for Value {
        fn from(v: i64) -> Value {
            Value::Int64(v)
        }
    }

    impl From<Decimal128> for Value {
        fn from(v: Decimal128) -> Value {
            Value::Decimal128(v)
        }
    }

    impl From<Vec<Value>> for Value {
        fn from(v: Vec<Value>) -> Value {
            Value::Array(v.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ty_round_trips_through_tag() {
        for &t in &[
            BsonType::Double,
            BsonType::String,
            BsonType::Document,
            BsonType::Array,
            BsonType::Binary,
            BsonType::Undefined,
            BsonType::ObjectId,
            BsonType::Boolean,
            BsonType::DateTime,
            BsonType::Null,
            BsonType::RegularExpression,
            BsonType::DbPointer,
            BsonType::JavaScript,
            BsonType::Symbol,
            BsonType::JavaScriptWithScope,
            BsonType::Int32,
            BsonType::Timestamp,
            BsonType::Int64,
            BsonType::Decimal128,
            BsonType::MinKey,
            BsonType::MaxKey,
        ] {
            assert_eq!(BsonType::from_tag(t.tag()), Some(t));
        }
    }

    #[test]
    fn narrowing_accessor_succeeds_on_matching_variant() {
        let v = Value::Int32(42);
        assert_eq!(*v.as_int32().unwrap(), 42);
    }

    #[test]
    fn narrowing_accessor_reports_actual_type_on_mismatch() {
        let v = Value::Int32(42);
        let err = v.as_str_value().unwrap_err();
        assert!(err.to_string().contains("String"));
        assert!(err.to_string().contains("Int32"));
    }

    #[test]
    fn as_number_widens_integers_but_rejects_decimal128() {
        assert_eq!(Value::Int32(3).as_number().unwrap(), 3.0);
        assert_eq!(Value::Int64(3).as_number().unwrap(), 3.0);
        assert!(Value::Decimal128(Decimal128::POSITIVE_ZERO)
            .as_number()
            .is_err());
    }

    #[test]
    fn int_value_truncates_from_double_and_long() {
        assert_eq!(Value::Int64(9_000_000_000).int_value().unwrap(), 9_000_000_000i64 as i32);
        assert_eq!(Value::Double(3.9).int_value().unwrap(), 3);
    }

    #[test]
    fn long_value_truncates_from_double() {
        assert_eq!(Value::Double(3.9).long_value().unwrap(), 3);
        assert_eq!(Value::Int32(7).long_value().unwrap(), 7i64);
    }

    #[test]
    fn double_value_widens_integers() {
        assert_eq!(Value::Int32(3).double_value().unwrap(), 3.0);
        assert_eq!(Value::Int64(3).double_value().unwrap(), 3.0);
    }
}
