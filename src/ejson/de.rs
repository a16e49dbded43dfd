//! EJSON parser: `serde_json::Value` → `Value`/`Document` (spec §4.G, §6.2).
//!
//! Dispatch rule: an object's *first* key decides whether it's a recognized
//! `$`-envelope or an ordinary document (spec §4.G). Bare JSON primitives
//! decode directly, with numbers narrowed to the smallest BSON integer type
//! that holds them exactly before falling back to `Double`.

use serde_json::Value as Json;

use crate::binary::{Binary, BinarySubtype};
use crate::datetime::DateTime;
use crate::decimal128::Decimal128;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::oid::ObjectId;
use crate::regex::Regex;
use crate::timestamp::Timestamp;
use crate::value::{DbPointer, JavaScriptWithScope, Value};

pub fn json_to_document(json: &Json) -> Result<Document> {
    match json_to_value(json)? {
        Value::Document(doc) => Ok(doc),
        other => Err(Error::unexpected_type("Document", other.ty().name())),
    }
}

pub fn json_to_value(json: &Json) -> Result<Value> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::Number(n) => Ok(decode_bare_number(n)),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Array(items) => {
            let values: Result<Vec<Value>> = items.iter().map(json_to_value).collect();
            Ok(Value::Array(values?.into()))
        }
        Json::Object(map) => match map.keys().next() {
            Some(first) if first.starts_with('$') => decode_envelope(first, map),
            _ => {
                let mut doc = Document::new();
                for (key, value) in map {
                    check_no_null_byte(key)?;
                    doc.insert(key.clone(), json_to_value(value)?)?;
                }
                Ok(Value::Document(doc))
            }
        },
    }
}

/// A bare JSON number with no envelope decodes to the narrowest BSON
/// integer type that represents it exactly, falling back to `Double`.
fn decode_bare_number(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        if let Ok(i32_value) = i32::try_from(i) {
            return Value::Int32(i32_value);
        }
        return Value::Int64(i);
    }
    Value::Double(n.as_f64().unwrap_or(0.0))
}

fn decode_envelope(key: &str, map: &serde_json::Map<String, Json>) -> Result<Value> {
    match key {
        "$numberDouble" => Ok(Value::Double(parse_double(text_field(map, key)?)?)),
        "$numberInt" => Ok(Value::Int32(
            text_field(map, key)?
                .parse()
                .map_err(|_| Error::serialization(format!("invalid $numberInt value in {map:?}")))?,
        )),
        "$numberLong" => Ok(Value::Int64(
            text_field(map, key)?
                .parse()
                .map_err(|_| Error::serialization(format!("invalid $numberLong value in {map:?}")))?,
        )),
        "$numberDecimal" => Ok(Value::Decimal128(Decimal128::parse(text_field(map, key)?)?)),
        "$oid" => Ok(Value::ObjectId(ObjectId::parse_hex(text_field(map, key)?)?)),
        "$symbol" => Ok(Value::Symbol(text_field(map, key)?.to_string())),
        "$undefined" => {
            if map.get(key).and_then(Json::as_bool) != Some(true) {
                return Err(Error::serialization("$undefined must equal true"));
            }
            Ok(Value::Undefined)
        }
        "$minKey" => {
            expect_one(map, key)?;
            Ok(Value::MinKey)
        }
        "$maxKey" => {
            expect_one(map, key)?;
            Ok(Value::MaxKey)
        }
        "$date" => {
            let inner = object_field(map, key)?;
            let millis = text_field(inner, "$numberLong")?
                .parse()
                .map_err(|_| Error::serialization("invalid $date.$numberLong value"))?;
            Ok(Value::DateTime(DateTime::from_millis(millis)))
        }
        "$binary" => {
            let inner = object_field(map, key)?;
            let base64 = text_field(inner, "base64")?;
            let sub_type = text_field(inner, "subType")?;
            let code = u8::from_str_radix(sub_type, 16)
                .map_err(|_| Error::serialization(format!("invalid $binary subType {sub_type}")))?;
            let bytes = base64_decode(base64)?;
            Ok(Value::Binary(Binary::new(BinarySubtype::from_code(code), bytes)))
        }
        "$regularExpression" => {
            let inner = object_field(map, key)?;
            let pattern = text_field(inner, "pattern")?;
            let options = text_field(inner, "options")?;
            check_no_null_byte(pattern)?;
            check_no_null_byte(options)?;
            Ok(Value::RegularExpression(Regex::new(pattern, options)))
        }
        "$dbPointer" => {
            let inner = object_field(map, key)?;
            let namespace = text_field(inner, "$ref")?.to_string();
            let id_field = object_field(inner, "$id")?;
            let id = ObjectId::parse_hex(text_field(id_field, "$oid")?)?;
            Ok(Value::DbPointer(DbPointer { namespace, id }))
        }
        "$timestamp" => {
            let inner = object_field(map, key)?;
            let seconds = inner
                .get("t")
                .and_then(Json::as_u64)
                .ok_or_else(|| Error::serialization("$timestamp.t must be an unsigned integer"))?;
            let increment = inner
                .get("i")
                .and_then(Json::as_u64)
                .ok_or_else(|| Error::serialization("$timestamp.i must be an unsigned integer"))?;
            Ok(Value::Timestamp(Timestamp::new(seconds as u32, increment as u32)))
        }
        "$code" => {
            let code = text_field(map, key)?.to_string();
            match map.get("$scope") {
                Some(scope) => Ok(Value::JavaScriptWithScope(JavaScriptWithScope {
                    code,
                    scope: json_to_document(scope)?,
                })),
                None => Ok(Value::JavaScript(code)),
            }
        }
        other => Err(Error::serialization(format!(
            "unrecognized ejson envelope key {other}"
        ))),
    }
}

fn text_field<'a>(map: &'a serde_json::Map<String, Json>, key: &str) -> Result<&'a str> {
    map.get(key)
        .and_then(Json::as_str)
        .ok_or_else(|| Error::serialization(format!("expected string field {key}")))
}

fn object_field<'a>(
    map: &'a serde_json::Map<String, Json>,
    key: &str,
) -> Result<&'a serde_json::Map<String, Json>> {
    map.get(key)
        .and_then(Json::as_object)
        .ok_or_else(|| Error::serialization(format!("expected object field {key}")))
}

fn expect_one(map: &serde_json::Map<String, Json>, key: &str) -> Result<()> {
    if map.get(key).and_then(Json::as_i64) == Some(1) {
        Ok(())
    } else {
        Err(Error::serialization(format!("{key} value must equal 1")))
    }
}

fn check_no_null_byte(s: &str) -> Result<()> {
    if s.as_bytes().contains(&0) {
        return Err(Error::serialization("value contains a null byte"));
    }
    Ok(())
}

fn parse_double(s: &str) -> Result<f64> {
    match s {
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        other => other
            .parse()
            .map_err(|_| Error::serialization(format!("invalid $numberDouble value {other}"))),
    }
}

fn base64_decode(s: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| Error::serialization(format!("invalid base64 in $binary: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number_narrows_to_int32() {
        assert_eq!(json_to_value(&serde_json::json!(42)).unwrap(), Value::Int32(42));
    }

    #[test]
    fn bare_number_widens_to_int64_past_i32_range() {
        let big = i64::from(i32::MAX) + 1;
        assert_eq!(
            json_to_value(&serde_json::json!(big)).unwrap(),
            Value::Int64(big)
        );
    }

    #[test]
    fn oid_envelope_decodes() {
        let oid = ObjectId::from_bytes([1; 12]);
        let json = serde_json::json!({ "$oid": oid.to_hex() });
        assert_eq!(json_to_value(&json).unwrap(), Value::ObjectId(oid));
    }

    #[test]
    fn unrecognized_envelope_fails() {
        let json = serde_json::json!({ "$bogus": 1 });
        assert!(json_to_value(&json).is_err());
    }

    #[test]
    fn object_key_with_null_byte_fails_instead_of_panicking() {
        let json = serde_json::json!({ "a\u{0}b": 1 });
        assert!(json_to_value(&json).is_err());
    }

    #[test]
    fn object_without_dollar_key_is_a_document() {
        let json = serde_json::json!({ "a": 1, "b": "x" });
        let value = json_to_value(&json).unwrap();
        let doc = value.as_document().unwrap();
        assert_eq!(doc.get("a").unwrap().as_i32().unwrap(), 1);
    }

    #[test]
    fn code_with_scope_is_distinguished_by_scope_presence() {
        let json = serde_json::json!({ "$code": "f()", "$scope": { "x": 1 } });
        match json_to_value(&json).unwrap() {
            Value::JavaScriptWithScope(v) => assert_eq!(v.code, "f()"),
            other => panic!("expected JavaScriptWithScope, got {other:?}"),
        }
    }
}
