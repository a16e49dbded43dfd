//! Canonical EJSON emitter: `Value`/`Document` → `serde_json::Value` (spec
//! §4.G, §6.2). Always emits the wrapped envelope form, never a bare number,
//! matching the "canonical" half of the real Extended JSON v2 spec (this
//! crate does not distinguish canonical/relaxed modes — see SPEC_FULL.md §9).

use serde_json::{json, Map, Value as Json};

use crate::document::Document;
use crate::value::Value;

pub fn document_to_json(doc: &Document) -> Json {
    let mut map = Map::with_capacity(doc.len());
    for (key, value) in doc.iter() {
        map.insert(key.to_string(), value_to_json(value));
    }
    Json::Object(map)
}

pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Double(v) => json!({ "$numberDouble": format_double(*v) }),
        Value::String(v) => Json::String(v.clone()),
        Value::Document(v) => document_to_json(v),
        Value::Array(v) => Json::Array(v.iter().map(value_to_json).collect()),
        Value::Binary(v) => json!({
            "$binary": {
                "base64": base64_encode(v.bytes()),
                "subType": format!("{:02x}", v.subtype().code()),
            }
        }),
        Value::Undefined => json!({ "$undefined": true }),
        Value::ObjectId(v) => json!({ "$oid": v.to_hex() }),
        Value::Boolean(v) => Json::Bool(*v),
        Value::DateTime(v) => json!({ "$date": { "$numberLong": v.as_millis().to_string() } }),
        Value::Null => Json::Null,
        Value::RegularExpression(v) => json!({
            "$regularExpression": {
                "pattern": v.pattern(),
                "options": v.sorted_options(),
            }
        }),
        Value::DbPointer(v) => json!({
            "$dbPointer": {
                "$ref": v.namespace,
                "$id": { "$oid": v.id.to_hex() },
            }
        }),
        Value::JavaScript(v) => json!({ "$code": v }),
        Value::Symbol(v) => json!({ "$symbol": v }),
        Value::JavaScriptWithScope(v) => json!({
            "$code": v.code,
            "$scope": document_to_json(&v.scope),
        }),
        Value::Int32(v) => json!({ "$numberInt": v.to_string() }),
        Value::Timestamp(v) => json!({ "$timestamp": { "t": v.seconds(), "i": v.increment() } }),
        Value::Int64(v) => json!({ "$numberLong": v.to_string() }),
        Value::Decimal128(v) => json!({ "$numberDecimal": v.format() }),
        Value::MinKey => json!({ "$minKey": 1 }),
        Value::MaxKey => json!({ "$maxKey": 1 }),
    }
}

/// Extended JSON spells the IEEE special values out as words rather than
/// Rust's `inf`/`NaN`; finite values always carry a decimal point or
/// exponent so a round number doesn't get mistaken for an integer on
/// re-parse.
fn format_double(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let s = format!("{v}");
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{s}.0")
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid::ObjectId;

    #[test]
    fn double_gets_a_decimal_point() {
        assert_eq!(format_double(1.0), "1.0");
        assert_eq!(format_double(1.5), "1.5");
    }

    #[test]
    fn special_doubles_are_spelled_out() {
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(f64::INFINITY), "Infinity");
        assert_eq!(format_double(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn object_id_wraps_as_oid() {
        let oid = ObjectId::from_bytes([1; 12]);
        let json = value_to_json(&Value::ObjectId(oid));
        assert_eq!(json["$oid"], oid.to_hex());
    }
}
