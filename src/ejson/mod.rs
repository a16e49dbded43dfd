//! MongoDB Extended JSON v2 bridge (spec §4.G, §6.2, §6.3): a text codec
//! between EJSON and [`crate::value::Value`]/[`crate::document::Document`],
//! plus (with the `serde` feature) a serde-structured bridge into the host's
//! serialization framework.
//!
//! The EJSON text codec (this file, [`ser`], [`de`]) has no dependency on
//! `serde` itself and is always available. Only [`bridge`] — the
//! `Serialize`/`Deserialize`-powered encoder/decoder — needs the `serde`
//! feature, matching the real-world `bson` crate's split.

#[cfg(feature = "serde")]
mod bridge;
mod de;
mod ser;

#[cfg(feature = "serde")]
pub use bridge::{
    decode_from_value, encode_to_value, from_bson, from_document, to_bson, to_document,
    SerializersModule, Strategy,
};

use crate::document::Document;
use crate::error::Result;
use crate::value::Value;

/// Renders a value as canonical Extended JSON text.
pub fn to_ejson(value: &Value) -> String {
    ser::value_to_json(value).to_string()
}

/// Renders a document as canonical Extended JSON text.
pub fn document_to_ejson(doc: &Document) -> String {
    ser::document_to_json(doc).to_string()
}

/// Parses Extended JSON text into a value.
pub fn from_ejson(text: &str) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| crate::error::Error::serialization(format!("invalid json: {e}")))?;
    de::json_to_value(&json)
}

/// Parses Extended JSON text into a document; fails if the top-level value
/// isn't an object.
pub fn document_from_ejson(text: &str) -> Result<Document> {
    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| crate::error::Error::serialization(format!("invalid json: {e}")))?;
    de::json_to_document(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::binary::{Binary, BinarySubtype};
    use crate::oid::ObjectId;
    use crate::timestamp::Timestamp;

    fn sample_document() -> Document {
        let mut doc = Document::new();
        doc.insert("name", "widget").unwrap();
        doc.insert("count", 3i32).unwrap();
        doc.insert("big", 9_000_000_000i64).unwrap();
        doc.insert("price", 19.99f64).unwrap();
        doc.insert("id", ObjectId::from_bytes([7; 12])).unwrap();
        doc.insert("tags", Array::from(vec!["a".into(), "b".into()])).unwrap();
        doc.insert("blob", Binary::new(BinarySubtype::Generic, vec![1, 2, 3])).unwrap();
        doc.insert("ts", Timestamp::new(10, 1)).unwrap();
        doc
    }

    #[test]
    fn document_round_trips_through_ejson_text() {
        let doc = sample_document();
        let text = document_to_ejson(&doc);
        let back = document_from_ejson(&text).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn bare_json_number_decodes_without_envelope() {
        let value = from_ejson("42").unwrap();
        assert_eq!(value, Value::Int32(42));
    }

    #[test]
    fn canonical_emitter_always_wraps_doubles() {
        let text = to_ejson(&Value::Double(2.0));
        assert!(text.contains("$numberDouble"));
    }

    #[test]
    fn undefined_round_trips() {
        let text = to_ejson(&Value::Undefined);
        assert_eq!(from_ejson(&text).unwrap(), Value::Undefined);
    }

    #[test]
    fn min_and_max_key_round_trip() {
        assert_eq!(from_ejson(&to_ejson(&Value::MinKey)).unwrap(), Value::MinKey);
        assert_eq!(from_ejson(&to_ejson(&Value::MaxKey)).unwrap(), Value::MaxKey);
    }
}
