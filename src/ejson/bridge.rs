//! The value-level bridge into the host's structured encoder/decoder
//! abstraction (spec §4.G, §6.3): `serde::Serialize`/`Deserialize` impls built
//! directly on top of [`Value`], so any serde type can round-trip through a
//! BSON document without going through EJSON text.
//!
//! Follows the shape of upstream `bson-rust`'s serializer/deserializer
//! module — a custom `Serializer`/`Deserializer` pair with `Ok = Value`,
//! rather than going through an intermediate `serde_json::Value`.

use serde::de::{
    DeserializeOwned, EnumAccess, Error as DeError, MapAccess, SeqAccess, VariantAccess, Visitor,
};
use serde::ser::{
    Error as SerError, Serialize, SerializeMap, SerializeSeq, SerializeStruct,
    SerializeStructVariant, SerializeTuple, SerializeTupleStruct, SerializeTupleVariant,
};

use crate::array::Array;
use crate::binary::Binary;
use crate::document::Document;
use crate::error::Error;
use crate::value::Value;

/// Configuration recognized by [`encode_to_value`]/[`decode_from_value`]
/// (spec §4.G): whether an unrecognized document key fails decoding, and a
/// registry of contextual serializers for types that need one.
#[derive(Debug, Clone)]
pub struct Strategy {
    pub ignore_unknown_keys: bool,
    pub serializers_module: SerializersModule,
}

impl Default for Strategy {
    fn default() -> Strategy {
        Strategy {
            ignore_unknown_keys: true,
            serializers_module: SerializersModule::default(),
        }
    }
}

/// A registry of contextual (type-aware) serializers/deserializers.
///
/// Empty for now: this bridge has no support for polymorphic or otherwise
/// context-dependent encoding (see the "Polymorphic values are not
/// supported" errors throughout this module), so there is nothing to
/// register yet. Kept as a real type rather than omitted so `Strategy`
/// matches the configuration surface spec §4.G names.
#[derive(Debug, Clone, Default)]
pub struct SerializersModule {
    _private: (),
}

/// Encodes any serde `Serialize` value to a [`Value`] under the given
/// strategy (spec §4.G `encode_to_value`).
pub fn encode_to_value<T: Serialize + ?Sized>(
    strategy: &Strategy,
    value: &T,
) -> crate::error::Result<Value> {
    value.serialize(ValueSerializer {
        strategy: strategy.clone(),
    })
}

/// Decodes a [`Value`] into any serde `Deserialize` type under the given
/// strategy (spec §4.G `decode_from_value`).
pub fn decode_from_value<T: DeserializeOwned>(
    strategy: &Strategy,
    value: Value,
) -> crate::error::Result<T> {
    T::deserialize(ValueDeserializer {
        value,
        strategy: strategy.clone(),
    })
}

/// Encodes any serde `Serialize` value to a [`Value`] under the default
/// strategy (`ignore_unknown_keys: true`).
pub fn to_bson<T: Serialize + ?Sized>(value: &T) -> crate::error::Result<Value> {
    encode_to_value(&Strategy::default(), value)
}

/// Decodes a [`Value`] into any serde `Deserialize` type under the default
/// strategy (`ignore_unknown_keys: true`).
pub fn from_bson<T: DeserializeOwned>(value: Value) -> crate::error::Result<T> {
    decode_from_value(&Strategy::default(), value)
}

/// Encodes a serde `Serialize` value that must produce a document (a struct
/// or map), failing otherwise.
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> crate::error::Result<Document> {
    match to_bson(value)? {
        Value::Document(doc) => Ok(doc),
        other => Err(Error::unexpected_type("Document", other.ty().name())),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> crate::error::Result<T> {
    from_bson(Value::Document(doc))
}

struct ValueSerializer {
    strategy: Strategy,
}

struct SerializeVec {
    items: Vec<Value>,
    strategy: Strategy,
}

struct SerializeDoc {
    doc: Document,
    next_key: Option<String>,
    strategy: Strategy,
}

impl serde::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeVec;
    type SerializeMap = SerializeDoc;
    type SerializeStruct = SerializeDoc;
    type SerializeStructVariant = SerializeDoc;

    fn serialize_bool(self, v: bool) -> crate::error::Result<Value> {
        Ok(Value::Boolean(v))
    }

    fn serialize_i8(self, v: i8) -> crate::error::Result<Value> {
        self.serialize_i32(v as i32)
    }

    fn serialize_i16(self, v: i16) -> crate::error::Result<Value> {
        self.serialize_i32(v as i32)
    }

    fn serialize_i32(self, v: i32) -> crate::error::Result<Value> {
        Ok(Value::Int32(v))
    }

    fn serialize_i64(self, v: i64) -> crate::error::Result<Value> {
        Ok(Value::Int64(v))
    }

    fn serialize_u8(self, v: u8) -> crate::error::Result<Value> {
        self.serialize_i32(v as i32)
    }

    fn serialize_u16(self, v: u16) -> crate::error::Result<Value> {
        self.serialize_i32(v as i32)
    }

    fn serialize_u32(self, v: u32) -> crate::error::Result<Value> {
        self.serialize_i64(v as i64)
    }

    fn serialize_u64(self, v: u64) -> crate::error::Result<Value> {
        i64::try_from(v)
            .map(Value::Int64)
            .map_err(|_| SerError::custom("u64 value out of range for bson Int64"))
    }

    fn serialize_f32(self, v: f32) -> crate::error::Result<Value> {
        self.serialize_f64(v as f64)
    }

    fn serialize_f64(self, v: f64) -> crate::error::Result<Value> {
        Ok(Value::Double(v))
    }

    fn serialize_char(self, v: char) -> crate::error::Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> crate::error::Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> crate::error::Result<Value> {
        Ok(Value::Binary(Binary::generic(v.to_vec())))
    }

    fn serialize_none(self) -> crate::error::Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> crate::error::Result<Value> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> crate::error::Result<Value> {
        Ok(Value::Document(Document::new()))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> crate::error::Result<Value> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> crate::error::Result<Value> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> crate::error::Result<Value> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> crate::error::Result<Value> {
        Err(Error::serialization("Polymorphic values are not supported."))
    }

    fn serialize_seq(self, len: Option<usize>) -> crate::error::Result<SerializeVec> {
        Ok(SerializeVec {
            items: Vec::with_capacity(len.unwrap_or(0)),
            strategy: self.strategy,
        })
    }

    fn serialize_tuple(self, len: usize) -> crate::error::Result<SerializeVec> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> crate::error::Result<SerializeVec> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> crate::error::Result<SerializeVec> {
        Err(Error::serialization("Polymorphic values are not supported."))
    }

    fn serialize_map(self, _len: Option<usize>) -> crate::error::Result<SerializeDoc> {
        Ok(SerializeDoc {
            doc: Document::new(),
            next_key: None,
            strategy: self.strategy,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> crate::error::Result<SerializeDoc> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> crate::error::Result<SerializeDoc> {
        Err(Error::serialization("Polymorphic values are not supported."))
    }
}

impl SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> crate::error::Result<()> {
        self.items.push(encode_to_value(&self.strategy, value)?);
        Ok(())
    }

    fn end(self) -> crate::error::Result<Value> {
        Ok(Value::Array(Array::from(self.items)))
    }
}

impl SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> crate::error::Result<()> {
        SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> crate::error::Result<Value> {
        SerializeSeq::end(self)
    }
}

impl SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> crate::error::Result<()> {
        SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> crate::error::Result<Value> {
        SerializeSeq::end(self)
    }
}

impl SerializeTupleVariant for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _value: &T) -> crate::error::Result<()> {
        Err(Error::serialization("Polymorphic values are not supported."))
    }

    fn end(self) -> crate::error::Result<Value> {
        Err(Error::serialization("Polymorphic values are not supported."))
    }
}

impl SerializeMap for SerializeDoc {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> crate::error::Result<()> {
        let key = match encode_to_value(&self.strategy, key)? {
            Value::String(s) => s,
            other => {
                return Err(Error::serialization(format!(
                    "map keys must encode as strings, got {}",
                    other.ty().name()
                )))
            }
        };
        if key.as_bytes().contains(&0) {
            return Err(Error::serialization("map key contains a null byte"));
        }
        self.next_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> crate::error::Result<()> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| SerError::custom("serialize_value called before serialize_key"))?;
        self.doc.insert(key, encode_to_value(&self.strategy, value)?)?;
        Ok(())
    }

    fn end(self) -> crate::error::Result<Value> {
        Ok(Value::Document(self.doc))
    }
}

impl SerializeStruct for SerializeDoc {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> crate::error::Result<()> {
        self.doc.insert(key, encode_to_value(&self.strategy, value)?)?;
        Ok(())
    }

    fn end(self) -> crate::error::Result<Value> {
        Ok(Value::Document(self.doc))
    }
}

impl SerializeStructVariant for SerializeDoc {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        _value: &T,
    ) -> crate::error::Result<()> {
        Err(Error::serialization("Polymorphic values are not supported."))
    }

    fn end(self) -> crate::error::Result<Value> {
        Err(Error::serialization("Polymorphic values are not supported."))
    }
}

/// Deserializes directly from an owned [`Value`], matching its variant
/// against whatever the visitor asks for.
struct ValueDeserializer {
    value: Value,
    strategy: Strategy,
}

impl<'de> serde::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> crate::error::Result<V::Value> {
        match self.value {
            Value::Double(v) => visitor.visit_f64(v),
            Value::String(v) => visitor.visit_string(v),
            Value::Document(doc) => visitor.visit_map(DocumentMapAccess::new(doc, self.strategy)),
            Value::Array(arr) => visitor.visit_seq(ArraySeqAccess::new(arr, self.strategy)),
            Value::Binary(v) => visitor.visit_byte_buf(v.into_bytes()),
            Value::Undefined | Value::Null => visitor.visit_unit(),
            Value::ObjectId(v) => visitor.visit_string(v.to_hex()),
            Value::Boolean(v) => visitor.visit_bool(v),
            Value::DateTime(v) => visitor.visit_i64(v.as_millis()),
            Value::Int32(v) => visitor.visit_i32(v),
            Value::Int64(v) => visitor.visit_i64(v),
            Value::Symbol(v) | Value::JavaScript(v) => visitor.visit_string(v),
            other => Err(Error::serialization(format!(
                "{} has no generic serde representation",
                other.ty().name()
            ))),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> crate::error::Result<V::Value> {
        match self.value {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(ValueDeserializer {
                value: other,
                strategy: self.strategy,
            }),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> crate::error::Result<V::Value> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> crate::error::Result<V::Value> {
        match self.value {
            Value::Binary(v) => visitor.visit_byte_buf(v.into_bytes()),
            Value::Array(arr) => {
                let mut bytes = Vec::with_capacity(arr.len());
                for item in arr.iter() {
                    let n = item
                        .as_i32()
                        .map_err(|_| DeError::custom("byte array element out of range"))?;
                    bytes.push(u8::try_from(n).map_err(|_| DeError::custom("byte array element out of range"))?);
                }
                visitor.visit_byte_buf(bytes)
            }
            other => Err(Error::unexpected_type("Binary", other.ty().name())),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> crate::error::Result<V::Value> {
        match self.value {
            Value::String(variant) => visitor.visit_enum(UnitVariantAccess { variant }),
            other => Err(Error::unexpected_type("String", other.ty().name())),
        }
    }

    /// Unlike `deserialize_any`'s document branch, this knows the target
    /// struct's field names and can enforce `strategy.ignore_unknown_keys`
    /// before handing the document off to the derive-generated visitor
    /// (which otherwise silently drops unknown keys via `IgnoredAny`).
    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> crate::error::Result<V::Value> {
        match self.value {
            Value::Document(doc) => {
                if !self.strategy.ignore_unknown_keys {
                    if let Some(unknown) = doc.keys().find(|k| !fields.contains(k)) {
                        return Err(Error::serialization(format!(
                            "unrecognized field `{unknown}`, expected one of {fields:?}"
                        )));
                    }
                }
                visitor.visit_map(DocumentMapAccess::new(doc, self.strategy))
            }
            other => Err(Error::unexpected_type("Document", other.ty().name())),
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct newtype_struct seq tuple tuple_struct map
        identifier ignored_any
    }
}

struct UnitVariantAccess {
    variant: String,
}

impl<'de> EnumAccess<'de> for UnitVariantAccess {
    type Error = Error;
    type Variant = UnitOnly;

    fn variant_seed<S: serde::de::DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> crate::error::Result<(S::Value, UnitOnly)> {
        use serde::de::IntoDeserializer;
        let value = seed.deserialize(self.variant.into_deserializer())?;
        Ok((value, UnitOnly))
    }
}

struct UnitOnly;

impl<'de> VariantAccess<'de> for UnitOnly {
    type Error = Error;

    fn unit_variant(self) -> crate::error::Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<S: serde::de::DeserializeSeed<'de>>(
        self,
        _seed: S,
    ) -> crate::error::Result<S::Value> {
        Err(Error::serialization("Polymorphic values are not supported."))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> crate::error::Result<V::Value> {
        Err(Error::serialization("Polymorphic values are not supported."))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> crate::error::Result<V::Value> {
        Err(Error::serialization("Polymorphic values are not supported."))
    }
}

struct DocumentMapAccess {
    iter: std::vec::IntoIter<(String, Value)>,
    current_value: Option<Value>,
    strategy: Strategy,
}

impl DocumentMapAccess {
    fn new(doc: Document, strategy: Strategy) -> DocumentMapAccess {
        DocumentMapAccess {
            iter: doc.into_iter().collect::<Vec<_>>().into_iter(),
            current_value: None,
            strategy,
        }
    }
}

impl<'de> MapAccess<'de> for DocumentMapAccess {
    type Error = Error;

    fn next_key_seed<S: serde::de::DeserializeSeed<'de>>(
        &mut self,
        seed: S,
    ) -> crate::error::Result<Option<S::Value>> {
        match self.iter.next() {
            Some((key, value)) => {
                self.current_value = Some(value);
                seed.deserialize(ValueDeserializer {
                    value: Value::String(key),
                    strategy: self.strategy.clone(),
                })
                .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<S: serde::de::DeserializeSeed<'de>>(
        &mut self,
        seed: S,
    ) -> crate::error::Result<S::Value> {
        let value = self
            .current_value
            .take()
            .ok_or_else(|| DeError::custom("next_value_seed called before next_key_seed"))?;
        seed.deserialize(ValueDeserializer {
            value,
            strategy: self.strategy.clone(),
        })
    }
}

struct ArraySeqAccess {
    iter: std::vec::IntoIter<Value>,
    strategy: Strategy,
}

impl ArraySeqAccess {
    fn new(arr: Array, strategy: Strategy) -> ArraySeqAccess {
        ArraySeqAccess {
            iter: arr.into_iter().collect::<Vec<_>>().into_iter(),
            strategy,
        }
    }
}

impl<'de> SeqAccess<'de> for ArraySeqAccess {
    type Error = Error;

    fn next_element_seed<S: serde::de::DeserializeSeed<'de>>(
        &mut self,
        seed: S,
    ) -> crate::error::Result<Option<S::Value>> {
        match self.iter.next() {
            Some(value) => seed
                .deserialize(ValueDeserializer {
                    value,
                    strategy: self.strategy.clone(),
                })
                .map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
        label: Option<String>,
    }

    #[test]
    fn struct_round_trips_through_document() {
        let point = Point {
            x: 1,
            y: -2,
            label: Some("origin".to_string()),
        };
        let doc = to_document(&point).unwrap();
        let back: Point = from_document(doc).unwrap();
        assert_eq!(point, back);
    }

    #[test]
    fn none_becomes_null_and_back() {
        let point = Point {
            x: 0,
            y: 0,
            label: None,
        };
        let doc = to_document(&point).unwrap();
        assert!(doc.get("label").unwrap().is_null());
        let back: Point = from_document(doc).unwrap();
        assert_eq!(back.label, None);
    }

    #[test]
    fn vec_round_trips_as_array() {
        let items = vec![1i32, 2, 3];
        let value = to_bson(&items).unwrap();
        assert!(value.is_array());
        let back: Vec<i32> = from_bson(value).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn default_strategy_tolerates_unknown_document_keys() {
        let mut doc = Document::new();
        doc.insert("x", 1i32).unwrap();
        doc.insert("y", 2i32).unwrap();
        doc.insert("label", Value::Null).unwrap();
        doc.insert("extra", "surprise").unwrap();
        let point: Point = decode_from_value(&Strategy::default(), Value::Document(doc)).unwrap();
        assert_eq!(point, Point { x: 1, y: 2, label: None });
    }

    #[test]
    fn strict_strategy_rejects_unknown_document_keys() {
        let mut doc = Document::new();
        doc.insert("x", 1i32).unwrap();
        doc.insert("y", 2i32).unwrap();
        doc.insert("label", Value::Null).unwrap();
        doc.insert("extra", "surprise").unwrap();
        let strategy = Strategy {
            ignore_unknown_keys: false,
            serializers_module: SerializersModule::default(),
        };
        let result: crate::error::Result<Point> =
            decode_from_value(&strategy, Value::Document(doc));
        assert!(result.is_err());
    }
}
