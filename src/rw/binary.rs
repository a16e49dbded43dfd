//! The binary wire format reader and writer (spec §5, §6.1).
//!
//! Built as a stateful pull/push pair over
//! [`crate::io::ByteReader`]/[`crate::io::ByteBuf`] with an explicit context
//! stack, rather than a one-shot whole-document parse, so a reader and
//! writer can be interleaved element by element through [`super::pipe`].

use crate::array::Array;
use crate::binary::{Binary, BinarySubtype};
use crate::datetime::DateTime;
use crate::decimal128::Decimal128;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::io::{ByteBuf, ByteReader};
use crate::oid::ObjectId;
use crate::regex::Regex;
use crate::rw::context::{ContextStack, ContextType};
use crate::rw::{err_wrong_state, BsonReader, BsonWriter, ReaderState, WriterState};
use crate::timestamp::Timestamp;
use crate::value::{BsonType, DbPointer};

pub struct BsonBinaryReader<'a> {
    input: ByteReader<'a>,
    state: ReaderState,
    stack: ContextStack<()>,
    current_name: Option<String>,
    pending_scope: bool,
}

impl<'a> BsonBinaryReader<'a> {
    pub fn new(bytes: &'a [u8]) -> BsonBinaryReader<'a> {
        BsonBinaryReader {
            input: ByteReader::new(bytes),
            state: ReaderState::Initial,
            stack: ContextStack::new(()),
            current_name: None,
            pending_scope: false,
        }
    }

    fn require_value_state(&self, op: &str) -> Result<()> {
        if self.state != ReaderState::Value {
            return Err(err_wrong_state(op, self.state));
        }
        Ok(())
    }
}

impl<'a> BsonReader for BsonBinaryReader<'a> {
    fn state(&self) -> ReaderState {
        self.state
    }

    fn context_type(&self) -> ContextType {
        self.stack.current().ty
    }

    fn read_type(&mut self) -> Result<Option<BsonType>> {
        if self.state == ReaderState::Closed {
            return Err(err_wrong_state("read_type", self.state));
        }
        let tag = self.input.read_u8()? as i8;
        if tag == 0 {
            self.state = match self.context_type() {
                ContextType::Array => ReaderState::EndOfArray,
                _ => ReaderState::EndOfDocument,
            };
            return Ok(None);
        }
        let ty = BsonType::from_tag(tag)
            .ok_or_else(|| Error::serialization(format!("unknown bson type tag {tag:#x}")))?;
        let name = self.input.read_cstring()?;
        self.current_name = Some(name);
        self.state = ReaderState::Value;
        Ok(Some(ty))
    }

    fn read_name(&mut self) -> Result<String> {
        self.current_name
            .take()
            .ok_or_else(|| Error::invalid_operation("no element name available to read"))
    }

    fn read_start_document(&mut self) -> Result<()> {
        if self.state != ReaderState::Initial && self.state != ReaderState::Value {
            return Err(err_wrong_state("read_start_document", self.state));
        }
        self.input.read_i32()?; // total byte length, validated implicitly by read_end_document
        let ty = if self.pending_scope {
            self.pending_scope = false;
            ContextType::ScopeDocument
        } else {
            ContextType::Document
        };
        self.stack.push(ty, ())?;
        self.state = ReaderState::Type;
        Ok(())
    }

    fn read_end_document(&mut self) -> Result<()> {
        if self.state != ReaderState::EndOfDocument {
            return Err(err_wrong_state("read_end_document", self.state));
        }
        self.stack
            .pop_one_of(&[ContextType::Document, ContextType::ScopeDocument])?;
        self.state = if self.stack.current().ty == ContextType::TopLevel {
            ReaderState::Done
        } else {
            ReaderState::Type
        };
        Ok(())
    }

    fn read_start_array(&mut self) -> Result<()> {
        self.require_value_state("read_start_array")?;
        self.input.read_i32()?;
        self.stack.push(ContextType::Array, ())?;
        self.state = ReaderState::Type;
        Ok(())
    }

    fn read_end_array(&mut self) -> Result<()> {
        if self.state != ReaderState::EndOfArray {
            return Err(err_wrong_state("read_end_array", self.state));
        }
        self.stack.pop(ContextType::Array)?;
        self.state = ReaderState::Type;
        Ok(())
    }

    fn read_double(&mut self) -> Result<f64> {
        self.require_value_state("read_double")?;
        self.state = ReaderState::Type;
        self.input.read_f64()
    }

    fn read_string(&mut self) -> Result<String> {
        self.require_value_state("read_string")?;
        self.state = ReaderState::Type;
        self.input.read_string()
    }

    fn read_binary(&mut self) -> Result<Binary> {
        self.require_value_state("read_binary")?;
        self.state = ReaderState::Type;
        let outer_len = self.input.read_i32()?;
        let outer_len = usize::try_from(outer_len)
            .map_err(|_| Error::serialization("negative binary length"))?;
        let subtype = BinarySubtype::from_code(self.input.read_u8()?);
        if subtype == BinarySubtype::BinaryOld {
            let inner_len = self.input.read_i32()?;
            let inner_len = usize::try_from(inner_len)
                .map_err(|_| Error::serialization("negative binary length"))?;
            if inner_len + 4 != outer_len {
                return Err(Error::serialization(
                    "old-style binary inner length does not match outer length",
                ));
            }
            let bytes = self.input.read_bytes(inner_len)?.to_vec();
            return Ok(Binary::new(subtype, bytes));
        }
        let bytes = self.input.read_bytes(outer_len)?.to_vec();
        Ok(Binary::new(subtype, bytes))
    }

    fn read_undefined(&mut self) -> Result<()> {
        self.require_value_state("read_undefined")?;
        self.state = ReaderState::Type;
        Ok(())
    }

    fn read_object_id(&mut self) -> Result<ObjectId> {
        self.require_value_state("read_object_id")?;
        self.state = ReaderState::Type;
        Ok(ObjectId::from_bytes(self.input.read_fixed()?))
    }

    fn read_boolean(&mut self) -> Result<bool> {
        self.require_value_state("read_boolean")?;
        self.state = ReaderState::Type;
        match self.input.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::serialization(format!(
                "invalid boolean byte {other:#x}"
            ))),
        }
    }

    fn read_date_time(&mut self) -> Result<DateTime> {
        self.require_value_state("read_date_time")?;
        self.state = ReaderState::Type;
        Ok(DateTime::from_millis(self.input.read_i64()?))
    }

    fn read_null(&mut self) -> Result<()> {
        self.require_value_state("read_null")?;
        self.state = ReaderState::Type;
        Ok(())
    }

    fn read_regular_expression(&mut self) -> Result<Regex> {
        self.require_value_state("read_regular_expression")?;
        self.state = ReaderState::Type;
        let pattern = self.input.read_cstring()?;
        let options = self.input.read_cstring()?;
        Ok(Regex::new(pattern, options))
    }

    fn read_db_pointer(&mut self) -> Result<DbPointer> {
        self.require_value_state("read_db_pointer")?;
        self.state = ReaderState::Type;
        let namespace = self.input.read_string()?;
        let id = ObjectId::from_bytes(self.input.read_fixed()?);
        Ok(DbPointer { namespace, id })
    }

    fn read_javascript(&mut self) -> Result<String> {
        self.require_value_state("read_javascript")?;
        self.state = ReaderState::Type;
        self.input.read_string()
    }

    fn read_symbol(&mut self) -> Result<String> {
        self.require_value_state("read_symbol")?;
        self.state = ReaderState::Type;
        self.input.read_string()
    }

    fn read_javascript_with_scope(&mut self) -> Result<String> {
        self.require_value_state("read_javascript_with_scope")?;
        self.input.read_i32()?; // total length, re-derived on write
        let code = self.input.read_string()?;
        self.pending_scope = true;
        self.state = ReaderState::Value;
        Ok(code)
    }

    fn read_int32(&mut self) -> Result<i32> {
        self.require_value_state("read_int32")?;
        self.state = ReaderState::Type;
        self.input.read_i32()
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        self.require_value_state("read_timestamp")?;
        self.state = ReaderState::Type;
        Ok(Timestamp::from_packed(self.input.read_u64()?))
    }

    fn read_int64(&mut self) -> Result<i64> {
        self.require_value_state("read_int64")?;
        self.state = ReaderState::Type;
        self.input.read_i64()
    }

    fn read_decimal128(&mut self) -> Result<Decimal128> {
        self.require_value_state("read_decimal128")?;
        self.state = ReaderState::Type;
        let low = self.input.read_u64()?;
        let high = self.input.read_u64()?;
        Ok(Decimal128::from_parts(high, low))
    }

    fn read_min_key(&mut self) -> Result<()> {
        self.require_value_state("read_min_key")?;
        self.state = ReaderState::Type;
        Ok(())
    }

    fn read_max_key(&mut self) -> Result<()> {
        self.require_value_state("read_max_key")?;
        self.state = ReaderState::Type;
        Ok(())
    }

    fn close(&mut self) {
        self.state = ReaderState::Closed;
    }
}

struct WriterFrame {
    length_offset: usize,
    next_array_index: u32,
}

pub struct BsonBinaryWriter {
    output: ByteBuf,
    state: WriterState,
    stack: ContextStack<WriterFrame>,
    pending_name: Option<String>,
    pending_scope: bool,
    jws_length_offsets: Vec<usize>,
}

impl BsonBinaryWriter {
    pub fn new() -> BsonBinaryWriter {
        BsonBinaryWriter {
            output: ByteBuf::new(),
            state: WriterState::Initial,
            stack: ContextStack::new(WriterFrame {
                length_offset: 0,
                next_array_index: 0,
            }),
            pending_name: None,
            pending_scope: false,
            jws_length_offsets: Vec::new(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.output.into_vec()
    }

    fn write_element_header(&mut self, tag: BsonType) -> Result<()> {
        if self.state != WriterState::Value {
            return Err(err_wrong_state("write_element_header", self.state));
        }
        let name = if self.context_type() == ContextType::Array {
            let frame = self.stack.current_mut();
            let name = frame.next_array_index.to_string();
            frame.next_array_index += 1;
            name
        } else {
            self.pending_name
                .take()
                .ok_or_else(|| Error::invalid_operation("write_name must be called before a value"))?
        };
        self.output.write_u8(tag.tag() as u8);
        self.output.write_cstring(&name)?;
        Ok(())
    }

    /// Sets the state to expect after a value has just been written: ready
    /// for the next name inside a document, or ready for the next value
    /// directly inside an array.
    fn after_value(&mut self) {
        self.state = if self.context_type() == ContextType::Array {
            WriterState::Value
        } else {
            WriterState::Name
        };
    }
}

impl Default for BsonBinaryWriter {
    fn default() -> Self {
        BsonBinaryWriter::new()
    }
}

impl BsonWriter for BsonBinaryWriter {
    fn state(&self) -> WriterState {
        self.state
    }

    fn context_type(&self) -> ContextType {
        self.stack.current().ty
    }

    fn write_name(&mut self, name: &str) -> Result<()> {
        if self.state != WriterState::Name {
            return Err(err_wrong_state("write_name", self.state));
        }
        self.pending_name = Some(name.to_string());
        self.state = WriterState::Value;
        Ok(())
    }

    fn write_start_document(&mut self) -> Result<()> {
        let is_scope = self.pending_scope;
        if is_scope {
            self.pending_scope = false;
        } else if self.stack.current().ty == ContextType::TopLevel {
            if self.state != WriterState::Initial {
                return Err(err_wrong_state("write_start_document", self.state));
            }
        } else {
            // A nested document value is always preceded by a name (inside a
            // document) or consumes the next array index.
            self.write_element_header(BsonType::Document)?;
        }
        let ty = if is_scope {
            ContextType::ScopeDocument
        } else {
            ContextType::Document
        };
        let offset = self.output.reserve_i32();
        self.stack.push(
            ty,
            WriterFrame {
                length_offset: offset,
                next_array_index: 0,
            },
        )?;
        self.state = WriterState::Name;
        Ok(())
    }

    fn write_end_document(&mut self) -> Result<()> {
        let was_scope = self.context_type() == ContextType::ScopeDocument;
        let frame = self
            .stack
            .pop_one_of(&[ContextType::Document, ContextType::ScopeDocument])?;
        self.output.write_u8(0);
        let total = (self.output.len() - frame.length_offset) as i32;
        self.output.patch_i32(frame.length_offset, total);
        if was_scope {
            if let Some(jws_offset) = self.jws_length_offsets.pop() {
                let jws_total = (self.output.len() - jws_offset) as i32;
                self.output.patch_i32(jws_offset, jws_total);
            }
        }
        if self.stack.current().ty == ContextType::TopLevel {
            self.state = WriterState::Done;
        } else {
            self.after_value();
        }
        Ok(())
    }

    fn write_start_array(&mut self) -> Result<()> {
        self.write_element_header(BsonType::Array)?;
        let offset = self.output.reserve_i32();
        self.stack.push(
            ContextType::Array,
            WriterFrame {
                length_offset: offset,
                next_array_index: 0,
            },
        )?;
        self.after_value();
        Ok(())
    }

    fn write_end_array(&mut self) -> Result<()> {
        let frame = self.stack.pop(ContextType::Array)?;
        self.output.write_u8(0);
        let total = (self.output.len() - frame.length_offset) as i32;
        self.output.patch_i32(frame.length_offset, total);
        self.after_value();
        Ok(())
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.write_element_header(BsonType::Double)?;
        self.output.write_f64(value);
        self.after_value();
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_element_header(BsonType::String)?;
        self.output.write_string(value)?;
        self.after_value();
        Ok(())
    }

    fn write_binary(&mut self, value: &Binary) -> Result<()> {
        self.write_element_header(BsonType::Binary)?;
        if value.is_old_binary() {
            let total = i32::try_from(value.bytes().len() + 4)
                .map_err(|_| Error::serialization("binary payload too large"))?;
            self.output.write_i32(total);
            self.output.write_u8(value.subtype().code());
            self.output
                .write_i32(i32::try_from(value.bytes().len()).unwrap());
            self.output.write_bytes(value.bytes());
        } else {
            let len = i32::try_from(value.bytes().len())
                .map_err(|_| Error::serialization("binary payload too large"))?;
            self.output.write_i32(len);
            self.output.write_u8(value.subtype().code());
            self.output.write_bytes(value.bytes());
        }
        self.after_value();
        Ok(())
    }

    fn write_undefined(&mut self) -> Result<()> {
        self.write_element_header(BsonType::Undefined)?;
        self.after_value();
        Ok(())
    }

    fn write_object_id(&mut self, value: ObjectId) -> Result<()> {
        self.write_element_header(BsonType::ObjectId)?;
        self.output.write_bytes(value.as_bytes());
        self.after_value();
        Ok(())
    }

    fn write_boolean(&mut self, value: bool) -> Result<()> {
        self.write_element_header(BsonType::Boolean)?;
        self.output.write_u8(value as u8);
        self.after_value();
        Ok(())
    }

    fn write_date_time(&mut self, value: DateTime) -> Result<()> {
        self.write_element_header(BsonType::DateTime)?;
        self.output.write_i64(value.as_millis());
        self.after_value();
        Ok(())
    }

    fn write_null(&mut self) -> Result<()> {
        self.write_element_header(BsonType::Null)?;
        self.after_value();
        Ok(())
    }

    fn write_regular_expression(&mut self, value: &Regex) -> Result<()> {
        self.write_element_header(BsonType::RegularExpression)?;
        self.output.write_cstring(value.pattern())?;
        self.output.write_cstring(&value.sorted_options())?;
        self.after_value();
        Ok(())
    }

    fn write_db_pointer(&mut self, value: &DbPointer) -> Result<()> {
        self.write_element_header(BsonType::DbPointer)?;
        self.output.write_string(&value.namespace)?;
        self.output.write_bytes(value.id.as_bytes());
        self.after_value();
        Ok(())
    }

    fn write_javascript(&mut self, value: &str) -> Result<()> {
        self.write_element_header(BsonType::JavaScript)?;
        self.output.write_string(value)?;
        self.after_value();
        Ok(())
    }

    fn write_symbol(&mut self, value: &str) -> Result<()> {
        self.write_element_header(BsonType::Symbol)?;
        self.output.write_string(value)?;
        self.after_value();
        Ok(())
    }

    fn write_javascript_with_scope(&mut self, code: &str) -> Result<()> {
        self.write_element_header(BsonType::JavaScriptWithScope)?;
        let offset = self.output.reserve_i32();
        self.jws_length_offsets.push(offset);
        self.output.write_string(code)?;
        self.pending_scope = true;
        self.after_value();
        Ok(())
    }

    fn write_int32(&mut self, value: i32) -> Result<()> {
        self.write_element_header(BsonType::Int32)?;
        self.output.write_i32(value);
        self.after_value();
        Ok(())
    }

    fn write_timestamp(&mut self, value: Timestamp) -> Result<()> {
        self.write_element_header(BsonType::Timestamp)?;
        self.output.write_u64(value.to_packed());
        self.after_value();
        Ok(())
    }

    fn write_int64(&mut self, value: i64) -> Result<()> {
        self.write_element_header(BsonType::Int64)?;
        self.output.write_i64(value);
        self.after_value();
        Ok(())
    }

    fn write_decimal128(&mut self, value: Decimal128) -> Result<()> {
        self.write_element_header(BsonType::Decimal128)?;
        let (high, low) = value.into_parts();
        self.output.write_u64(low);
        self.output.write_u64(high);
        self.after_value();
        Ok(())
    }

    fn write_min_key(&mut self) -> Result<()> {
        self.write_element_header(BsonType::MinKey)?;
        self.after_value();
        Ok(())
    }

    fn write_max_key(&mut self) -> Result<()> {
        self.write_element_header(BsonType::MaxKey)?;
        self.after_value();
        Ok(())
    }

    fn close(&mut self) {
        self.state = WriterState::Closed;
    }
}

/// Encodes an in-memory document to its BSON binary representation.
pub fn encode_document(doc: &Document) -> Result<Vec<u8>> {
    let mut writer = BsonBinaryWriter::new();
    let mut reader = crate::rw::tree::BsonDocumentReader::new(doc.clone());
    crate::rw::pipe(&mut reader, &mut writer)?;
    Ok(writer.into_bytes())
}

/// Decodes a BSON binary document into an in-memory [`Document`].
pub fn decode_document(bytes: &[u8]) -> Result<Document> {
    let mut reader = BsonBinaryReader::new(bytes);
    let mut writer = crate::rw::tree::BsonDocumentWriter::new();
    crate::rw::pipe(&mut reader, &mut writer)?;
    writer.into_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.insert("a", 1i32).unwrap();
        doc.insert("b", "hello").unwrap();
        doc.insert("c", Array::from(vec![Value::Int32(1), Value::Int32(2)]))
            .unwrap();
        let mut nested = Document::new();
        nested.insert("inner", true).unwrap();
        doc.insert("d", nested).unwrap();
        doc
    }

    #[test]
    fn round_trips_a_flat_document() {
        let doc = sample();
        let bytes = encode_document(&doc).unwrap();
        let decoded = decode_document(&bytes).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn encodes_length_prefix_matching_total_size() {
        let doc = sample();
        let bytes = encode_document(&doc).unwrap();
        let declared_len = i32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        assert_eq!(declared_len, bytes.len());
    }

    #[test]
    fn rejects_truncated_input() {
        let doc = sample();
        let mut bytes = encode_document(&doc).unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(decode_document(&bytes).is_err());
    }

    #[test]
    fn old_style_binary_round_trips() {
        let mut doc = Document::new();
        doc.insert(
            "bin",
            Binary::new(BinarySubtype::BinaryOld, vec![1, 2, 3, 4]),
        )
        .unwrap();
        let bytes = encode_document(&doc).unwrap();
        let decoded = decode_document(&bytes).unwrap();
        assert_eq!(decoded.get("bin").unwrap().as_binary().unwrap().bytes(), &[1, 2, 3, 4]);
    }
}
