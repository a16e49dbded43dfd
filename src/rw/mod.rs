//! The reader/writer state machine (spec §5): a pull reader and a push
//! writer, each over either the binary wire format or an in-memory
//! [`crate::value::Value`] tree, sharing one [`pipe`] function that copies an
//! entire document from any reader to any writer without materializing a
//! `Value` tree in between.

pub mod binary;
mod context;
pub mod tree;

pub use context::{ContextType, ReaderState, WriterState};

use crate::array::Array;
use crate::binary::Binary;
use crate::datetime::DateTime;
use crate::decimal128::Decimal128;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::oid::ObjectId;
use crate::regex::Regex;
use crate::timestamp::Timestamp;
use crate::value::{BsonType, DbPointer};

/// The sole cycle defense: nesting past this many context frames (the
/// top-level frame plus this many nested documents/arrays) fails instead of
/// recursing forever (spec §5 edge cases).
pub const MAX_SERIALIZATION_DEPTH: usize = 1024;

/// Pull interface over a BSON document, implemented once for the binary wire
/// format ([`binary::BsonBinaryReader`]) and once for an in-memory tree
/// ([`tree::BsonDocumentReader`]).
pub trait BsonReader {
    fn state(&self) -> ReaderState;
    fn context_type(&self) -> ContextType;

    /// Reads the next element's type tag, or `None` if the current
    /// document/array has no more elements (the caller must then call
    /// `read_end_document`/`read_end_array` as appropriate).
    fn read_type(&mut self) -> Result<Option<BsonType>>;
    /// Reads the current element's name. Not called inside an array, whose
    /// elements are unnamed.
    fn read_name(&mut self) -> Result<String>;

    fn read_start_document(&mut self) -> Result<()>;
    fn read_end_document(&mut self) -> Result<()>;
    fn read_start_array(&mut self) -> Result<()>;
    fn read_end_array(&mut self) -> Result<()>;

    fn read_double(&mut self) -> Result<f64>;
    fn read_string(&mut self) -> Result<String>;
    fn read_binary(&mut self) -> Result<Binary>;
    fn read_undefined(&mut self) -> Result<()>;
    fn read_object_id(&mut self) -> Result<ObjectId>;
    fn read_boolean(&mut self) -> Result<bool>;
    fn read_date_time(&mut self) -> Result<DateTime>;
    fn read_null(&mut self) -> Result<()>;
    fn read_regular_expression(&mut self) -> Result<Regex>;
    fn read_db_pointer(&mut self) -> Result<DbPointer>;
    fn read_javascript(&mut self) -> Result<String>;
    fn read_symbol(&mut self) -> Result<String>;
    /// Reads the code string of a JavaScriptWithScope value and enters its
    /// scope document context; the caller must then read the scope as an
    /// ordinary document (`read_start_document`/elements/`read_end_document`).
    fn read_javascript_with_scope(&mut self) -> Result<String>;
    fn read_int32(&mut self) -> Result<i32>;
    fn read_timestamp(&mut self) -> Result<Timestamp>;
    fn read_int64(&mut self) -> Result<i64>;
    fn read_decimal128(&mut self) -> Result<Decimal128>;
    fn read_min_key(&mut self) -> Result<()>;
    fn read_max_key(&mut self) -> Result<()>;

    fn close(&mut self);
}

/// Push interface over a BSON document.
pub trait BsonWriter {
    fn state(&self) -> WriterState;
    fn context_type(&self) -> ContextType;

    fn write_name(&mut self, name: &str) -> Result<()>;

    fn write_start_document(&mut self) -> Result<()>;
    fn write_end_document(&mut self) -> Result<()>;
    fn write_start_array(&mut self) -> Result<()>;
    fn write_end_array(&mut self) -> Result<()>;

    fn write_double(&mut self, value: f64) -> Result<()>;
    fn write_string(&mut self, value: &str) -> Result<()>;
    fn write_binary(&mut self, value: &Binary) -> Result<()>;
    fn write_undefined(&mut self) -> Result<()>;
    fn write_object_id(&mut self, value: ObjectId) -> Result<()>;
    fn write_boolean(&mut self, value: bool) -> Result<()>;
    fn write_date_time(&mut self, value: DateTime) -> Result<()>;
    fn write_null(&mut self) -> Result<()>;
    fn write_regular_expression(&mut self, value: &Regex) -> Result<()>;
    fn write_db_pointer(&mut self, value: &DbPointer) -> Result<()>;
    fn write_javascript(&mut self, value: &str) -> Result<()>;
    fn write_symbol(&mut self, value: &str) -> Result<()>;
    /// Writes the code string of a JavaScriptWithScope value and enters its
    /// scope document context; the caller must then write the scope as an
    /// ordinary document.
    fn write_javascript_with_scope(&mut self, code: &str) -> Result<()>;
    fn write_int32(&mut self, value: i32) -> Result<()>;
    fn write_timestamp(&mut self, value: Timestamp) -> Result<()>;
    fn write_int64(&mut self, value: i64) -> Result<()>;
    fn write_decimal128(&mut self, value: Decimal128) -> Result<()>;
    fn write_min_key(&mut self) -> Result<()>;
    fn write_max_key(&mut self) -> Result<()>;

    fn close(&mut self);
}

/// Copies one full document from `reader` to `writer`, element by element,
/// without ever materializing a [`crate::value::Value`] tree (spec §5 pipe
/// operation). Both reader and writer must be positioned at the start of a
/// top-level or nested document.
pub fn pipe<R: BsonReader, W: BsonWriter>(reader: &mut R, writer: &mut W) -> Result<()> {
    pipe_document(reader, writer)
}

fn pipe_document<R: BsonReader, W: BsonWriter>(reader: &mut R, writer: &mut W) -> Result<()> {
    reader.read_start_document()?;
    writer.write_start_document()?;
    pipe_elements(reader, writer)?;
    reader.read_end_document()?;
    writer.write_end_document()
}

fn pipe_array<R: BsonReader, W: BsonWriter>(reader: &mut R, writer: &mut W) -> Result<()> {
    reader.read_start_array()?;
    writer.write_start_array()?;
    pipe_elements(reader, writer)?;
    reader.read_end_array()?;
    writer.write_end_array()
}

fn pipe_elements<R: BsonReader, W: BsonWriter>(reader: &mut R, writer: &mut W) -> Result<()> {
    let array_context = reader.context_type() == ContextType::Array;
    loop {
        let Some(ty) = reader.read_type()? else {
            return Ok(());
        };
        if !array_context {
            let name = reader.read_name()?;
            writer.write_name(&name)?;
        }
        pipe_value(ty, reader, writer)?;
    }
}

fn pipe_value<R: BsonReader, W: BsonWriter>(
    ty: BsonType,
    reader: &mut R,
    writer: &mut W,
) -> Result<()> {
    match ty {
        BsonType::Double => writer.write_double(reader.read_double()?),
        BsonType::String => writer.write_string(&reader.read_string()?),
        BsonType::Document => pipe_document(reader, writer),
        BsonType::Array => pipe_array(reader, writer),
        BsonType::Binary => writer.write_binary(&reader.read_binary()?),
        BsonType::Undefined => {
            reader.read_undefined()?;
            writer.write_undefined()
        }
        BsonType::ObjectId => writer.write_object_id(reader.read_object_id()?),
        BsonType::Boolean => writer.write_boolean(reader.read_boolean()?),
        BsonType::DateTime => writer.write_date_time(reader.read_date_time()?),
        BsonType::Null => {
            reader.read_null()?;
            writer.write_null()
        }
        BsonType::RegularExpression => writer.write_regular_expression(&reader.read_regular_expression()?),
        BsonType::DbPointer => writer.write_db_pointer(&reader.read_db_pointer()?),
        BsonType::JavaScript => writer.write_javascript(&reader.read_javascript()?),
        BsonType::Symbol => writer.write_symbol(&reader.read_symbol()?),
        BsonType::JavaScriptWithScope => {
            let code = reader.read_javascript_with_scope()?;
            writer.write_javascript_with_scope(&code)?;
            pipe_document(reader, writer)
        }
        BsonType::Int32 => writer.write_int32(reader.read_int32()?),
        BsonType::Timestamp => writer.write_timestamp(reader.read_timestamp()?),
        BsonType::Int64 => writer.write_int64(reader.read_int64()?),
        BsonType::Decimal128 => writer.write_decimal128(reader.read_decimal128()?),
        BsonType::MinKey => {
            reader.read_min_key()?;
            writer.write_min_key()
        }
        BsonType::MaxKey => {
            reader.read_max_key()?;
            writer.write_max_key()
        }
    }
}

pub(crate) fn err_wrong_state(op: &str, state: impl std::fmt::Debug) -> Error {
    Error::invalid_operation(format!("cannot call {op} while in state {state:?}"))
}
