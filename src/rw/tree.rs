//! A reader/writer pair over an in-memory [`crate::value::Value`] tree
//! instead of the wire format (spec §5). Lets [`super::pipe`] copy a document
//! between the binary codec and the tree, or tree-to-tree, through the exact
//! same element-by-element interface as the binary reader/writer.
//!
//! Follows the same context-stack shape as [`super::binary`] so
//! [`super::pipe`] is agnostic to which side is which.

use crate::array::Array;
use crate::binary::Binary;
use crate::datetime::DateTime;
use crate::decimal128::Decimal128;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::oid::ObjectId;
use crate::regex::Regex;
use crate::rw::context::{ContextStack, ContextType};
use crate::rw::{err_wrong_state, BsonReader, BsonWriter, ReaderState, WriterState};
use crate::timestamp::Timestamp;
use crate::value::{BsonType, DbPointer, JavaScriptWithScope, Value};

struct ReaderFrame {
    items: std::vec::IntoIter<(Option<String>, Value)>,
}

fn document_items(doc: Document) -> std::vec::IntoIter<(Option<String>, Value)> {
    doc.into_iter()
        .map(|(k, v)| (Some(k), v))
        .collect::<Vec<_>>()
        .into_iter()
}

fn array_items(arr: Array) -> std::vec::IntoIter<(Option<String>, Value)> {
    arr.into_iter()
        .map(|v| (None, v))
        .collect::<Vec<_>>()
        .into_iter()
}

/// Pulls elements out of an owned [`Value::Document`] tree.
pub struct BsonDocumentReader {
    state: ReaderState,
    stack: ContextStack<ReaderFrame>,
    current: Option<(Option<String>, Value)>,
    pending_scope_doc: Option<Document>,
}

impl BsonDocumentReader {
    pub fn new(document: Document) -> BsonDocumentReader {
        BsonDocumentReader {
            state: ReaderState::Initial,
            stack: ContextStack::new(ReaderFrame {
                items: Vec::new().into_iter(),
            }),
            current: Some((None, Value::Document(document))),
            pending_scope_doc: None,
        }
    }

    fn require_value_state(&self, op: &str) -> Result<()> {
        if self.state != ReaderState::Value {
            return Err(err_wrong_state(op, self.state));
        }
        Ok(())
    }

    fn take_current(&mut self) -> Result<Value> {
        self.current
            .take()
            .map(|(_, v)| v)
            .ok_or_else(|| Error::invalid_operation("no value available to read"))
    }
}

macro_rules! read_scalar {
    ($self:ident, $op:literal, $variant:ident) => {{
        $self.require_value_state($op)?;
        let value = $self.take_current()?;
        let actual = value.ty().name();
        match value {
            Value::$variant(v) => {
                $self.state = ReaderState::Type;
                Ok(v)
            }
            _ => Err(Error::unexpected_type(BsonType::$variant.name(), actual)),
        }
    }};
}

impl BsonReader for BsonDocumentReader {
    fn state(&self) -> ReaderState {
        self.state
    }

    fn context_type(&self) -> ContextType {
        self.stack.current().ty
    }

    fn read_type(&mut self) -> Result<Option<BsonType>> {
        let next = self.stack.current_mut().data.items.next();
        match next {
            None => {
                self.state = match self.context_type() {
                    ContextType::Array => ReaderState::EndOfArray,
                    _ => ReaderState::EndOfDocument,
                };
                Ok(None)
            }
            Some((name, value)) => {
                let ty = value.ty();
                self.current = Some((name, value));
                self.state = ReaderState::Value;
                Ok(Some(ty))
            }
        }
    }

    fn read_name(&mut self) -> Result<String> {
        match &self.current {
            Some((Some(name), _)) => Ok(name.clone()),
            _ => Err(Error::invalid_operation("no element name available to read")),
        }
    }

    fn read_start_document(&mut self) -> Result<()> {
        if self.state != ReaderState::Initial && self.state != ReaderState::Value {
            return Err(err_wrong_state("read_start_document", self.state));
        }
        let is_scope = self.pending_scope_doc.is_some();
        let doc = if is_scope {
            self.pending_scope_doc.take().unwrap()
        } else {
            match self.take_current()? {
                Value::Document(d) => d,
                other => return Err(Error::unexpected_type("Document", other.ty().name())),
            }
        };
        let ty = if is_scope {
            ContextType::ScopeDocument
        } else {
            ContextType::Document
        };
        self.stack.push(
            ty,
            ReaderFrame {
                items: document_items(doc),
            },
        )?;
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
        let arr = match self.take_current()? {
            Value::Array(a) => a,
            other => return Err(Error::unexpected_type("Array", other.ty().name())),
        };
        self.stack.push(
            ContextType::Array,
            ReaderFrame {
                items: array_items(arr),
            },
        )?;
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
        read_scalar!(self, "read_double", Double)
    }

    fn read_string(&mut self) -> Result<String> {
        read_scalar!(self, "read_string", String)
    }

    fn read_binary(&mut self) -> Result<Binary> {
        read_scalar!(self, "read_binary", Binary)
    }

    fn read_undefined(&mut self) -> Result<()> {
        self.require_value_state("read_undefined")?;
        match self.take_current()? {
            Value::Undefined => {
                self.state = ReaderState::Type;
                Ok(())
            }
            other => Err(Error::unexpected_type("Undefined", other.ty().name())),
        }
    }

    fn read_object_id(&mut self) -> Result<ObjectId> {
        read_scalar!(self, "read_object_id", ObjectId)
    }

    fn read_boolean(&mut self) -> Result<bool> {
        read_scalar!(self, "read_boolean", Boolean)
    }

    fn read_date_time(&mut self) -> Result<DateTime> {
        read_scalar!(self, "read_date_time", DateTime)
    }

    fn read_null(&mut self) -> Result<()> {
        self.require_value_state("read_null")?;
        match self.take_current()? {
            Value::Null => {
                self.state = ReaderState::Type;
                Ok(())
            }
            other => Err(Error::unexpected_type("Null", other.ty().name())),
        }
    }

    fn read_regular_expression(&mut self) -> Result<Regex> {
        read_scalar!(self, "read_regular_expression", RegularExpression)
    }

    fn read_db_pointer(&mut self) -> Result<DbPointer> {
        read_scalar!(self, "read_db_pointer", DbPointer)
    }

    fn read_javascript(&mut self) -> Result<String> {
        read_scalar!(self, "read_javascript", JavaScript)
    }

    fn read_symbol(&mut self) -> Result<String> {
        read_scalar!(self, "read_symbol", Symbol)
    }

    fn read_javascript_with_scope(&mut self) -> Result<String> {
        self.require_value_state("read_javascript_with_scope")?;
        match self.take_current()? {
            Value::JavaScriptWithScope(JavaScriptWithScope { code, scope }) => {
                self.pending_scope_doc = Some(scope);
                self.state = ReaderState::Value;
                Ok(code)
            }
            other => Err(Error::unexpected_type(
                "JavaScriptWithScope",
                other.ty().name(),
            )),
        }
    }

    fn read_int32(&mut self) -> Result<i32> {
        read_scalar!(self, "read_int32", Int32)
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        read_scalar!(self, "read_timestamp", Timestamp)
    }

    fn read_int64(&mut self) -> Result<i64> {
        read_scalar!(self, "read_int64", Int64)
    }

    fn read_decimal128(&mut self) -> Result<Decimal128> {
        read_scalar!(self, "read_decimal128", Decimal128)
    }

    fn read_min_key(&mut self) -> Result<()> {
        self.require_value_state("read_min_key")?;
        match self.take_current()? {
            Value::MinKey => {
                self.state = ReaderState::Type;
                Ok(())
            }
            other => Err(Error::unexpected_type("MinKey", other.ty().name())),
        }
    }

    fn read_max_key(&mut self) -> Result<()> {
        self.require_value_state("read_max_key")?;
        match self.take_current()? {
            Value::MaxKey => {
                self.state = ReaderState::Type;
                Ok(())
            }
            other => Err(Error::unexpected_type("MaxKey", other.ty().name())),
        }
    }

    fn close(&mut self) {
        self.state = ReaderState::Closed;
    }
}

enum Builder {
    Document(Document),
    Array(Vec<Value>),
}

struct WriterFrame {
    key: Option<String>,
    builder: Builder,
}

/// Pushes elements into a freshly built [`Value::Document`] tree.
pub struct BsonDocumentWriter {
    state: WriterState,
    stack: ContextStack<WriterFrame>,
    pending_name: Option<String>,
    pending_scope: bool,
    pending_jsws: Vec<(Option<String>, String)>,
    result: Option<Value>,
}

impl BsonDocumentWriter {
    pub fn new() -> BsonDocumentWriter {
        BsonDocumentWriter {
            state: WriterState::Initial,
            stack: ContextStack::new(WriterFrame {
                key: None,
                builder: Builder::Document(Document::new()),
            }),
            pending_name: None,
            pending_scope: false,
            pending_jsws: Vec::new(),
            result: None,
        }
    }

    /// Consumes the writer, returning the document written at the top
    /// level. Fails if nothing was written, or the root value wasn't a
    /// document.
    pub fn into_document(self) -> Result<Document> {
        match self.result {
            Some(Value::Document(d)) => Ok(d),
            Some(other) => Err(Error::unexpected_type("Document", other.ty().name())),
            None => Err(Error::invalid_operation("no document was written")),
        }
    }

    pub fn into_value(self) -> Result<Value> {
        self.result
            .ok_or_else(|| Error::invalid_operation("no value was written"))
    }

    fn context_type(&self) -> ContextType {
        self.stack.current().ty
    }

    fn require_ready_for_value(&self, op: &str) -> Result<()> {
        let ok = if self.context_type() == ContextType::TopLevel {
            self.state == WriterState::Initial
        } else {
            self.state == WriterState::Value
        };
        if !ok {
            return Err(err_wrong_state(op, self.state));
        }
        Ok(())
    }

    fn take_attachment_key(&mut self) -> Result<Option<String>> {
        match self.context_type() {
            ContextType::Array | ContextType::TopLevel => Ok(None),
            _ => {
                let name = self.pending_name.take().ok_or_else(|| {
                    Error::invalid_operation("write_name must be called before a value")
                })?;
                Ok(Some(name))
            }
        }
    }

    fn attach(&mut self, key: Option<String>, value: Value) -> Result<()> {
        if self.context_type() == ContextType::TopLevel {
            self.result = Some(value);
            return Ok(());
        }
        match &mut self.stack.current_mut().data.builder {
            Builder::Document(doc) => {
                doc.insert(
                    key.expect("internal error: document attachment without a key"),
                    value,
                )?;
            }
            Builder::Array(items) => items.push(value),
        }
        Ok(())
    }

    fn after_value(&mut self) {
        self.state = match self.context_type() {
            ContextType::Array => WriterState::Value,
            ContextType::TopLevel => WriterState::Done,
            _ => WriterState::Name,
        };
    }

    fn write_scalar(&mut self, op: &str, value: Value) -> Result<()> {
        self.require_ready_for_value(op)?;
        let key = self.take_attachment_key()?;
        self.attach(key, value)?;
        self.after_value();
        Ok(())
    }
}

impl Default for BsonDocumentWriter {
    fn default() -> Self {
        BsonDocumentWriter::new()
    }
}

impl BsonWriter for BsonDocumentWriter {
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
        let key = if is_scope {
            self.pending_scope = false;
            None
        } else {
            self.require_ready_for_value("write_start_document")?;
            self.take_attachment_key()?
        };
        let ty = if is_scope {
            ContextType::ScopeDocument
        } else {
            ContextType::Document
        };
        self.stack.push(
            ty,
            WriterFrame {
                key,
                builder: Builder::Document(Document::new()),
            },
        )?;
        self.state = WriterState::Name;
        Ok(())
    }

    fn write_end_document(&mut self) -> Result<()> {
        if self.state != WriterState::Name {
            return Err(err_wrong_state("write_end_document", self.state));
        }
        let is_scope = self.context_type() == ContextType::ScopeDocument;
        let frame = self
            .stack
            .pop_one_of(&[ContextType::Document, ContextType::ScopeDocument])?;
        let doc = match frame.builder {
            Builder::Document(d) => d,
            Builder::Array(_) => unreachable!("document frame always builds a Document"),
        };
        if is_scope {
            let (key, code) = self.pending_jsws.pop().ok_or_else(|| {
                Error::invalid_operation("scope document closed with no pending javascript code")
            })?;
            self.attach(key, Value::JavaScriptWithScope(JavaScriptWithScope { code, scope: doc }))?;
        } else {
            self.attach(frame.key, Value::Document(doc))?;
        }
        self.after_value();
        Ok(())
    }

    fn write_start_array(&mut self) -> Result<()> {
        self.require_ready_for_value("write_start_array")?;
        let key = self.take_attachment_key()?;
        self.stack.push(
            ContextType::Array,
            WriterFrame {
                key,
                builder: Builder::Array(Vec::new()),
            },
        )?;
        self.state = WriterState::Value;
        Ok(())
    }

    fn write_end_array(&mut self) -> Result<()> {
        let frame = self.stack.pop(ContextType::Array)?;
        let items = match frame.builder {
            Builder::Array(v) => v,
            Builder::Document(_) => unreachable!("array frame always builds an Array"),
        };
        self.attach(frame.key, Value::Array(items.into()))?;
        self.after_value();
        Ok(())
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.write_scalar("write_double", Value::Double(value))
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_scalar("write_string", Value::String(value.to_string()))
    }

    fn write_binary(&mut self, value: &Binary) -> Result<()> {
        self.write_scalar("write_binary", Value::Binary(value.clone()))
    }

    fn write_undefined(&mut self) -> Result<()> {
        self.write_scalar("write_undefined", Value::Undefined)
    }

    fn write_object_id(&mut self, value: ObjectId) -> Result<()> {
        self.write_scalar("write_object_id", Value::ObjectId(value))
    }

    fn write_boolean(&mut self, value: bool) -> Result<()> {
        self.write_scalar("write_boolean", Value::Boolean(value))
    }

    fn write_date_time(&mut self, value: DateTime) -> Result<()> {
        self.write_scalar("write_date_time", Value::DateTime(value))
    }

    fn write_null(&mut self) -> Result<()> {
        self.write_scalar("write_null", Value::Null)
    }

    fn write_regular_expression(&mut self, value: &Regex) -> Result<()> {
        self.write_scalar("write_regular_expression", Value::RegularExpression(value.clone()))
    }

    fn write_db_pointer(&mut self, value: &DbPointer) -> Result<()> {
        self.write_scalar("write_db_pointer", Value::DbPointer(value.clone()))
    }

    fn write_javascript(&mut self, value: &str) -> Result<()> {
        self.write_scalar("write_javascript", Value::JavaScript(value.to_string()))
    }

    fn write_symbol(&mut self, value: &str) -> Result<()> {
        self.write_scalar("write_symbol", Value::Symbol(value.to_string()))
    }

    fn write_javascript_with_scope(&mut self, code: &str) -> Result<()> {
        self.require_ready_for_value("write_javascript_with_scope")?;
        let key = self.take_attachment_key()?;
        self.pending_jsws.push((key, code.to_string()));
        self.pending_scope = true;
        self.state = WriterState::Value;
        Ok(())
    }

    fn write_int32(&mut self, value: i32) -> Result<()> {
        self.write_scalar("write_int32", Value::Int32(value))
    }

    fn write_timestamp(&mut self, value: Timestamp) -> Result<()> {
        self.write_scalar("write_timestamp", Value::Timestamp(value))
    }

    fn write_int64(&mut self, value: i64) -> Result<()> {
        self.write_scalar("write_int64", Value::Int64(value))
    }

    fn write_decimal128(&mut self, value: Decimal128) -> Result<()> {
        self.write_scalar("write_decimal128", Value::Decimal128(value))
    }

    fn write_min_key(&mut self) -> Result<()> {
        self.write_scalar("write_min_key", Value::MinKey)
    }

    fn write_max_key(&mut self) -> Result<()> {
        self.write_scalar("write_max_key", Value::MaxKey)
    }

    fn close(&mut self) {
        self.state = WriterState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.insert("a", 1i32).unwrap();
        doc.insert("b", "x").unwrap();
        let mut nested = Document::new();
        nested.insert("c", true).unwrap();
        doc.insert("nested", nested).unwrap();
        doc.insert("arr", Array::from(vec![Value::Int32(1), Value::Int32(2)]))
            .unwrap();
        doc
    }

    #[test]
    fn tree_to_tree_pipe_round_trips() {
        let doc = sample();
        let mut reader = BsonDocumentReader::new(doc.clone());
        let mut writer = BsonDocumentWriter::new();
        crate::rw::pipe(&mut reader, &mut writer).unwrap();
        assert_eq!(writer.into_document().unwrap(), doc);
    }

    #[test]
    fn javascript_with_scope_round_trips() {
        let mut scope = Document::new();
        scope.insert("x", 1i32).unwrap();
        let mut doc = Document::new();
        doc.insert(
            "f",
            Value::JavaScriptWithScope(JavaScriptWithScope {
                code: "function() {}".to_string(),
                scope,
            }),
        )
        .unwrap();
        let mut reader = BsonDocumentReader::new(doc.clone());
        let mut writer = BsonDocumentWriter::new();
        crate::rw::pipe(&mut reader, &mut writer).unwrap();
        assert_eq!(writer.into_document().unwrap(), doc);
    }
}
