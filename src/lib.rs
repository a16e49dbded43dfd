/*!
 *! # bson-model
 *! A BSON document model: an in-memory typed value tree, a bit-exact BSON
 *! binary wire-format codec, and (with the `serde` feature) a MongoDB
 *! Extended JSON v2 codec and a serde bridge for encoding/decoding Rust
 *! types directly to and from [`Value`].
 *!
 *! The binary codec and the tree codec share one pull/push reader/writer
 *! state machine (`rw`), so converting between the two wire forms is a
 *! single `pipe` call rather than a decode-then-encode round trip.
 */

#![allow(clippy::too_many_arguments)]

pub mod array;
pub mod binary;
pub mod datetime;
pub mod decimal128;
pub mod document;
pub mod ejson;
mod error;
mod io;
pub mod oid;
pub mod regex;
pub mod rw;
pub mod timestamp;
mod util;
pub mod value;

pub use array::Array;
pub use binary::{Binary, BinarySubtype};
pub use datetime::DateTime;
pub use decimal128::Decimal128;
pub use document::Document;
pub use error::{Error, Result};
pub use oid::ObjectId;
pub use regex::Regex;
pub use rw::{pipe, BsonReader, BsonWriter, ContextType, ReaderState, WriterState};
pub use timestamp::Timestamp;
pub use value::{BsonType, DbPointer, JavaScriptWithScope, Value};
