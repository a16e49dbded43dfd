use bson_model::array::Array;
use bson_model::document::Document;
use bson_model::oid::ObjectId;
use bson_model::rw::binary::{decode_document, encode_document, BsonBinaryReader, BsonBinaryWriter};
use bson_model::rw::tree::{BsonDocumentReader, BsonDocumentWriter};
use bson_model::rw::{pipe, BsonWriter};
use bson_model::timestamp::Timestamp;
use bson_model::value::Value;

#[test]
fn minimal_document_matches_the_documented_byte_layout() {
    let mut doc = Document::new();
    doc.insert("a", 1i32).unwrap();

    let bytes = encode_document(&doc).unwrap();
    assert_eq!(
        bytes,
        vec![0x0C, 0x00, 0x00, 0x00, 0x10, b'a', 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
    );
    assert_eq!(decode_document(&bytes).unwrap(), doc);
}

#[test]
fn empty_document_matches_the_documented_byte_layout() {
    let doc = Document::new();
    let bytes = encode_document(&doc).unwrap();
    assert_eq!(bytes, vec![0x05, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(decode_document(&bytes).unwrap(), doc);
}

#[test]
fn timestamp_packs_seconds_high_and_increment_low() {
    let ts = Timestamp::new(0x1234_5678, 5);
    assert_eq!(ts.seconds(), 0x1234_5678);
    assert_eq!(ts.increment(), 5);
    assert_eq!(ts.to_packed(), 0x1234_5678_0000_0005);
}

#[test]
fn object_id_exposes_its_embedded_timestamp_and_lowercase_hex() {
    let oid = ObjectId::from_bytes([
        0x51, 0x06, 0xFC, 0x9A, 0xBC, 0x82, 0x37, 0x55, 0x81, 0x36, 0xD2, 0x89,
    ]);
    assert_eq!(oid.timestamp(), 0x5106_FC9A);
    assert_eq!(oid.to_hex().len(), 24);
    assert_eq!(oid.to_hex(), oid.to_hex().to_lowercase());
}

#[test]
fn all_zero_object_id_round_trips_through_the_ejson_envelope() {
    let oid = ObjectId::from_bytes([0; 12]);
    let json = bson_model::ejson::to_ejson(&Value::ObjectId(oid));
    assert_eq!(json, r#"{"$oid":"000000000000000000000000"}"#);
    assert_eq!(bson_model::ejson::from_ejson(&json).unwrap(), Value::ObjectId(oid));
}

#[test]
fn pipe_from_binary_reader_to_binary_writer_is_byte_for_byte() {
    let mut doc = Document::new();
    doc.insert("name", "widget").unwrap();
    doc.insert("count", 3i32).unwrap();
    doc.insert("tags", Array::from(vec!["a".into(), "b".into()])).unwrap();
    let mut nested = Document::new();
    nested.insert("on", true).unwrap();
    doc.insert("meta", nested).unwrap();

    let original_bytes = encode_document(&doc).unwrap();

    let mut reader = BsonBinaryReader::new(&original_bytes);
    let mut writer = BsonBinaryWriter::new();
    pipe(&mut reader, &mut writer).unwrap();

    assert_eq!(writer.into_bytes(), original_bytes);
}

#[test]
fn pipe_round_trips_between_tree_and_binary_forms() {
    let mut doc = Document::new();
    doc.insert("a", 1i32).unwrap();
    doc.insert("b", 2.5f64).unwrap();
    doc.insert("nested", {
        let mut inner = Document::new();
        inner
            .insert("x", Array::from(vec![Value::Int32(1), Value::Int32(2)]))
            .unwrap();
        inner
    })
    .unwrap();

    let mut tree_reader = BsonDocumentReader::new(doc.clone());
    let mut binary_writer = BsonBinaryWriter::new();
    pipe(&mut tree_reader, &mut binary_writer).unwrap();
    let bytes = binary_writer.into_bytes();

    let mut binary_reader = BsonBinaryReader::new(&bytes);
    let mut tree_writer = BsonDocumentWriter::new();
    pipe(&mut binary_reader, &mut tree_writer).unwrap();

    assert_eq!(tree_writer.into_document().unwrap(), doc);
}

#[test]
fn nesting_past_the_depth_limit_fails_on_write() {
    let mut writer = BsonBinaryWriter::new();
    writer.write_start_document().unwrap();
    for _ in 0..bson_model::rw::MAX_SERIALIZATION_DEPTH - 1 {
        writer.write_name("d").unwrap();
        writer.write_start_document().unwrap();
    }
    writer.write_name("d").unwrap();
    let failed = writer.write_start_document();
    assert!(failed.is_err());
}
