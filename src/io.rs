//! Little-endian byte-level reading and writing shared by the binary reader
//! and writer (spec §5, §6.1).
//!
//! A read-fully/fixed-size-array/`is_end` reader paired with a
//! write-bytes/size-exceeded-error writer, collapsed into concrete buffer
//! types since this crate has no page/slice abstraction to stay generic over.

use crate::error::{Error, Result};

/// A forward-only cursor over an in-memory byte slice.
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> ByteReader<'a> {
        ByteReader { bytes, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position == self.bytes.len()
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::serialization("unexpected end of bson input"));
        }
        let slice = &self.bytes[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self.read_bytes(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(slice);
        Ok(array)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_fixed::<1>()?[0])
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_fixed()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_fixed()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_fixed()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_fixed()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_fixed()?))
    }

    /// Reads a length-prefixed, null-terminated BSON string: an `i32` byte
    /// count (including the trailing null), the UTF-8 payload, then the
    /// null itself (spec §6.1).
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_i32()?;
        let len = usize::try_from(len)
            .map_err(|_| Error::serialization("negative bson string length"))?;
        if len == 0 {
            return Err(Error::serialization(
                "bson string length must include the trailing null",
            ));
        }
        let bytes = self.read_bytes(len)?;
        let (payload, nul) = bytes.split_at(len - 1);
        if nul != [0] {
            return Err(Error::serialization("bson string missing trailing null"));
        }
        Ok(String::from_utf8(payload.to_vec())?)
    }

    /// Reads a bare null-terminated CString, with no length prefix (used for
    /// element names and a handful of other fields, spec §6.1).
    pub fn read_cstring(&mut self) -> Result<String> {
        let start = self.position;
        let nul_offset = self.bytes[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::serialization("unterminated cstring in bson input"))?;
        let payload = &self.bytes[start..start + nul_offset];
        self.position = start + nul_offset + 1;
        Ok(String::from_utf8(payload.to_vec())?)
    }
}

/// A growable little-endian byte sink.
#[derive(Default)]
pub struct ByteBuf {
    bytes: Vec<u8>,
}

impl ByteBuf {
    pub fn new() -> ByteBuf {
        ByteBuf { bytes: Vec::new() }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.write_bytes(&v.to_le_bytes());
    }

    /// Writes a BSON length-prefixed string: `i32` length (including the
    /// trailing null) + UTF-8 bytes + null.
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        let len = i32::try_from(s.len() + 1)
            .map_err(|_| Error::serialization("string too large to encode as bson"))?;
        self.write_i32(len);
        self.write_bytes(s.as_bytes());
        self.write_u8(0);
        Ok(())
    }

    /// Writes a bare null-terminated CString with no length prefix. Fails if
    /// the string itself contains an embedded null, since that would be
    /// mistaken for the terminator on read-back.
    pub fn write_cstring(&mut self, s: &str) -> Result<()> {
        if s.as_bytes().contains(&0) {
            return Err(Error::serialization(
                "cstring value contains an embedded null byte",
            ));
        }
        self.write_bytes(s.as_bytes());
        self.write_u8(0);
        Ok(())
    }

    /// Reserves space for a length prefix to be patched in later by
    /// [`ByteBuf::patch_i32`], returning the offset to patch.
    pub fn reserve_i32(&mut self) -> usize {
        let offset = self.bytes.len();
        self.write_i32(0);
        offset
    }

    pub fn patch_i32(&mut self, offset: usize, value: i32) {
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trips() {
        let mut buf = ByteBuf::new();
        buf.write_string("hello").unwrap();
        let bytes = buf.into_vec();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_string().unwrap(), "hello");
        assert!(reader.is_at_end());
    }

    #[test]
    fn cstring_round_trips() {
        let mut buf = ByteBuf::new();
        buf.write_cstring("key").unwrap();
        let bytes = buf.into_vec();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_cstring().unwrap(), "key");
    }

    #[test]
    fn cstring_rejects_embedded_null() {
        let mut buf = ByteBuf::new();
        assert!(buf.write_cstring("a\0b").is_err());
    }

    #[test]
    fn length_patch_round_trips() {
        let mut buf = ByteBuf::new();
        let offset = buf.reserve_i32();
        buf.write_bytes(b"abc");
        buf.patch_i32(offset, 42);
        let bytes = buf.into_vec();
        assert_eq!(i32::from_le_bytes(bytes[0..4].try_into().unwrap()), 42);
    }

    #[test]
    fn reading_past_end_fails() {
        let bytes = [1u8, 2, 3];
        let mut reader = ByteReader::new(&bytes);
        assert!(reader.read_i64().is_err());
    }
}
