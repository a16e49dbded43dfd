//! BSON binary subtype and payload (spec §3, §6.1 binary framing).
//!
//! Carries the full BSON subtype byte rather than assuming subtype 0, since
//! the wire format distinguishes generic/function/UUID/MD5/old-style binary
//! at decode time.

use std::fmt;

/// The one-byte BSON binary subtype tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BinarySubtype {
    Generic,
    Function,
    BinaryOld,
    UuidOld,
    Uuid,
    Md5,
    Encrypted,
    Column,
    /// 0x80..=0xFF, inclusive of both ends, reserved for user-defined data.
    UserDefined(u8),
}

impl BinarySubtype {
    pub fn code(self) -> u8 {
        match self {
            BinarySubtype::Generic => 0x00,
            BinarySubtype::Function => 0x01,
            BinarySubtype::BinaryOld => 0x02,
            BinarySubtype::UuidOld => 0x03,
            BinarySubtype::Uuid => 0x04,
            BinarySubtype::Md5 => 0x05,
            BinarySubtype::Encrypted => 0x06,
            BinarySubtype::Column => 0x07,
            BinarySubtype::UserDefined(b) => b,
        }
    }

    pub fn from_code(code: u8) -> BinarySubtype {
        match code {
            0x00 => BinarySubtype::Generic,
            0x01 => BinarySubtype::Function,
            0x02 => BinarySubtype::BinaryOld,
            0x03 => BinarySubtype::UuidOld,
            0x04 => BinarySubtype::Uuid,
            0x05 => BinarySubtype::Md5,
            0x06 => BinarySubtype::Encrypted,
            0x07 => BinarySubtype::Column,
            other => BinarySubtype::UserDefined(other),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    subtype: BinarySubtype,
    bytes: Vec<u8>,
}

impl Binary {
    pub fn new(subtype: BinarySubtype, bytes: Vec<u8>) -> Binary {
        Binary { subtype, bytes }
    }

    pub fn generic(bytes: Vec<u8>) -> Binary {
        Binary::new(BinarySubtype::Generic, bytes)
    }

    pub fn subtype(&self) -> BinarySubtype {
        self.subtype
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// BSON's legacy subtype 0x02 nests a second length prefix around the
    /// payload; every other subtype writes the payload directly. Readers
    /// must check this length is exactly 4 less than the outer one (spec
    /// §6.1 edge cases).
    pub fn is_old_binary(&self) -> bool {
        self.subtype == BinarySubtype::BinaryOld
    }
}

impl fmt::Debug for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binary")
            .field("subtype", &self.subtype)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Binary::generic(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_round_trips_through_code() {
        for code in 0u8..=255 {
            assert_eq!(BinarySubtype::from_code(code).code(), code);
        }
    }

    #[test]
    fn old_binary_flag_matches_subtype() {
        let old = Binary::new(BinarySubtype::BinaryOld, vec![1, 2, 3]);
        let generic = Binary::generic(vec![1, 2, 3]);
        assert!(old.is_old_binary());
        assert!(!generic.is_old_binary());
    }
}
