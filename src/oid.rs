//! ObjectId: a 12-byte identifier (spec §3.3, §4.C).
//!
//! A bare `[u8; 12]` newtype with a `ToHex`-backed `Debug`/`Display`, built on
//! the usual `rand::random` seeding idiom for per-process state, generalized
//! to the timestamp + random + counter layout and a process-wide atomic
//! counter.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// A 12-byte MongoDB ObjectId: 4-byte big-endian seconds-since-epoch, 5 bytes
/// of per-process randomness, 3-byte big-endian counter (spec §3.3).
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectId {
    bytes: [u8; 12],
}

struct ProcessRandom {
    // 5 bytes of per-process randomness, stored as described in spec §3.3:
    // a u32 holding the low 24 bits and a u16 holding the low 15 bits.
    random_lo24: u32,
    random_lo15: u16,
}

fn process_random() -> &'static ProcessRandom {
    static RANDOM: OnceLock<ProcessRandom> = OnceLock::new();
    RANDOM.get_or_init(|| {
        let seed = rand::random::<u64>();
        ProcessRandom {
            random_lo24: (seed as u32) & 0x00FF_FFFF,
            random_lo15: ((seed >> 24) as u16) & 0x7FFF,
        }
    })
}

fn next_counter() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU32::new(rand::random::<u32>() & 0x00FF_FFFF));
    counter.fetch_add(1, Ordering::AcqRel) & 0x00FF_FFFF
}

impl ObjectId {
    /// Generates a new ObjectId using the current time, the per-process
    /// random value (seeded once, lazily), and the next value of the
    /// process-wide atomic counter.
    pub fn new() -> ObjectId {
        let random = process_random();
        let counter = next_counter();
        let seconds = crate::util::now_seconds() as u32;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..7].copy_from_slice(&random.random_lo24.to_be_bytes()[1..]);
        bytes[7..9].copy_from_slice(&random.random_lo15.to_be_bytes());
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..]);
        ObjectId { bytes }
    }

    pub fn from_bytes(bytes: [u8; 12]) -> ObjectId {
        ObjectId { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.bytes
    }

    /// Seconds-since-epoch portion, read big-endian unsigned.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes(self.bytes[0..4].try_into().unwrap())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn parse_hex(s: &str) -> Result<ObjectId> {
        if s.len() != 24 {
            return Err(Error::invalid_operation(format!(
                "ObjectId hex string must be 24 characters, got {}",
                s.len()
            )));
        }
        let decoded = hex::decode(s)
            .map_err(|e| Error::invalid_operation(format!("invalid ObjectId hex string: {e}")))?;
        let bytes: [u8; 12] = decoded
            .try_into()
            .map_err(|_| Error::invalid_operation("invalid ObjectId hex string"))?;
        Ok(ObjectId { bytes })
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectId").field(&self.to_hex()).finish()
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<ObjectId> {
        ObjectId::parse_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip() {
        let bytes = [
            0x51, 0x06, 0xFC, 0x9A, 0xBC, 0x82, 0x37, 0x55, 0x81, 0x36, 0xD2, 0x89,
        ];
        let oid = ObjectId::from_bytes(bytes);
        assert_eq!(*ObjectId::from_bytes(*oid.as_bytes()).as_bytes(), bytes);
        assert_eq!(oid.timestamp(), 0x5106FC9A);
    }

    #[test]
    fn hex_round_trip() {
        let oid = ObjectId::new();
        let hex = oid.to_hex();
        assert_eq!(hex.len(), 24);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
        assert_eq!(ObjectId::parse_hex(&hex).unwrap(), oid);
    }

    #[test]
    fn lexicographic_ordering_matches_byte_order() {
        let a = ObjectId::from_bytes([0; 12]);
        let mut higher = [0; 12];
        higher[11] = 1;
        let b = ObjectId::from_bytes(higher);
        assert!(a < b);
    }

    #[test]
    fn generated_ids_are_distinct_and_monotonic_in_counter() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(ObjectId::parse_hex("not-hex").is_err());
        assert!(ObjectId::parse_hex("abcd").is_err());
    }
}
