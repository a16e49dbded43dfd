//! Minimal 128-bit unsigned integer used only by the Decimal128 engine.
//!
//! Decimal128's clamp/round rules need exact decimal-digit arithmetic on a
//! 34-digit significand, which doesn't fit `u128`'s ordinary arithmetic well
//! enough to reason about overflow directly during parsing. We instead parse
//! and format digit-by-digit in base 10^9 groups (the largest power of ten
//! that fits a `u32` times a `u32` without overflowing `u64`), following
//! spec §4.A. No general 128x128 multiply/divide is needed.

use crate::error::{Error, Result};

const GROUP: u64 = 1_000_000_000; // 10^9

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct UInt128 {
    pub high: u64,
    pub low: u64,
}

impl UInt128 {
    pub const ZERO: UInt128 = UInt128 { high: 0, low: 0 };

    pub fn from_u64(v: u64) -> Self {
        UInt128 { high: 0, low: v }
    }

    pub fn is_zero(&self) -> bool {
        self.high == 0 && self.low == 0
    }

    /// Parses an unsigned run of ASCII decimal digits (no sign, no leading
    /// `+`). Leading zeroes are permitted. Fails with `NumberFormat` if the
    /// value doesn't fit in 128 bits.
    pub fn parse(digits: &str) -> Result<UInt128> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::number_format(format!(
                "not a valid unsigned integer: {digits:?}"
            )));
        }

        let mut acc = UInt128::ZERO;
        let bytes = digits.as_bytes();
        let mut i = 0;
        // Consume leading partial group first so every subsequent group is
        // exactly 9 digits wide.
        let first_len = bytes.len() % 9;
        let first_len = if first_len == 0 && !bytes.is_empty() {
            9
        } else {
            first_len
        };

        while i < bytes.len() {
            let len = if i == 0 { first_len } else { 9 };
            let group_str = std::str::from_utf8(&bytes[i..i + len]).unwrap();
            let group: u32 = group_str.parse().map_err(|_| {
                Error::number_format(format!("unsigned integer overflow: {digits:?}"))
            })?;
            let scale = 10u32.pow(len as u32);
            let previous = acc;
            acc = acc
                .multiply_by_u32(scale)
                .add(UInt128::from_u64(group as u64));
            if acc < previous && i != 0 {
                return Err(Error::number_format(format!(
                    "unsigned integer overflow: {digits:?}"
                )));
            }
            i += len;
        }

        Ok(acc)
    }

    /// Formats as a plain decimal string, no leading zeroes (except a single
    /// `"0"` for the zero value).
    pub fn format(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let mut groups = Vec::new();
        let mut value = *self;
        while !value.is_zero() {
            let (q, r) = value.divide_by_u32(GROUP as u32);
            groups.push(r);
            value = q;
        }
        let mut out = String::new();
        for (i, group) in groups.iter().rev().enumerate() {
            if i == 0 {
                out.push_str(&group.to_string());
            } else {
                out.push_str(&format!("{:09}", group));
            }
        }
        out
    }

    pub fn add(self, other: UInt128) -> UInt128 {
        let (low, carry) = self.low.overflowing_add(other.low);
        let high = self.high.wrapping_add(other.high).wrapping_add(carry as u64);
        UInt128 { high, low }
    }

    /// Multiplies by a 32-bit value using 32-bit limb long multiplication
    /// with carry propagation (spec §4.A). Wraps silently on overflow past
    /// 128 bits; callers detect overflow externally via the "result <
    /// previous" check during `parse`.
    pub fn multiply_by_u32(self, rhs: u32) -> UInt128 {
        let limbs = [
            self.low & 0xFFFF_FFFF,
            self.low >> 32,
            self.high & 0xFFFF_FFFF,
            self.high >> 32,
        ];
        let rhs = rhs as u64;

        let mut result = [0u64; 4];
        let mut carry = 0u64;
        for (i, &limb) in limbs.iter().enumerate() {
            let product = limb * rhs + carry;
            result[i] = product & 0xFFFF_FFFF;
            carry = product >> 32;
        }
        // Remaining carry past the 4th limb is discarded (wraps mod 2^128).

        UInt128 {
            low: result[0] | (result[1] << 32),
            high: result[2] | (result[3] << 32),
        }
    }

    /// Divides by a 32-bit value, returning `(quotient, remainder)`.
    pub fn divide_by_u32(self, rhs: u32) -> (UInt128, u32) {
        assert!(rhs != 0, "division by zero");
        let limbs = [
            (self.high >> 32) as u32,
            self.high as u32,
            (self.low >> 32) as u32,
            self.low as u32,
        ];
        let rhs = rhs as u64;

        let mut quotient_limbs = [0u32; 4];
        let mut remainder = 0u64;
        for (i, &limb) in limbs.iter().enumerate() {
            let dividend = (remainder << 32) | limb as u64;
            quotient_limbs[i] = (dividend / rhs) as u32;
            remainder = dividend % rhs;
        }

        let quotient = UInt128 {
            high: ((quotient_limbs[0] as u64) << 32) | quotient_limbs[1] as u64,
            low: ((quotient_limbs[2] as u64) << 32) | quotient_limbs[3] as u64,
        };

        (quotient, remainder as u32)
    }

    pub fn to_u128(self) -> u128 {
        ((self.high as u128) << 64) | self.low as u128
    }

    pub fn from_u128(v: u128) -> Self {
        UInt128 {
            high: (v >> 64) as u64,
            low: v as u64,
        }
    }

    /// Number of decimal digits in the formatted representation.
    pub fn digit_count(&self) -> usize {
        self.format().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small() {
        for s in ["0", "1", "9", "10", "999999999", "1000000000", "123456789012345"] {
            assert_eq!(UInt128::parse(s).unwrap().format(), s);
        }
    }

    #[test]
    fn round_trips_max_significand() {
        let s = "9999999999999999999999999999999999"; // 34 nines
        assert_eq!(UInt128::parse(s).unwrap().format(), s);
    }

    #[test]
    fn overflow_fails() {
        // 2^128 - 1 fits; 2^128 doesn't.
        assert!(UInt128::parse("340282366920938463463374607431768211455").is_ok());
        assert!(UInt128::parse("340282366920938463463374607431768211456").is_err());
    }

    #[test]
    fn multiply_and_divide_agree() {
        let v = UInt128::parse("123456789123456789").unwrap();
        let times_ten = v.multiply_by_u32(10);
        let (back, rem) = times_ten.divide_by_u32(10);
        assert_eq!(back, v);
        assert_eq!(rem, 0);
    }

    #[test]
    fn add_basic() {
        let a = UInt128::from_u64(5);
        let b = UInt128::from_u64(7);
        assert_eq!(a.add(b), UInt128::from_u64(12));
    }
}
