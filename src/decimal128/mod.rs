//! IEEE 754-2008 decimal128 (BID encoding), per spec §3.2/§4.B.
//!
//! Two bit layouts ("forms") share the same 64-bit high/low word pair; which
//! one applies is determined by the top two bits of the combination field
//! (high word bits 62 and 61). Both forms share a single exponent bias of
//! 6176, per spec §3.2/§4.B; this implementation reads/writes the bias once,
//! directly, rather than translating between separate "IEEE" and "internal"
//! biases.

mod uint128;

pub use uint128::UInt128;

use crate::error::{Error, Result};

const MAX_EXPONENT: i64 = 6111;
const MIN_EXPONENT: i64 = -6176;
const EXPONENT_BIAS: i64 = 6176;
const MAX_DIGITS: usize = 34;

const SIGN_MASK: u64 = 0x8000_0000_0000_0000;
const COMBINATION_TOP2_MASK: u64 = 0x6000_0000_0000_0000;
const COMBINATION_TOP2_SECOND_FORM: u64 = 0x6000_0000_0000_0000;
const COMBINATION_TOP2_FIRST_FORM_MAX: u64 = 0x4000_0000_0000_0000;
const SPECIAL_MASK: u64 = 0x7C00_0000_0000_0000;
const INFINITY_PATTERN: u64 = 0x7800_0000_0000_0000;
const NAN_PATTERN: u64 = 0x7C00_0000_0000_0000;
const FIRST_FORM_SIGNIFICAND_MASK: u64 = (1u64 << 49) - 1;
const EXPONENT_FIELD_MASK: u64 = (1u64 << 14) - 1;

/// An IEEE 754-2008 decimal128 value, stored as the raw `(high, low)` 64-bit
/// words of its BID wire encoding (spec §3.1/§3.2, §6.1).
///
/// Equality is bit-pattern equality (spec §3.1): two encodings with the same
/// bits are equal even if they'd format to numerically equal but
/// differently-precise strings (`"1.0"` and `"1.00"` are distinct
/// `Decimal128`s). `Decimal128` does not implement `Ord`; spec §3.1 does not
/// list it among the totally-ordered variants.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal128 {
    high: u64,
    low: u64,
}

enum Decoded {
    Nan,
    Infinity { negative: bool },
    Finite {
        negative: bool,
        exponent: i64,
        significand: UInt128,
    },
}

impl Decimal128 {
    pub const POSITIVE_ZERO: Decimal128 = Decimal128::from_bits_const(false, 0, 0, 0);
    pub const NEGATIVE_ZERO: Decimal128 = Decimal128::from_bits_const(true, 0, 0, 0);
    pub const POSITIVE_INFINITY: Decimal128 = Decimal128 {
        high: INFINITY_PATTERN,
        low: 0,
    };
    pub const NEGATIVE_INFINITY: Decimal128 = Decimal128 {
        high: INFINITY_PATTERN | SIGN_MASK,
        low: 0,
    };
    pub const NAN: Decimal128 = Decimal128 {
        high: NAN_PATTERN,
        low: 0,
    };
    pub const NEGATIVE_NAN: Decimal128 = Decimal128 {
        high: NAN_PATTERN | SIGN_MASK,
        low: 0,
    };

    const fn from_bits_const(negative: bool, biased_exponent: u64, sig_high: u64, low: u64) -> Decimal128 {
        let mut high = (biased_exponent & EXPONENT_FIELD_MASK) << 49;
        high |= sig_high & FIRST_FORM_SIGNIFICAND_MASK;
        if negative {
            high |= SIGN_MASK;
        }
        Decimal128 { high, low }
    }

    /// Constructs from the wire's `(low, high)` word order (spec §6.1: "16
    /// bytes, `low:u64_le` then `high:u64_le`").
    pub fn from_parts(high: u64, low: u64) -> Decimal128 {
        Decimal128 { high, low }
    }

    pub fn into_parts(self) -> (u64, u64) {
        (self.high, self.low)
    }

    pub fn is_nan(&self) -> bool {
        self.high & SPECIAL_MASK == NAN_PATTERN
    }

    pub fn is_infinite(&self) -> bool {
        self.high & SPECIAL_MASK == INFINITY_PATTERN
    }

    pub fn is_negative(&self) -> bool {
        self.high & SIGN_MASK != 0
    }

    fn decode(&self) -> Decoded {
        if self.is_nan() {
            return Decoded::Nan;
        }
        if self.is_infinite() {
            return Decoded::Infinity {
                negative: self.is_negative(),
            };
        }

        let negative = self.is_negative();
        if self.high & COMBINATION_TOP2_MASK == COMBINATION_TOP2_SECOND_FORM {
            let biased = (self.high >> 47) & EXPONENT_FIELD_MASK;
            Decoded::Finite {
                negative,
                exponent: biased as i64 - EXPONENT_BIAS,
                significand: UInt128::ZERO,
            }
        } else {
            let biased = (self.high >> 49) & EXPONENT_FIELD_MASK;
            let sig_high = self.high & FIRST_FORM_SIGNIFICAND_MASK;
            Decoded::Finite {
                negative,
                exponent: biased as i64 - EXPONENT_BIAS,
                significand: UInt128 {
                    high: sig_high,
                    low: self.low,
                },
            }
        }
    }

    /// Parses a decimal128 string per the grammar of spec §4.B.
    pub fn parse(s: &str) -> Result<Decimal128> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::number_format("empty decimal128 string"));
        }

        let (negative, rest) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        if rest.is_empty() {
            return Err(Error::number_format(format!("invalid decimal128: {s:?}")));
        }

        if rest.eq_ignore_ascii_case("nan") {
            return Ok(if negative {
                Decimal128::NEGATIVE_NAN
            } else {
                Decimal128::NAN
            });
        }
        if rest.eq_ignore_ascii_case("inf") || rest.eq_ignore_ascii_case("infinity") {
            return Ok(if negative {
                Decimal128::NEGATIVE_INFINITY
            } else {
                Decimal128::POSITIVE_INFINITY
            });
        }

        let (mantissa_part, exp_part) = match rest.find(['e', 'E']) {
            Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
            None => (rest, None),
        };

        let (int_part, frac_part) = match mantissa_part.find('.') {
            Some(idx) => (&mantissa_part[..idx], &mantissa_part[idx + 1..]),
            None => (mantissa_part, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(Error::number_format(format!("invalid decimal128: {s:?}")));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(Error::number_format(format!("invalid decimal128: {s:?}")));
        }

        let mut digits = format!("{int_part}{frac_part}");
        let mut exponent: i64 = -(frac_part.len() as i64);

        if let Some(exp_part) = exp_part {
            if exp_part.is_empty() {
                return Err(Error::number_format(format!("invalid decimal128: {s:?}")));
            }
            let exp_val: i64 = exp_part
                .parse()
                .map_err(|_| Error::number_format(format!("invalid decimal128 exponent: {s:?}")))?;
            exponent += exp_val;
        }

        // Strip leading zeroes, keep a single "0".
        let stripped = digits.trim_start_matches('0');
        digits = if stripped.is_empty() {
            "0".to_string()
        } else {
            stripped.to_string()
        };

        if exponent > MAX_EXPONENT {
            if digits == "0" {
                exponent = MAX_EXPONENT;
            } else {
                while exponent > MAX_EXPONENT && digits.len() < MAX_DIGITS {
                    digits.push('0');
                    exponent -= 1;
                }
                if exponent > MAX_EXPONENT {
                    return Err(Error::number_format(format!(
                        "decimal128 exponent too large: {s:?}"
                    )));
                }
            }
        }

        if exponent < MIN_EXPONENT {
            if digits == "0" {
                exponent = MIN_EXPONENT;
            } else {
                while exponent < MIN_EXPONENT && digits.ends_with('0') {
                    digits.pop();
                    exponent += 1;
                }
                if exponent < MIN_EXPONENT {
                    return Err(Error::number_format(format!(
                        "decimal128 exponent too small, would lose precision: {s:?}"
                    )));
                }
                if digits.is_empty() {
                    digits = "0".to_string();
                }
            }
        }

        if digits.len() > MAX_DIGITS {
            let excess = digits.len() - MAX_DIGITS;
            let mut removed = 0;
            while removed < excess && digits.ends_with('0') {
                digits.pop();
                exponent += 1;
                removed += 1;
            }
            if digits.len() > MAX_DIGITS {
                return Err(Error::number_format(format!(
                    "decimal128 significand has too many digits, would lose precision: {s:?}"
                )));
            }
        }

        if exponent > MAX_EXPONENT || exponent < MIN_EXPONENT {
            return Err(Error::number_format(format!(
                "decimal128 exponent out of range: {s:?}"
            )));
        }

        let significand = UInt128::parse(&digits)?;
        let biased = (exponent + EXPONENT_BIAS) as u64;
        let sig = significand.to_u128();
        let sig_high = (sig >> 64) as u64;
        let low = sig as u64;
        Ok(Decimal128::from_bits_const(negative, biased, sig_high, low))
    }

    /// Formats per spec §4.B's plain/exponential rules.
    pub fn format(&self) -> String {
        match self.decode() {
            Decoded::Nan => "NaN".to_string(),
            Decoded::Infinity { negative } => {
                if negative {
                    "-Infinity".to_string()
                } else {
                    "Infinity".to_string()
                }
            }
            Decoded::Finite {
                negative,
                exponent,
                significand,
            } => {
                let sign = if negative { "-" } else { "" };
                if significand.is_zero() {
                    return if exponent == 0 {
                        format!("{sign}0")
                    } else if exponent > 0 {
                        format!("{sign}0E+{exponent}")
                    } else {
                        format!("{sign}0E{exponent}")
                    };
                }

                let coeff_digits = significand.format();
                let n_digits = coeff_digits.len() as i64;
                let adjusted = exponent + n_digits - 1;

                if exponent > 0 || adjusted < -6 {
                    let mut body = String::new();
                    body.push(coeff_digits.as_bytes()[0] as char);
                    if n_digits > 1 {
                        body.push('.');
                        body.push_str(&coeff_digits[1..]);
                    }
                    let exp_sign = if adjusted >= 0 { "+" } else { "" };
                    format!("{sign}{body}E{exp_sign}{adjusted}")
                } else if exponent == 0 {
                    format!("{sign}{coeff_digits}")
                } else {
                    let exp_abs = (-exponent) as usize;
                    let padded = if (n_digits as usize) < exp_abs + 1 {
                        format!("{:0>width$}", coeff_digits, width = exp_abs + 1)
                    } else {
                        coeff_digits
                    };
                    let split_at = padded.len() - exp_abs;
                    format!("{sign}{}.{}", &padded[..split_at], &padded[split_at..])
                }
            }
        }
    }
}

impl std::fmt::Debug for Decimal128 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Decimal128").field(&self.format()).finish()
    }
}

impl std::fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

impl std::str::FromStr for Decimal128 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Decimal128> {
        Decimal128::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_values_round_trip() {
        for s in ["0", "-0", "1", "-1", "1.0", "1.00", "5", "123.456", "-123.456"] {
            assert_eq!(Decimal128::parse(s).unwrap().format(), s);
        }
    }

    #[test]
    fn different_precision_are_unequal() {
        let a = Decimal128::parse("1.0").unwrap();
        let b = Decimal128::parse("1.00").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.format(), "1.0");
        assert_eq!(b.format(), "1.00");
    }

    #[test]
    fn exponential_form() {
        assert_eq!(Decimal128::parse("10E6111").unwrap().format(), "1.0E+6112");
        assert_eq!(Decimal128::parse("1E-7").unwrap().format(), "1E-7");
    }

    #[test]
    fn clamp_high_exponent() {
        let a = Decimal128::parse("1E6112").unwrap();
        let b = Decimal128::parse("10E6111").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn clamp_overflow_fails() {
        assert!(Decimal128::parse("12345678901234567890123456789012345E+6111").is_err());
    }

    #[test]
    fn exact_rounding_low_exponent() {
        // 34-nines at min exponent, needs no rounding.
        let s = "0E-6176";
        assert_eq!(Decimal128::parse(s).unwrap().format(), "0E-6176");
    }

    #[test]
    fn special_values() {
        assert_eq!(Decimal128::parse("Infinity").unwrap(), Decimal128::POSITIVE_INFINITY);
        assert_eq!(Decimal128::parse("-Infinity").unwrap(), Decimal128::NEGATIVE_INFINITY);
        assert_eq!(Decimal128::parse("NaN").unwrap(), Decimal128::NAN);
        assert_eq!(Decimal128::parse("nan").unwrap().format(), "NaN");
        assert_eq!(Decimal128::parse("-nan").unwrap(), Decimal128::NEGATIVE_NAN);
        assert!(Decimal128::NAN.is_nan());
        assert!(Decimal128::POSITIVE_INFINITY.is_infinite());
    }

    #[test]
    fn zero_variants() {
        assert_eq!(Decimal128::parse("0").unwrap().format(), "0");
        assert_eq!(Decimal128::parse("-0").unwrap().format(), "-0");
        assert_ne!(Decimal128::POSITIVE_ZERO, Decimal128::NEGATIVE_ZERO);
    }

    #[test]
    fn bit_round_trip_of_encoded_values() {
        for s in [
            "0",
            "-0",
            "1.0",
            "-1.0",
            "3.14159",
            "9999999999999999999999999999999999",
            "-9999999999999999999999999999999999",
            "1E-6176",
            "1E+6111",
        ] {
            let parsed = Decimal128::parse(s).unwrap();
            let (high, low) = parsed.into_parts();
            let reconstructed = Decimal128::from_parts(high, low);
            assert_eq!(Decimal128::parse(&reconstructed.format()).unwrap(), parsed);
        }
    }
}
