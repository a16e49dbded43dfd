//! Crate-wide error type.
//!
//! BSON has three distinct failure modes (spec §7): misusing the reader/writer
//! API (`InvalidOperation`), malformed wire or EJSON input (`Serialization`),
//! and an out-of-range or lossy Decimal128 string (`NumberFormat`). Keeping
//! them as separate enum variants lets callers match on failure mode instead
//! of string-sniffing a single flat error message.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A programmer API misuse: reading the wrong type, calling a method in
    /// the wrong reader/writer state, narrowing to a mismatched variant, or
    /// operating on a closed reader/writer.
    #[error("{0}")]
    InvalidOperation(String),

    /// The input bytes or text violate BSON/EJSON format rules.
    #[error("{0}")]
    Serialization(String),

    /// A Decimal128 string is out of range, malformed, or would lose
    /// non-zero digits under exact rounding.
    #[error("{0}")]
    NumberFormat(String),
}

impl Error {
    pub(crate) fn invalid_operation(message: impl fmt::Display) -> Self {
        let message = message.to_string();
        tracing::debug!(%message, "invalid bson operation");
        Error::InvalidOperation(message)
    }

    pub(crate) fn serialization(message: impl fmt::Display) -> Self {
        let message = message.to_string();
        tracing::debug!(%message, "bson serialization error");
        Error::Serialization(message)
    }

    pub(crate) fn number_format(message: impl fmt::Display) -> Self {
        let message = message.to_string();
        tracing::trace!(%message, "decimal128 number format error");
        Error::NumberFormat(message)
    }

    /// Builds the standard "Value expected to be of type X is of unexpected
    /// type Y" message used throughout the narrowing accessors (spec §4.D).
    pub(crate) fn unexpected_type(expected: &str, actual: &str) -> Self {
        Error::invalid_operation(format!(
            "Value expected to be of type {expected} is of unexpected type {actual}"
        ))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::serialization(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::serialization(err)
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::serialization(msg)
    }
}

#[cfg(feature = "serde")]
impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::serialization(msg)
    }
}
