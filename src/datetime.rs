//! BSON UTC datetime value: signed milliseconds since the Unix epoch
//! (spec §3, §6.1). A thin newtype over the wire representation rather than
//! a full calendar type; calendar conversion is left to callers via
//! `from_millis` / `as_millis`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    millis_since_epoch: i64,
}

impl DateTime {
    pub fn from_millis(millis_since_epoch: i64) -> DateTime {
        DateTime {
            millis_since_epoch,
        }
    }

    pub fn as_millis(&self) -> i64 {
        self.millis_since_epoch
    }

    pub fn now() -> DateTime {
        DateTime::from_millis(crate::util::now_millis())
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.millis_since_epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_millis() {
        let dt = DateTime::from_millis(-1_000);
        assert_eq!(dt.as_millis(), -1_000);
    }

    #[test]
    fn orders_chronologically() {
        assert!(DateTime::from_millis(0) < DateTime::from_millis(1));
    }
}
