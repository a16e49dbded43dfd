//! Small helpers shared by a few modules that don't deserve their own file.

use std::time::{SystemTime, UNIX_EPOCH};

/// Whole seconds since the Unix epoch, truncating sub-second precision.
pub(crate) fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Whole milliseconds since the Unix epoch, as a signed offset (BSON
/// DateTime is milliseconds since epoch and may be negative for dates before
/// 1970, spec §3).
pub(crate) fn now_millis() -> i64 {
    let now = SystemTime::now();
    match now.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}
