//! Wall-clock helpers used for timestamps across the engine.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// `now_ms` truncated to `u64` for storage in atomics. Saturates far in the
/// future rather than wrapping.
#[must_use]
pub fn now_ms_u64() -> u64 {
    u64::try_from(now_ms()).unwrap_or(u64::MAX)
}
