use chrono::Utc;

/// Wall-clock time in milliseconds since the Unix epoch.
///
/// Clamps pre-epoch clocks to 0 so callers can treat timestamps as `u64`.
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Converts whole seconds to the millisecond timestamps used across the workspace.
pub fn secs_to_ms(secs: u64) -> u64 {
    secs.saturating_mul(1_000)
}
