use chrono::Utc;

/// Seconds elapsed since the Unix epoch (connection token expiry,
/// account registration/last-login timestamps, §4.10).
#[inline]
pub fn timestamp_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
