//! Identity and time types for CRM entities

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Numeric record identifier, unique within an entity kind.
/// Assigned by the store from a per-kind sequence.
pub type EntityId = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Current time truncated to microseconds, the resolution every store keeps.
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}

/// Timestamp for a write that follows `previous`.
///
/// Never earlier than `previous`, and bumped one microsecond past it when the
/// clock has not advanced, so `updated_at` strictly increases per write.
pub fn next_write_time(previous: Timestamp, now: Timestamp) -> Timestamp {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
