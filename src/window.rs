//! Time window filter
//!
//! Decides whether a repository is new enough to announce. The window is the
//! only de-duplication mechanism in the system; there is no durable record of
//! repositories already announced. Runs must therefore be scheduled at an
//! interval no larger than the window, with no gaps.

use chrono::{DateTime, Duration, Utc};

/// Check whether `created_at` falls inside the announcement window.
///
/// True iff the repository was created at most `window_minutes` before `now`,
/// with both boundaries inclusive. Timestamps in the future are treated as
/// not-new to guard against clock skew between this host and the API.
pub fn is_new(created_at: DateTime<Utc>, now: DateTime<Utc>, window_minutes: u32) -> bool {
    let age = now - created_at;
    age >= Duration::zero() && age <= Duration::minutes(i64::from(window_minutes))
}
