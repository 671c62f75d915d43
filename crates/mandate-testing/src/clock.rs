//! Deterministic timestamps for scheduling tests.
//!
//! Scheduling logic takes `now` as an argument, so tests pin it to a known
//! epoch and express everything else as whole days after it.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Day 0 of every test scenario: 2025-03-03 09:00:00 UTC (a Monday).
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0)
        .single()
        .expect("valid fixed epoch")
}

/// `epoch() + days`.
pub fn day(days: i64) -> DateTime<Utc> {
    epoch() + Duration::days(days)
}
