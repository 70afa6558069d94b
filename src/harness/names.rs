//! Per-run random suffix.

use chrono::{Local, Timelike};
use uuid::Uuid;

/// Time-derived integer with a random tail, unique per run
///
/// Layout is `YYMMDDhhmmss` + hundredths of a second + four random digits, so
/// values are valid in resource names and stay below `i64::MAX`.
pub fn rand_time_int() -> i64 {
    let now = Local::now();
    let stamp = now.format("%y%m%d%H%M%S").to_string();
    let hundredths = now.nanosecond() % 1_000_000_000 / 10_000_000;
    let random = Uuid::new_v4().as_u128() % 10_000;

    format!("{stamp}{hundredths:02}{random:04}")
        .parse()
        .unwrap_or_else(|_| i64::try_from(random).unwrap_or_default())
}
