//! Millisecond timestamps.
//!
//! All expiries and grant times in latchkey are i64 milliseconds since the
//! Unix epoch. Pure state machines take `now` as a parameter; only the
//! outermost callers read the wall clock.

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

/// Convert a minute count to milliseconds.
pub fn minutes_to_millis(minutes: u32) -> i64 {
    i64::from(minutes) * 60_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_recent() {
        // Anything after 2020-01-01 counts as a sane clock.
        assert!(now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_minutes_to_millis() {
        assert_eq!(minutes_to_millis(0), 0);
        assert_eq!(minutes_to_millis(10), 600_000);
    }
}
