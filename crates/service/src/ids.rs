//! Identifier and clock source.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Generates unique, roughly time-ordered IDs and reads the current time.
pub trait IdProvider: Send + Sync {
    fn next_id(&self) -> u64;
    fn now(&self) -> DateTime<Utc>;
}

// 2020-01-01T00:00:00Z in milliseconds
const EPOCH_MS: i64 = 1_577_836_800_000;
const SEQUENCE_BITS: u32 = 12;

/// Millisecond timestamp in the high bits, sequence in the low 12.
/// IDs stay below 2^63 for the next few millennia, so they fit a BIGINT.
#[derive(Debug, Default)]
pub struct Snowflake {
    last: AtomicU64,
}

impl Snowflake {
    pub fn new() -> Self { Self::default() }
}

impl IdProvider for Snowflake {
    fn next_id(&self) -> u64 {
        let millis = (Utc::now().timestamp_millis() - EPOCH_MS).max(0) as u64;
        let candidate = millis << SEQUENCE_BITS;
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(candidate.max(last + 1)))
            .unwrap_or_else(|last| last);
        candidate.max(prev + 1)
    }

    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Deterministic providers for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::AtomicI64;

    use chrono::{Duration, TimeZone};

    /// IDs count up from a start value; every `now()` is one second after the previous.
    #[derive(Debug)]
    pub struct Sequential {
        next: AtomicU64,
        ticks: AtomicI64,
        base: DateTime<Utc>,
    }

    impl Sequential {
        pub fn starting_at(first_id: u64) -> Self {
            Self {
                next: AtomicU64::new(first_id),
                ticks: AtomicI64::new(0),
                base: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_else(Utc::now),
            }
        }
    }

    impl Default for Sequential {
        fn default() -> Self { Self::starting_at(1001) }
    }

    impl IdProvider for Sequential {
        fn next_id(&self) -> u64 { self.next.fetch_add(1, Ordering::SeqCst) }

        fn now(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            self.base + Duration::seconds(tick)
        }
    }
}
