//! Wall-clock time source for claim checks.

use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;

/// Source of the current time, in seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// Returns the current time as fractional seconds since the epoch.
    fn now_unix(&self) -> f64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> f64 {
        OffsetDateTime::now_utc().unix_timestamp() as f64
    }
}

/// A clock pinned to a settable instant.
#[derive(Debug, Default)]
pub struct FixedClock {
    secs: AtomicU64,
}

impl FixedClock {
    /// Creates a clock reading `secs` seconds since the epoch.
    #[must_use]
    pub fn new(secs: u64) -> Self {
        Self {
            secs: AtomicU64::new(secs),
        }
    }

    /// Moves the clock to `secs`.
    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    /// Moves the clock forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_unix(&self) -> f64 {
        self.secs.load(Ordering::SeqCst) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(1_700_000_000);
        assert_eq!(clock.now_unix(), 1_700_000_000.0);

        clock.advance(60);
        assert_eq!(clock.now_unix(), 1_700_000_060.0);

        clock.set(5);
        assert_eq!(clock.now_unix(), 5.0);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_unix() > 1_577_836_800.0);
    }
}
