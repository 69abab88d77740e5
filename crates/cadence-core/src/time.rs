//! Time system for scheduled execution
//!
//! Provides the monotonic time base shared by the scheduler and the
//! exhaustion records:
//! - `Timestamp` - Milliseconds since the clock's origin
//! - `Clock` - Source of the current timestamp
//! - `MonotonicClock` - Wall-clock backed, for running servers
//! - `ManualClock` - Explicitly advanced, for deterministic tests

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A point in time, in milliseconds since the clock origin
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The clock origin
    pub const ZERO: Timestamp = Timestamp(0);

    /// Create a timestamp from milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the origin
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// This timestamp moved forward by `duration`, saturating at the maximum
    pub fn saturating_add(&self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t+{}ms", self.0)
    }
}

/// Source of the current time
///
/// One instance must be shared by everything that compares due times and
/// cooldowns, otherwise the two drift apart.
pub trait Clock: Send + Sync {
    /// The current timestamp; never goes backwards
    fn now(&self) -> Timestamp;
}

/// Clock backed by `std::time::Instant`
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let millis = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        Timestamp(millis)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Create a clock at the origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock at a given timestamp
    pub fn starting_at(at: Timestamp) -> Self {
        Self {
            millis: AtomicU64::new(at.0),
        }
    }

    /// Jump to `at`; ignored if `at` is in the past
    pub fn set(&self, at: Timestamp) {
        self.millis.fetch_max(at.0, Ordering::SeqCst);
    }

    /// Move forward by `duration`
    pub fn advance(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_arithmetic() {
        let t = Timestamp::from_millis(1500);
        assert_eq!(t.saturating_add(Duration::from_millis(500)), Timestamp(2000));
        assert_eq!(
            Timestamp(2000).saturating_duration_since(t),
            Duration::from_millis(500)
        );
        assert_eq!(t.saturating_duration_since(Timestamp(2000)), Duration::ZERO);
        assert_eq!(format!("{}", t), "t+1500ms");
    }

    #[test]
    fn test_manual_clock_never_goes_back() {
        let clock = ManualClock::starting_at(Timestamp(100));
        clock.advance(Duration::from_millis(50));
        assert_eq!(clock.now(), Timestamp(150));

        clock.set(Timestamp(10));
        assert_eq!(clock.now(), Timestamp(150));

        clock.set(Timestamp(400));
        assert_eq!(clock.now(), Timestamp(400));
    }

    #[test]
    fn test_monotonic_clock() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
