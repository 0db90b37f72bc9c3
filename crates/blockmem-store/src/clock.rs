use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// A monotonic clock reading in nanoseconds since the clock's origin.
///
/// Timestamps from the same clock are totally ordered; timestamps from
/// different clocks are not comparable in any meaningful way.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// The clock origin.
    pub const fn zero() -> Self {
        Self(0)
    }

    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Returns `true` if this reading is strictly later than `other`.
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn duration_since(&self, earlier: &Self) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ns)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Source of timestamps for object metadata.
pub trait Clock {
    /// Current reading. Never smaller than an earlier reading of the same clock.
    fn now(&self) -> Timestamp;
}

/// Wall-independent clock backed by [`Instant`].
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// A clock whose origin is the moment of construction.
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
        let nanos = u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX);
        Timestamp(nanos)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same reading, so a test can keep one handle and give the
/// other to an [`ObjectStorage`](crate::ObjectStorage).
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(start.0)),
        }
    }

    /// Move the clock forward by `by` and return the new reading.
    pub fn advance(&self, by: Duration) -> Timestamp {
        let step = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let prev = self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_add(step))
            })
            .unwrap_or_else(|n| n);
        Timestamp(prev.saturating_add(step))
    }

    /// Jump to `to`. Readings never go backwards, so earlier values are ignored.
    pub fn set(&self, to: Timestamp) {
        self.nanos.fetch_max(to.0, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.nanos.load(Ordering::SeqCst))
    }
}
