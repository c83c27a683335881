//! Monotonic time points used for change tracking.
//!
//! Every call to [`TimePoint::now`] returns a value strictly greater than any
//! value handed out before it in this process, so two dirty events can never
//! share a time point even when the clock resolution is coarse.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);
static LAST_ISSUED: AtomicU64 = AtomicU64::new(0);

/// A point on the process-wide monotonic clock, in nanoseconds since the
/// clock was first read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePoint(u64);

impl TimePoint {
    /// Read the clock.
    pub fn now() -> Self {
        let elapsed = EPOCH.elapsed().as_nanos() as u64;
        let mut last = LAST_ISSUED.load(Ordering::Relaxed);
        loop {
            let next = elapsed.max(last + 1);
            match LAST_ISSUED.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return Self(next),
                Err(actual) => last = actual,
            }
        }
    }

    /// Time elapsed between `earlier` and `self`, zero if `earlier` is later.
    pub fn duration_since(&self, earlier: TimePoint) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}
