//! Time sources for the middleware.
//!
//! The observer stamps request start and end times through a [`Clock`] so
//! that tests can pin time and get reproducible log records.

use std::time::SystemTime;

/// Source of the current time.
///
/// The middleware never calls [`SystemTime::now`] directly; it goes through
/// the configured clock, which defaults to [`SystemClock`].
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> SystemTime;
}

/// Wall-clock [`Clock`]. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A [`Clock`] that always returns the same time. Intended for tests, where
/// a pinned clock makes two identical requests produce identical records.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub SystemTime);

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}
