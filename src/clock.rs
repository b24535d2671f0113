//! # Clock
//! Wall-clock abstraction. Everything that asks "what time is it" or "which day is
//! today" goes through [`Clock`], so TTL and daily-reset logic can be driven from tests.

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate};

pub trait Clock: Send + Sync {
    /// Device-local time, offset included.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Reads the host clock in the host's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Settable clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    inner: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            inner: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<FixedOffset>) {
        *self.inner.lock().expect("clock mutex poisoned") = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut g = self.inner.lock().expect("clock mutex poisoned");
        *g += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.inner.lock().expect("clock mutex poisoned")
    }
}

/// Calendar date at the device's location. Local midnight is the day boundary.
pub fn local_date(clock: &dyn Clock) -> NaiveDate {
    clock.now().date_naive()
}

/// `YYYY-MM-DD` form of [`local_date`], used as the ledger's stored day marker.
pub fn local_date_string(clock: &dyn Clock) -> String {
    local_date(clock).format("%Y-%m-%d").to_string()
}
