//! Time sources.

use std::sync::Mutex;

use chrono::{Duration, Utc};

use crate::Time;

/// Something that knows the current instant.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Time;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<Time>,
}

impl FixedClock {
    /// Create a clock frozen at `now`.
    pub fn new(now: Time) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: Time) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Time {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
