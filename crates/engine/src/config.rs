//! Engine configuration and shared context.

use std::sync::Arc;

use goaltrack_core::{time, Calendar, Clock, Time, TimeError};
use goaltrack_progress::ProgressTracker;
use goaltrack_storage::Storage;
use tokio::sync::Mutex;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// UTC offset of the target timezone, in hours
    pub utc_offset_hours: i32,
    /// Local hour dates are anchored at
    pub anchor_hour: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: time::DEFAULT_UTC_OFFSET_HOURS,
            anchor_hour: time::DEFAULT_ANCHOR_HOUR,
        }
    }
}

impl EngineConfig {
    /// The calendar this configuration describes.
    pub fn calendar(&self) -> Result<Calendar, TimeError> {
        Calendar::new(self.utc_offset_hours, self.anchor_hour)
    }
}

/// Storage, clock and calendar shared by the manager, sweeper and spawner.
pub struct EngineContext<S: Storage> {
    pub(crate) storage: Arc<Mutex<S>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) calendar: Calendar,
    pub(crate) tracker: ProgressTracker,
}

impl<S: Storage> EngineContext<S> {
    /// Build a context from configuration.
    pub fn new(storage: S, clock: Arc<dyn Clock>, config: &EngineConfig) -> Result<Self, TimeError> {
        Ok(Self::with_calendar(storage, clock, config.calendar()?))
    }

    /// Build a context with an explicit calendar.
    pub fn with_calendar(storage: S, clock: Arc<dyn Clock>, calendar: Calendar) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            clock,
            calendar,
            tracker: ProgressTracker::new(calendar),
        }
    }

    /// Shared handle to the storage.
    pub fn storage(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.storage)
    }

    /// The calendar dates are compared in.
    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    pub(crate) fn now(&self) -> Time {
        self.clock.now()
    }

    pub(crate) fn today(&self) -> Time {
        self.calendar.today(&*self.clock)
    }
}

impl<S: Storage> Clone for EngineContext<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            clock: Arc::clone(&self.clock),
            calendar: self.calendar,
            tracker: self.tracker,
        }
    }
}
