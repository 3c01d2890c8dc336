//! Goal tracking core data models.
//!
//! This crate defines the goal documents, the activity records progress is
//! computed from, and the calendar the whole engine compares dates with.

#![warn(missing_docs)]

// Core identities
mod id;

// Goals and activity
mod goal;
mod activity;

// Time
mod clock;
pub mod time;

// Re-exports
pub use id::*;

pub use goal::{Goal, GoalFilter, GoalKind, GoalStatus, GoalType, GoalUnit, ParseVariantError};
pub use activity::{
    ActivityKind, ActivityRecord, ContentCompletion, MockExam, StudySession, SubjectScore,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use time::{Calendar, TimeError};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
