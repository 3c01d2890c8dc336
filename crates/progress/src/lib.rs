//! Progress Tracking
//!
//! Goal progress computed from students' activity records.

#![warn(missing_docs)]

pub mod aggregator;
pub mod tracker;

pub use aggregator::{ActivityAggregator, ProgressQuery};
pub use tracker::ProgressTracker;
