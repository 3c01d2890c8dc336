//! Progress tracking service.

use goaltrack_core::{Calendar, Goal, OwnerId, Time};
use goaltrack_storage::Storage;
use tracing::debug;

use crate::aggregator::{ActivityAggregator, ProgressQuery};

/// Loads the activity a query needs and runs the aggregator over it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressTracker {
    aggregator: ActivityAggregator,
}

impl ProgressTracker {
    /// Create a tracker comparing days in `calendar`.
    pub fn new(calendar: Calendar) -> Self {
        Self { aggregator: ActivityAggregator::new(calendar) }
    }

    /// The underlying aggregator.
    pub fn aggregator(&self) -> &ActivityAggregator {
        &self.aggregator
    }

    /// Measure `query` against an owner's stored activity.
    pub async fn measure<S: Storage + ?Sized>(
        &self,
        storage: &S,
        owner: &OwnerId,
        query: &ProgressQuery,
        today: Time,
    ) -> goaltrack_storage::Result<f64> {
        let records = storage.list_activity(owner, query.source_kind()).await?;
        let value = self.aggregator.compute(query, &records, today);
        debug!(
            "Measured {} over {} record(s) for {}: {}",
            query.goal_type,
            records.len(),
            owner,
            value
        );
        Ok(value)
    }

    /// Measure a goal's current value.
    pub async fn measure_goal<S: Storage + ?Sized>(
        &self,
        storage: &S,
        goal: &Goal,
        today: Time,
    ) -> goaltrack_storage::Result<f64> {
        self.measure(storage, &goal.owner_id, &ProgressQuery::for_goal(goal), today).await
    }
}
