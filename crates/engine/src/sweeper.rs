//! Expiration sweep.

use goaltrack_core::{Goal, GoalFilter, GoalStatus, OwnerId};
use goaltrack_storage::Storage;
use tracing::info;

use crate::config::EngineContext;
use crate::error::Result;

/// Moves active goals whose window has closed to `expired`.
pub struct ExpirationSweeper<S: Storage> {
    context: EngineContext<S>,
}

impl<S: Storage> ExpirationSweeper<S> {
    /// Create a sweeper over a shared context.
    pub fn new(context: EngineContext<S>) -> Self {
        Self { context }
    }

    /// Expire every active goal of `owner` whose last day is before today.
    /// Returns how many goals were expired.
    pub async fn sweep_expired(&self, owner: &OwnerId) -> Result<usize> {
        let now = self.context.now();
        let today = self.context.today();
        let calendar = self.context.calendar;

        let mut storage = self.context.storage.lock().await;
        let expired: Vec<Goal> = storage
            .list_goals(owner, &GoalFilter::with_status(GoalStatus::Active))
            .await?
            .into_iter()
            .filter(|g| calendar.is_before(g.window_end, today))
            .map(|mut g| {
                g.status = GoalStatus::Expired;
                g.updated_at = now;
                g
            })
            .collect();

        if !expired.is_empty() {
            storage.save_goals(&expired).await?;
        }
        info!("Expiration sweep for {}: {} goal(s) expired", owner, expired.len());
        Ok(expired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goaltrack_core::{Calendar, FixedClock, GoalType, Time};
    use goaltrack_storage::MemoryStorage;
    use std::sync::Arc;

    fn day(s: &str) -> Time {
        Calendar::default().parse_local_date(s).unwrap()
    }

    fn goal(end: &str) -> Goal {
        let owner = OwnerId::new("student-1");
        Goal::new(owner, GoalType::Hours, "Hours", 10.0, day("2026-01-01"), day(end), day("2026-01-01"))
    }

    #[tokio::test]
    async fn test_sweep_expires_closed_windows_once() {
        let owner = OwnerId::new("student-1");
        let closed = goal("2026-01-04");
        let ends_today = goal("2026-01-05");
        let mut done = goal("2026-01-02");
        done.complete(day("2026-01-02"));
        let mut template = goal("2026-01-03");
        template.make_template();

        let mut storage = MemoryStorage::new();
        for g in [&closed, &ends_today, &done, &template] {
            storage.save_goal(g).await.unwrap();
        }

        // Late evening on the 5th is still the 5th locally.
        let clock = Arc::new(FixedClock::new(day("2026-01-05") + chrono::Duration::hours(10)));
        let context = EngineContext::with_calendar(storage, clock, Calendar::default());
        let sweeper = ExpirationSweeper::new(context.clone());

        assert_eq!(sweeper.sweep_expired(&owner).await.unwrap(), 2);
        assert_eq!(sweeper.sweep_expired(&owner).await.unwrap(), 0);

        let storage = context.storage();
        let storage = storage.lock().await;
        for (id, expected) in [
            (closed.id, GoalStatus::Expired),
            (template.id, GoalStatus::Expired),
            (ends_today.id, GoalStatus::Active),
            (done.id, GoalStatus::Completed),
        ] {
            let stored = storage.load_goal(&owner, id).await.unwrap().unwrap();
            assert_eq!(stored.status, expected);
        }
    }
}
