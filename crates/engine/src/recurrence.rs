//! Daily recurrence: spawning per-day instances from templates.
//!
//! Spawning is keyed by (template, calendar day), so running it again for a
//! day that already has an instance returns the existing one. That makes
//! retries after a partial failure safe.

use goaltrack_core::{Calendar, Goal, GoalFilter, GoalKind, GoalStatus, OwnerId, Time};
use goaltrack_storage::Storage;
use tracing::{debug, info};

use crate::config::EngineContext;
use crate::error::Result;

/// Creates instances of templates.
#[derive(Debug, Clone, Copy)]
pub struct RecurrenceSpawner {
    calendar: Calendar,
}

impl RecurrenceSpawner {
    /// Create a spawner comparing days in `calendar`.
    pub fn new(calendar: Calendar) -> Self {
        Self { calendar }
    }

    /// Day the first instance of `template` stands for: the later of the
    /// window start and today, when that day is inside the window.
    pub fn first_instance_day(&self, template: &Goal, today: Time) -> Option<Time> {
        let day = if self.calendar.is_before(today, template.window_start) {
            template.window_start
        } else {
            today
        };
        self.calendar
            .in_range(day, template.window_start, template.window_end)
            .then(|| self.calendar.anchor(day))
    }

    /// Make sure `template` has an instance for `day`.
    ///
    /// Returns the instance and whether it was created by this call.
    pub async fn ensure_instance<S: Storage + ?Sized>(
        &self,
        storage: &mut S,
        template: &Goal,
        day: Time,
        now: Time,
    ) -> goaltrack_storage::Result<(Goal, bool)> {
        let existing = storage
            .list_goals(&template.owner_id, &GoalFilter::instances_of(template.id))
            .await?;
        if let Some(instance) = existing
            .into_iter()
            .find(|g| g.reference_date.is_some_and(|d| self.calendar.same_day(d, day)))
        {
            debug!("Template {} already has instance {} for {}", template.id, instance.id, self.calendar.render_local_date(day));
            return Ok((instance, false));
        }

        let day = self.calendar.anchor(day);
        let instance = template.spawn_instance(day, &self.calendar.render_display_date(day), now);
        storage.save_goal(&instance).await?;
        info!(
            "Spawned instance {} of template {} for {}",
            instance.id,
            template.id,
            self.calendar.render_local_date(day)
        );
        Ok((instance, true))
    }

    /// Spawn the first instance of a freshly enabled template, if today
    /// (or the window start) falls within its window.
    pub async fn spawn_first<S: Storage + ?Sized>(
        &self,
        storage: &mut S,
        template: &Goal,
        today: Time,
        now: Time,
    ) -> goaltrack_storage::Result<Option<Goal>> {
        match self.first_instance_day(template, today) {
            Some(day) => Ok(Some(self.ensure_instance(storage, template, day, now).await?.0)),
            None => {
                info!(
                    "Template {} window {}..{} does not include {}; no instance spawned",
                    template.id,
                    self.calendar.render_local_date(template.window_start),
                    self.calendar.render_local_date(template.window_end),
                    self.calendar.render_local_date(today)
                );
                Ok(None)
            }
        }
    }
}

/// Daily trigger: gives every active template of an owner its instance for
/// today.
pub struct DailyRecurrence<S: Storage> {
    context: EngineContext<S>,
    spawner: RecurrenceSpawner,
}

impl<S: Storage> DailyRecurrence<S> {
    /// Create the trigger over a shared context.
    pub fn new(context: EngineContext<S>) -> Self {
        let spawner = RecurrenceSpawner::new(context.calendar);
        Self { context, spawner }
    }

    /// Spawn today's missing instances. Returns how many were created.
    pub async fn spawn_daily_instances(&self, owner: &OwnerId) -> Result<usize> {
        let now = self.context.now();
        let today = self.context.today();
        let calendar = self.context.calendar;

        let mut storage = self.context.storage.lock().await;
        let templates: Vec<Goal> = storage
            .list_goals(owner, &GoalFilter::with_status(GoalStatus::Active))
            .await?
            .into_iter()
            .filter(|g| g.kind() == GoalKind::Template)
            .filter(|g| calendar.in_range(today, g.window_start, g.window_end))
            .collect();

        let mut spawned = 0;
        for template in &templates {
            let (_, created) = self.spawner.ensure_instance(&mut *storage, template, today, now).await?;
            if created {
                spawned += 1;
            }
        }

        info!(
            "Daily recurrence for {}: {} template(s), {} instance(s) spawned",
            owner,
            templates.len(),
            spawned
        );
        Ok(spawned)
    }
}
