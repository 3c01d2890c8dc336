//! Goal lifecycle management service.

use async_trait::async_trait;
use goaltrack_core::{Goal, GoalFilter, GoalId, GoalKind, GoalStatus, OwnerId};
use goaltrack_storage::Storage;
use tracing::{error, info, warn};

use crate::config::EngineContext;
use crate::error::{GoalError, Result};
use crate::recurrence::RecurrenceSpawner;
use crate::request::{check_window, CreateGoalRequest, GoalPatch, UpdateGoalRequest};

/// Goal lifecycle operations, scoped to one owner.
#[async_trait]
pub trait GoalManager: Send + Sync {
    /// Visible goals of the owner, newest first.
    async fn list_goals(&self, owner: &OwnerId) -> Result<Vec<Goal>>;

    /// Load one goal, templates included.
    async fn get_goal(&self, owner: &OwnerId, id: GoalId) -> Result<Goal>;

    /// Create a goal. Returns its id (the template id when recurring).
    async fn create_goal(
        &self,
        owner: &OwnerId,
        request: CreateGoalRequest,
        created_by: Option<String>,
    ) -> Result<GoalId>;

    /// Apply a partial update.
    async fn update_goal(&self, owner: &OwnerId, id: GoalId, request: UpdateGoalRequest) -> Result<GoalId>;

    /// Delete exactly one goal document.
    async fn delete_goal(&self, owner: &OwnerId, id: GoalId) -> Result<()>;
}

/// Goal manager over a shared engine context.
pub struct BasicGoalManager<S: Storage> {
    context: EngineContext<S>,
    spawner: RecurrenceSpawner,
}

impl<S: Storage> BasicGoalManager<S> {
    /// Create a new goal manager.
    pub fn new(context: EngineContext<S>) -> Self {
        let spawner = RecurrenceSpawner::new(context.calendar);
        Self { context, spawner }
    }

    /// The context this manager runs on.
    pub fn context(&self) -> &EngineContext<S> {
        &self.context
    }

    async fn load(&self, storage: &S, owner: &OwnerId, id: GoalId) -> Result<Goal> {
        storage
            .load_goal(owner, id)
            .await?
            .ok_or_else(|| GoalError::NotFound(format!("goal {} for owner {}", id, owner)))
    }

    fn apply_fields(&self, goal: &mut Goal, patch: &GoalPatch) -> Result<()> {
        if let Some(name) = &patch.name {
            goal.name = name.clone();
        }
        if let Some(description) = &patch.description {
            goal.description = description.clone();
        }
        if let Some(target) = patch.target_value {
            goal.target_value = target;
        }
        if let Some(unit) = patch.unit {
            goal.unit = unit;
        }
        if let Some(start) = patch.window_start {
            goal.window_start = start;
        }
        if let Some(end) = patch.window_end {
            goal.window_end = end;
        }
        check_window(&self.context.calendar, goal.window_start, goal.window_end)?;
        if let Some(subject) = &patch.subject_filter {
            goal.subject_filter = subject.clone();
        }
        if let Some(category) = &patch.category_filter {
            goal.category_filter = category.clone();
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Storage + 'static> GoalManager for BasicGoalManager<S> {
    async fn list_goals(&self, owner: &OwnerId) -> Result<Vec<Goal>> {
        let storage = self.context.storage.lock().await;
        let filter = GoalFilter { visible_only: true, ..Default::default() };
        let mut goals = storage.list_goals(owner, &filter).await?;
        goals.reverse();
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }

    async fn get_goal(&self, owner: &OwnerId, id: GoalId) -> Result<Goal> {
        let storage = self.context.storage.lock().await;
        self.load(&storage, owner, id).await
    }

    async fn create_goal(
        &self,
        owner: &OwnerId,
        request: CreateGoalRequest,
        created_by: Option<String>,
    ) -> Result<GoalId> {
        let draft = request.validate(&self.context.calendar)?;
        let now = self.context.now();
        let today = self.context.today();

        let mut goal = Goal::new(
            owner.clone(),
            draft.goal_type,
            draft.name,
            draft.target_value,
            draft.window_start,
            draft.window_end,
            now,
        );
        goal.description = draft.description;
        goal.unit = draft.unit;
        goal.subject_filter = draft.subject_filter;
        goal.category_filter = draft.category_filter;
        goal.created_by = created_by;

        let mut storage = self.context.storage.lock().await;

        if !draft.is_recurring {
            let value = self.context.tracker.measure_goal(&*storage, &goal, today).await?;
            goal.apply_progress(value, now);
            storage.save_goal(&goal).await?;
            info!(
                "Created goal {} ({}) for {}: {}/{} {}",
                goal.id, goal.goal_type, owner, goal.current_value, goal.target_value, goal.status
            );
            return Ok(goal.id);
        }

        goal.make_template();
        storage.save_goal(&goal).await?;
        if let Err(e) = self.spawner.spawn_first(&mut *storage, &goal, today, now).await {
            error!("Failed to spawn first instance of template {}: {}", goal.id, e);
            if let Err(undo) = storage.delete_goal(owner, goal.id).await {
                warn!("Failed to remove template {} after spawn failure: {}", goal.id, undo);
            }
            return Err(e.into());
        }
        info!("Created recurring goal {} ({}) for {}", goal.id, goal.goal_type, owner);
        Ok(goal.id)
    }

    async fn update_goal(&self, owner: &OwnerId, id: GoalId, request: UpdateGoalRequest) -> Result<GoalId> {
        let calendar = self.context.calendar;
        let mut storage = self.context.storage.lock().await;
        let mut goal = self.load(&storage, owner, id).await?;
        let patch = request.validate(&calendar)?;
        let now = self.context.now();
        let today = self.context.today();
        let kind_before = goal.kind();

        self.apply_fields(&mut goal, &patch)?;

        let mut spawn_after_save = false;
        match (kind_before, patch.is_recurring) {
            (GoalKind::Instance, Some(_)) => {
                return Err(GoalError::InvalidArgument(format!(
                    "goal {} is an instance of a recurring goal; recurrence is set on its template",
                    id
                )));
            }
            (GoalKind::OneShot, Some(true)) => {
                goal.make_template();
                spawn_after_save = true;
            }
            (GoalKind::Template, Some(true)) => spawn_after_save = true,
            (GoalKind::Template, Some(false)) => {
                let instances: Vec<GoalId> = storage
                    .list_goals(owner, &GoalFilter::instances_of(id))
                    .await?
                    .into_iter()
                    .map(|g| g.id)
                    .collect();
                let deleted = storage.delete_goals(owner, &instances).await?;
                info!("Recurrence disabled on {}: removed {} instance(s)", id, deleted);
                goal.is_recurring = false;
            }
            _ => {}
        }

        if kind_before == GoalKind::OneShot && goal.kind() == GoalKind::OneShot && patch.changes_measurement() {
            let value = self.context.tracker.measure_goal(&*storage, &goal, today).await?;
            goal.apply_progress(value, now);
        }

        match patch.status {
            Some(GoalStatus::Completed) => goal.complete(now),
            Some(GoalStatus::Active) => goal.reopen(),
            _ => {}
        }

        goal.updated_at = now;
        storage.save_goal(&goal).await?;
        if spawn_after_save {
            self.spawner.spawn_first(&mut *storage, &goal, today, now).await?;
        }

        info!("Updated goal {} for {}: {}/{} {}", id, owner, goal.current_value, goal.target_value, goal.status);
        Ok(id)
    }

    async fn delete_goal(&self, owner: &OwnerId, id: GoalId) -> Result<()> {
        let mut storage = self.context.storage.lock().await;
        if !storage.delete_goal(owner, id).await? {
            return Err(GoalError::NotFound(format!("goal {} for owner {}", id, owner)));
        }
        info!("Deleted goal {} for {}", id, owner);
        Ok(())
    }
}
