//! Authorized entry point for remote callers.

use std::sync::Arc;

use goaltrack_core::{Goal, GoalId, OwnerId};
use goaltrack_storage::Storage;
use tracing::warn;

use crate::auth::{require_role, Authorizer, Caller, Role};
use crate::config::EngineContext;
use crate::error::{GoalError, Result};
use crate::manager::{BasicGoalManager, GoalManager};
use crate::recurrence::DailyRecurrence;
use crate::request::{CreateGoalRequest, UpdateGoalRequest};
use crate::sweeper::ExpirationSweeper;

const GOAL_ROLES: &[Role] = &[Role::Student, Role::Mentor];
const SCHEDULER_ROLES: &[Role] = &[Role::Student, Role::Mentor, Role::Manager];

/// Goal manager, sweeper and daily recurrence behind one authorization gate.
pub struct GoalService<S: Storage> {
    manager: BasicGoalManager<S>,
    sweeper: ExpirationSweeper<S>,
    recurrence: DailyRecurrence<S>,
    authorizer: Arc<dyn Authorizer>,
}

impl<S: Storage + 'static> GoalService<S> {
    /// Create the service over a shared context.
    pub fn new(context: EngineContext<S>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            manager: BasicGoalManager::new(context.clone()),
            sweeper: ExpirationSweeper::new(context.clone()),
            recurrence: DailyRecurrence::new(context),
            authorizer,
        }
    }

    /// The underlying manager, without authorization.
    pub fn manager(&self) -> &BasicGoalManager<S> {
        &self.manager
    }

    /// Identify the caller behind a token.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Caller> {
        let result = match token {
            Some(token) if !token.is_empty() => self.authorizer.resolve(token).await,
            _ => Err(GoalError::Unauthenticated("missing token".to_string())),
        };
        if let Err(e) = &result {
            warn!("Rejected caller: {}", e);
        }
        result
    }

    async fn authorize(&self, caller: &Caller, owner: &OwnerId, allowed: &[Role]) -> Result<()> {
        let result = require_role(&*self.authorizer, caller, owner, allowed).await;
        if let Err(e) = &result {
            warn!("{}", e);
        }
        result
    }

    /// List visible goals.
    pub async fn list_goals(&self, caller: &Caller, owner: &OwnerId) -> Result<Vec<Goal>> {
        self.authorize(caller, owner, GOAL_ROLES).await?;
        self.manager.list_goals(owner).await
    }

    /// Load one goal.
    pub async fn get_goal(&self, caller: &Caller, owner: &OwnerId, id: GoalId) -> Result<Goal> {
        self.authorize(caller, owner, GOAL_ROLES).await?;
        self.manager.get_goal(owner, id).await
    }

    /// Create a goal. Goals created for someone else record who created them.
    pub async fn create_goal(&self, caller: &Caller, owner: &OwnerId, request: CreateGoalRequest) -> Result<GoalId> {
        self.authorize(caller, owner, GOAL_ROLES).await?;
        let created_by = (caller.uid != owner.as_str()).then(|| caller.uid.clone());
        self.manager.create_goal(owner, request, created_by).await
    }

    /// Update a goal.
    pub async fn update_goal(
        &self,
        caller: &Caller,
        owner: &OwnerId,
        id: GoalId,
        request: UpdateGoalRequest,
    ) -> Result<GoalId> {
        self.authorize(caller, owner, GOAL_ROLES).await?;
        self.manager.update_goal(owner, id, request).await
    }

    /// Delete a goal.
    pub async fn delete_goal(&self, caller: &Caller, owner: &OwnerId, id: GoalId) -> Result<()> {
        self.authorize(caller, owner, GOAL_ROLES).await?;
        self.manager.delete_goal(owner, id).await
    }

    /// Expire closed goals of an owner.
    pub async fn sweep_expired(&self, caller: &Caller, owner: &OwnerId) -> Result<usize> {
        self.authorize(caller, owner, SCHEDULER_ROLES).await?;
        self.sweeper.sweep_expired(owner).await
    }

    /// Spawn today's instances for an owner.
    pub async fn spawn_daily_instances(&self, caller: &Caller, owner: &OwnerId) -> Result<usize> {
        self.authorize(caller, owner, SCHEDULER_ROLES).await?;
        self.recurrence.spawn_daily_instances(owner).await
    }
}
