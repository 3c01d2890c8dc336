//! Storage trait abstraction.

use async_trait::async_trait;
use goaltrack_core::{ActivityKind, ActivityRecord, Goal, GoalFilter, GoalId, OwnerId};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Storage abstraction for goal documents and the activity records they
/// are measured against.
///
/// Everything is scoped by owner; no operation reads across owners.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Goal operations ===

    /// Save a goal (create or update).
    async fn save_goal(&mut self, goal: &Goal) -> Result<()>;

    /// Save several goals as one batch.
    async fn save_goals(&mut self, goals: &[Goal]) -> Result<()> {
        for goal in goals {
            self.save_goal(goal).await?;
        }
        Ok(())
    }

    /// Load a goal by ID.
    async fn load_goal(&self, owner: &OwnerId, id: GoalId) -> Result<Option<Goal>>;

    /// List an owner's goals matching the filter, oldest first.
    async fn list_goals(&self, owner: &OwnerId, filter: &GoalFilter) -> Result<Vec<Goal>>;

    /// Delete a goal. Returns whether it existed.
    async fn delete_goal(&mut self, owner: &OwnerId, id: GoalId) -> Result<bool>;

    /// Delete several goals. Returns how many existed.
    async fn delete_goals(&mut self, owner: &OwnerId, ids: &[GoalId]) -> Result<usize> {
        let mut deleted = 0;
        for id in ids {
            if self.delete_goal(owner, *id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    // === Activity operations ===

    /// Record an activity for an owner.
    async fn save_activity(&mut self, owner: &OwnerId, record: &ActivityRecord) -> Result<()>;

    /// List an owner's activity records of one kind.
    async fn list_activity(&self, owner: &OwnerId, kind: ActivityKind) -> Result<Vec<ActivityRecord>>;
}
