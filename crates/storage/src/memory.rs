//! In-memory storage, for tests and throwaway sessions.

use std::collections::{BTreeMap, HashMap};

use goaltrack_core::{ActivityKind, ActivityRecord, Goal, GoalFilter, GoalId, OwnerId};

use super::{Result, Storage};

#[derive(Debug, Default, Clone)]
struct OwnerData {
    goals: BTreeMap<GoalId, Goal>,
    activity: Vec<ActivityRecord>,
}

/// Storage backend that keeps everything in a map.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    owners: HashMap<OwnerId, OwnerData>,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of goal documents an owner has, templates included.
    pub fn goal_count(&self, owner: &OwnerId) -> usize {
        self.owners.get(owner).map_or(0, |d| d.goals.len())
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn save_goal(&mut self, goal: &Goal) -> Result<()> {
        self.owners
            .entry(goal.owner_id.clone())
            .or_default()
            .goals
            .insert(goal.id, goal.clone());
        Ok(())
    }

    async fn load_goal(&self, owner: &OwnerId, id: GoalId) -> Result<Option<Goal>> {
        Ok(self.owners.get(owner).and_then(|d| d.goals.get(&id)).cloned())
    }

    async fn list_goals(&self, owner: &OwnerId, filter: &GoalFilter) -> Result<Vec<Goal>> {
        let mut goals: Vec<Goal> = self
            .owners
            .get(owner)
            .map(|d| d.goals.values().filter(|g| filter.matches(g)).cloned().collect())
            .unwrap_or_default();
        goals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(goals)
    }

    async fn delete_goal(&mut self, owner: &OwnerId, id: GoalId) -> Result<bool> {
        Ok(self
            .owners
            .get_mut(owner)
            .and_then(|d| d.goals.remove(&id))
            .is_some())
    }

    async fn save_activity(&mut self, owner: &OwnerId, record: &ActivityRecord) -> Result<()> {
        self.owners.entry(owner.clone()).or_default().activity.push(record.clone());
        Ok(())
    }

    async fn list_activity(&self, owner: &OwnerId, kind: ActivityKind) -> Result<Vec<ActivityRecord>> {
        Ok(self
            .owners
            .get(owner)
            .map(|d| d.activity.iter().filter(|r| r.kind() == kind).cloned().collect())
            .unwrap_or_default())
    }
}
