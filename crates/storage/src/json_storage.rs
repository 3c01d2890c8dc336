//! JSON file storage implementation.
//!
//! Stores each document as a JSON file under a per-owner directory and keeps
//! small per-goal meta markers (version + updated_at). When a tenant is set,
//! everything lives under `mentorias/{tenant}/`; otherwise under the root.

use std::path::{Path, PathBuf};

use goaltrack_core::{
    ActivityKind, ActivityRecord, Calendar, Goal, GoalFilter, GoalId, OwnerId, TenantId,
};
use tokio::fs;
use tracing::{debug, warn};
use ulid::Ulid;

use super::adapter;
use super::{Result, Storage, StorageError};

/// File-based JSON storage backend.
pub struct JsonStorage {
    base: PathBuf,
    calendar: Calendar,
}

impl JsonStorage {
    /// Open storage at `root`, scoped to `tenant` when given.
    pub async fn new(root: impl AsRef<Path>, tenant: Option<&TenantId>, calendar: Calendar) -> Result<Self> {
        let base = match tenant {
            Some(tenant) => {
                validate_segment(tenant.as_str())?;
                root.as_ref().join("mentorias").join(tenant.as_str())
            }
            None => root.as_ref().to_path_buf(),
        };
        fs::create_dir_all(base.join("owners")).await?;
        debug!("Opened JSON storage at {}", base.display());

        Ok(Self { base, calendar })
    }

    /// Directory everything is stored under.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn owner_dir(&self, owner: &OwnerId) -> Result<PathBuf> {
        validate_segment(owner.as_str())?;
        Ok(self.base.join("owners").join(owner.as_str()))
    }

    fn goals_dir(&self, owner: &OwnerId) -> Result<PathBuf> {
        Ok(self.owner_dir(owner)?.join("goals"))
    }

    fn goal_path(&self, owner: &OwnerId, id: GoalId) -> Result<PathBuf> {
        Ok(self.goals_dir(owner)?.join(format!("{}.json", id)))
    }

    fn meta_path(&self, owner: &OwnerId, id: GoalId) -> Result<PathBuf> {
        Ok(self.owner_dir(owner)?.join("meta").join("goals").join(format!("{}.meta.json", id)))
    }

    fn activity_dir(&self, owner: &OwnerId, kind: ActivityKind) -> Result<PathBuf> {
        let name = match kind {
            ActivityKind::Study => "studies",
            ActivityKind::MockExam => "mock_exams",
            ActivityKind::Content => "contents",
        };
        Ok(self.owner_dir(owner)?.join(name))
    }

    /// Read and increment per-goal version, return new version.
    async fn bump_version(&self, owner: &OwnerId, id: GoalId) -> Result<u64> {
        let path = self.meta_path(owner, id)?;
        let mut version = 0u64;
        if let Ok(s) = fs::read_to_string(&path).await {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&s) {
                if let Some(v) = json.get("version").and_then(|v| v.as_u64()) {
                    version = v;
                }
            }
        }
        version += 1;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let meta = serde_json::json!({"version": version, "updated_at": chrono::Utc::now()});
        fs::write(&path, serde_json::to_string_pretty(&meta)?.as_bytes()).await?;
        Ok(version)
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn save_goal(&mut self, goal: &Goal) -> Result<()> {
        let dir = self.goals_dir(&goal.owner_id)?;
        fs::create_dir_all(&dir).await?;

        let path = self.goal_path(&goal.owner_id, goal.id)?;
        let json = serde_json::to_string_pretty(goal)?;
        fs::write(&path, json.as_bytes()).await?;

        let version = self.bump_version(&goal.owner_id, goal.id).await?;
        debug!("Saved goal {} (version {})", goal.id, version);
        Ok(())
    }

    async fn load_goal(&self, owner: &OwnerId, id: GoalId) -> Result<Option<Goal>> {
        let goal: Option<Goal> = read_json(&self.goal_path(owner, id)?).await?;
        Ok(goal.filter(|g| &g.owner_id == owner))
    }

    async fn list_goals(&self, owner: &OwnerId, filter: &GoalFilter) -> Result<Vec<Goal>> {
        let mut goals: Vec<Goal> = list_dir(&self.goals_dir(owner)?).await?;
        goals.retain(|g| &g.owner_id == owner && filter.matches(g));
        goals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(goals)
    }

    async fn delete_goal(&mut self, owner: &OwnerId, id: GoalId) -> Result<bool> {
        let existed = remove_if_exists(&self.goal_path(owner, id)?).await?;
        remove_if_exists(&self.meta_path(owner, id)?).await?;
        Ok(existed)
    }

    async fn save_activity(&mut self, owner: &OwnerId, record: &ActivityRecord) -> Result<()> {
        let dir = self.activity_dir(owner, record.kind())?;
        fs::create_dir_all(&dir).await?;

        let json = match record {
            ActivityRecord::Study(s) => serde_json::to_string_pretty(s)?,
            ActivityRecord::MockExam(m) => serde_json::to_string_pretty(m)?,
            ActivityRecord::Content(c) => serde_json::to_string_pretty(c)?,
        };
        fs::write(dir.join(format!("{}.json", Ulid::new())), json.as_bytes()).await?;
        Ok(())
    }

    async fn list_activity(&self, owner: &OwnerId, kind: ActivityKind) -> Result<Vec<ActivityRecord>> {
        let raw: Vec<serde_json::Value> = list_dir(&self.activity_dir(owner, kind)?).await?;
        let total = raw.len();
        let records: Vec<ActivityRecord> = raw
            .iter()
            .filter_map(|value| adapter::record_from_value(kind, value, &self.calendar))
            .collect();
        if records.len() < total {
            warn!(
                "Skipped {} {:?} record(s) without a readable date for {}",
                total - records.len(),
                kind,
                owner
            );
        }
        Ok(records)
    }
}

/// Owner and tenant ids become directory names.
fn validate_segment(segment: &str) -> Result<()> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(&['/', '\\', '\0'][..]);
    if bad {
        return Err(StorageError::Other(format!("invalid path segment '{}'", segment)));
    }
    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(items),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&entry.path()).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable file {}: {}", entry.path().display(), e),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use goaltrack_core::{GoalStatus, GoalType, StudySession};

    fn goal_for(owner: &str, cal: &Calendar) -> Goal {
        let start = cal.parse_local_date("2026-01-01").unwrap();
        let end = cal.parse_local_date("2026-01-07").unwrap();
        Goal::new(OwnerId::new(owner), GoalType::Hours, "Study 10h", 10.0, start, end, start)
    }

    #[tokio::test]
    async fn test_goal_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cal = Calendar::default();
        let mut storage = JsonStorage::new(dir.path(), None, cal).await.unwrap();

        let goal = goal_for("student-1", &cal);
        storage.save_goal(&goal).await.unwrap();

        let loaded = storage.load_goal(&goal.owner_id, goal.id).await.unwrap().unwrap();
        assert_eq!(loaded, goal);
        assert!(dir
            .path()
            .join("owners/student-1/goals")
            .join(format!("{}.json", goal.id))
            .exists());
    }

    #[tokio::test]
    async fn test_meta_version_bumps() {
        let dir = tempfile::tempdir().unwrap();
        let cal = Calendar::default();
        let mut storage = JsonStorage::new(dir.path(), None, cal).await.unwrap();
        let goal = goal_for("student-1", &cal);

        storage.save_goal(&goal).await.unwrap();
        storage.save_goal(&goal).await.unwrap();

        let meta = dir
            .path()
            .join("owners/student-1/meta/goals")
            .join(format!("{}.meta.json", goal.id));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(meta).unwrap()).unwrap();
        assert_eq!(json["version"], 2);
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let cal = Calendar::default();
        let mut storage = JsonStorage::new(dir.path(), None, cal).await.unwrap();

        let mine = goal_for("student-1", &cal);
        let theirs = goal_for("student-2", &cal);
        storage.save_goal(&mine).await.unwrap();
        storage.save_goal(&theirs).await.unwrap();

        let listed = storage.list_goals(&mine.owner_id, &GoalFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);
        assert!(storage.load_goal(&mine.owner_id, theirs.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filter_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let cal = Calendar::default();
        let mut storage = JsonStorage::new(dir.path(), None, cal).await.unwrap();

        let active = goal_for("student-1", &cal);
        let mut done = goal_for("student-1", &cal);
        done.complete(done.created_at);
        storage.save_goals(&[active.clone(), done.clone()]).await.unwrap();

        let owner = active.owner_id.clone();
        let completed = storage
            .list_goals(&owner, &GoalFilter::with_status(GoalStatus::Completed))
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, done.id);

        assert!(storage.delete_goal(&owner, done.id).await.unwrap());
        assert!(!storage.delete_goal(&owner, done.id).await.unwrap());
        assert_eq!(storage.delete_goals(&owner, &[active.id, done.id]).await.unwrap(), 1);
        assert!(storage.list_goals(&owner, &GoalFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tenant_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let cal = Calendar::default();
        let tenant = TenantId::new("acme");
        let mut storage = JsonStorage::new(dir.path(), Some(&tenant), cal).await.unwrap();

        let goal = goal_for("student-1", &cal);
        storage.save_goal(&goal).await.unwrap();

        assert_eq!(storage.base(), dir.path().join("mentorias/acme"));
        assert!(dir
            .path()
            .join("mentorias/acme/owners/student-1/goals")
            .join(format!("{}.json", goal.id))
            .exists());

        // Root-mode storage over the same directory does not see tenant goals.
        let root = JsonStorage::new(dir.path(), None, cal).await.unwrap();
        assert!(root.list_goals(&goal.owner_id, &GoalFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let cal = Calendar::default();
        let storage = JsonStorage::new(dir.path(), None, cal).await.unwrap();
        let result = storage.list_goals(&OwnerId::new("../escape"), &GoalFilter::default()).await;
        assert!(matches!(result, Err(StorageError::Other(_))));
        assert!(JsonStorage::new(dir.path(), Some(&TenantId::new("a/b")), cal).await.is_err());
    }

    #[tokio::test]
    async fn test_activity_round_trip_and_legacy_files() {
        let dir = tempfile::tempdir().unwrap();
        let cal = Calendar::default();
        let mut storage = JsonStorage::new(dir.path(), None, cal).await.unwrap();
        let owner = OwnerId::new("student-1");

        let study = StudySession {
            date: cal.parse_local_date("2026-01-05").unwrap(),
            subject: "math".to_string(),
            minutes_spent: 90.0,
            questions_attempted: 20.0,
            questions_correct: 15.0,
        };
        storage.save_activity(&owner, &ActivityRecord::Study(study.clone())).await.unwrap();

        let studies = dir.path().join("owners/student-1/studies");
        std::fs::write(studies.join("legacy.json"), r#"{"date":"2026-01-06","minutesSpent":30}"#).unwrap();
        std::fs::write(studies.join("broken.json"), r#"{"minutesSpent":30}"#).unwrap();

        let mut records = storage.list_activity(&owner, ActivityKind::Study).await.unwrap();
        records.sort_by_key(|r| r.date());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], ActivityRecord::Study(study));
        assert_eq!(cal.render_local_date(records[1].date()), "2026-01-06");

        assert!(storage.list_activity(&owner, ActivityKind::MockExam).await.unwrap().is_empty());
    }
}
