//! Callers, roles and the authorization gate in front of every operation.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use goaltrack_core::OwnerId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GoalError, Result};

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Acts on their own goals
    Student,
    /// Acts on assigned students
    Mentor,
    /// Acts on anyone
    Manager,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Student => "student",
            Role::Mentor => "mentor",
            Role::Manager => "manager",
        };
        f.write_str(name)
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Caller identity
    pub uid: String,
    /// Caller role
    pub role: Role,
}

impl Caller {
    /// Create a caller.
    pub fn new(uid: impl Into<String>, role: Role) -> Self {
        Self { uid: uid.into(), role }
    }
}

/// Resolves tokens into callers and answers mentor assignment questions.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Identify the caller behind `token`.
    async fn resolve(&self, token: &str) -> Result<Caller>;

    /// Whether `owner` is one of the mentor's students.
    async fn is_assigned(&self, mentor_uid: &str, owner: &OwnerId) -> Result<bool>;
}

/// Check that `caller` may act on `owner`'s goals.
///
/// The role must be in `allowed`. Students may only act on themselves,
/// mentors on their assigned students, managers on anyone.
pub async fn require_role(
    authorizer: &dyn Authorizer,
    caller: &Caller,
    owner: &OwnerId,
    allowed: &[Role],
) -> Result<()> {
    if !allowed.contains(&caller.role) {
        return Err(GoalError::PermissionDenied(format!(
            "role {} may not perform this operation",
            caller.role
        )));
    }

    let permitted = match caller.role {
        Role::Student => caller.uid == owner.as_str(),
        Role::Mentor => authorizer.is_assigned(&caller.uid, owner).await?,
        Role::Manager => true,
    };
    if !permitted {
        return Err(GoalError::PermissionDenied(format!(
            "{} {} may not act on {}",
            caller.role, caller.uid, owner
        )));
    }
    debug!("{} {} authorized for {}", caller.role, caller.uid, owner);
    Ok(())
}

/// Authorizer backed by an in-memory token table, usually loaded from
/// `auth.json`:
///
/// ```json
/// {
///   "tokens": { "t-ana": { "uid": "ana", "role": "student" } },
///   "assignments": { "mentor-1": ["ana"] }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticAuthorizer {
    #[serde(default)]
    tokens: HashMap<String, Caller>,
    #[serde(default)]
    assignments: HashMap<String, Vec<String>>,
}

impl StaticAuthorizer {
    /// Empty authorizer; every token is rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token.
    pub fn with_token(mut self, token: impl Into<String>, caller: Caller) -> Self {
        self.tokens.insert(token.into(), caller);
        self
    }

    /// Assign a student to a mentor.
    pub fn assign(mut self, mentor_uid: impl Into<String>, student: impl Into<String>) -> Self {
        self.assignments.entry(mentor_uid.into()).or_default().push(student.into());
        self
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn resolve(&self, token: &str) -> Result<Caller> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| GoalError::Unauthenticated("unknown or missing token".to_string()))
    }

    async fn is_assigned(&self, mentor_uid: &str, owner: &OwnerId) -> Result<bool> {
        Ok(self
            .assignments
            .get(mentor_uid)
            .is_some_and(|students| students.iter().any(|s| s == owner.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOAL_ROLES: &[Role] = &[Role::Student, Role::Mentor];

    fn authorizer() -> StaticAuthorizer {
        StaticAuthorizer::new()
            .with_token("t-ana", Caller::new("ana", Role::Student))
            .with_token("t-mentor", Caller::new("mentor-1", Role::Mentor))
            .with_token("t-boss", Caller::new("boss", Role::Manager))
            .assign("mentor-1", "ana")
    }

    async fn check(token: &str, owner: &str, allowed: &[Role]) -> Result<()> {
        let auth = authorizer();
        let caller = auth.resolve(token).await?;
        require_role(&auth, &caller, &OwnerId::new(owner), allowed).await
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthenticated() {
        assert!(matches!(check("nope", "ana", GOAL_ROLES).await, Err(GoalError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn test_student_acts_on_self_only() {
        assert!(check("t-ana", "ana", GOAL_ROLES).await.is_ok());
        assert!(matches!(check("t-ana", "bruno", GOAL_ROLES).await, Err(GoalError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_mentor_acts_on_assigned_students() {
        assert!(check("t-mentor", "ana", GOAL_ROLES).await.is_ok());
        assert!(matches!(check("t-mentor", "bruno", GOAL_ROLES).await, Err(GoalError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_role_must_be_allowed() {
        assert!(matches!(check("t-boss", "ana", GOAL_ROLES).await, Err(GoalError::PermissionDenied(_))));
        assert!(check("t-boss", "anyone", &[Role::Student, Role::Mentor, Role::Manager]).await.is_ok());
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(
            &path,
            r#"{"tokens":{"t-ana":{"uid":"ana","role":"student"}},"assignments":{"mentor-1":["ana"]}}"#,
        )
        .unwrap();

        let auth = StaticAuthorizer::load(&path).unwrap();
        let caller = futures::executor::block_on(auth.resolve("t-ana")).unwrap();
        assert_eq!(caller, Caller::new("ana", Role::Student));
        assert!(futures::executor::block_on(auth.is_assigned("mentor-1", &OwnerId::new("ana"))).unwrap());

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(StaticAuthorizer::load(&path).unwrap_err().kind(), std::io::ErrorKind::InvalidData);
    }
}
