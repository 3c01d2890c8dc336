//! Goal model - a target value to reach over a date window.

use serde::{Deserialize, Serialize};

use crate::id::{GoalId, OwnerId};
use crate::Time;

/// Error returned when a string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseVariantError {
    kind: &'static str,
    value: String,
}

/// What a goal measures, which decides how its progress is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    /// Hours studied
    Hours,
    /// Questions attempted
    Questions,
    /// Mock exams taken
    MockExams,
    /// Content items completed
    Topics,
    /// Consecutive study days
    Streak,
    /// Correct answers in mock exams
    ScoreRate,
}

impl GoalType {
    /// All goal types.
    pub const ALL: [GoalType; 6] = [
        GoalType::Hours,
        GoalType::Questions,
        GoalType::MockExams,
        GoalType::Topics,
        GoalType::Streak,
        GoalType::ScoreRate,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::Hours => "hours",
            GoalType::Questions => "questions",
            GoalType::MockExams => "mock_exams",
            GoalType::Topics => "topics",
            GoalType::Streak => "streak",
            GoalType::ScoreRate => "score_rate",
        }
    }

    /// Unit shown when the caller does not pick one.
    pub fn default_unit(&self) -> GoalUnit {
        match self {
            GoalType::Hours => GoalUnit::Hours,
            GoalType::Questions => GoalUnit::Questions,
            GoalType::MockExams => GoalUnit::Exams,
            GoalType::Topics => GoalUnit::Topics,
            GoalType::Streak => GoalUnit::Days,
            GoalType::ScoreRate => GoalUnit::Points,
        }
    }
}

impl std::fmt::Display for GoalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GoalType {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GoalType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseVariantError { kind: "goal type", value: s.to_string() })
    }
}

/// Goal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Goal is being tracked
    Active,
    /// Target reached
    Completed,
    /// Window closed before the target was reached
    Expired,
}

impl GoalStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(GoalStatus::Active),
            "completed" => Ok(GoalStatus::Completed),
            "expired" => Ok(GoalStatus::Expired),
            _ => Err(ParseVariantError { kind: "goal status", value: s.to_string() }),
        }
    }
}

/// Display unit. Has no effect on progress computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalUnit {
    Hours,
    Questions,
    Exams,
    Topics,
    Days,
    Points,
}

impl GoalUnit {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalUnit::Hours => "hours",
            GoalUnit::Questions => "questions",
            GoalUnit::Exams => "exams",
            GoalUnit::Topics => "topics",
            GoalUnit::Days => "days",
            GoalUnit::Points => "points",
        }
    }
}

impl std::str::FromStr for GoalUnit {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hours" => Ok(GoalUnit::Hours),
            "questions" => Ok(GoalUnit::Questions),
            "exams" => Ok(GoalUnit::Exams),
            "topics" => Ok(GoalUnit::Topics),
            "days" => Ok(GoalUnit::Days),
            "points" => Ok(GoalUnit::Points),
            _ => Err(ParseVariantError { kind: "goal unit", value: s.to_string() }),
        }
    }
}

/// Role a goal document plays in recurrence. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalKind {
    /// Plain goal tracked over its own window
    OneShot,
    /// Recurrence definition, hidden from the owner
    Template,
    /// One day spawned from a template
    Instance,
}

/// A goal owned by one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    /// Unique identifier
    pub id: GoalId,

    /// Student who owns the goal
    pub owner_id: OwnerId,

    /// What is measured
    #[serde(rename = "type")]
    pub goal_type: GoalType,

    /// Goal name
    pub name: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Value to reach
    pub target_value: f64,

    /// Last computed progress
    #[serde(default)]
    pub current_value: f64,

    /// Display unit
    pub unit: GoalUnit,

    /// First day of the window (inclusive)
    pub window_start: Time,

    /// Last day of the window (inclusive)
    pub window_end: Time,

    /// Restricts progress to one subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_filter: Option<String>,

    /// Restricts `topics` progress to one category tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_filter: Option<String>,

    /// Current status
    pub status: GoalStatus,

    /// When the goal was completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Time>,

    /// Template marker (when there is no parent)
    #[serde(default)]
    pub is_recurring: bool,

    /// Template this instance was spawned from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_goal_id: Option<GoalId>,

    /// Day an instance stands for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<Time>,

    /// Mentor who created the goal on the owner's behalf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    /// When created
    pub created_at: Time,

    /// Last updated
    pub updated_at: Time,
}

impl Goal {
    /// Create an active one-shot goal with no progress.
    pub fn new(
        owner_id: OwnerId,
        goal_type: GoalType,
        name: impl Into<String>,
        target_value: f64,
        window_start: Time,
        window_end: Time,
        now: Time,
    ) -> Self {
        Self {
            id: GoalId::new(),
            owner_id,
            goal_type,
            name: name.into(),
            description: String::new(),
            target_value,
            current_value: 0.0,
            unit: goal_type.default_unit(),
            window_start,
            window_end,
            subject_filter: None,
            category_filter: None,
            status: GoalStatus::Active,
            completed_at: None,
            is_recurring: false,
            parent_goal_id: None,
            reference_date: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Which recurrence role this document plays.
    pub fn kind(&self) -> GoalKind {
        match (self.parent_goal_id, self.is_recurring) {
            (Some(_), _) => GoalKind::Instance,
            (None, true) => GoalKind::Template,
            (None, false) => GoalKind::OneShot,
        }
    }

    /// Templates are never shown to the owner.
    pub fn is_visible(&self) -> bool {
        self.kind() != GoalKind::Template
    }

    /// Whether the current value reaches the target.
    pub fn meets_target(&self) -> bool {
        self.current_value >= self.target_value
    }

    /// Mark completed at `now`.
    pub fn complete(&mut self, now: Time) {
        self.status = GoalStatus::Completed;
        self.completed_at = Some(now);
    }

    /// Re-open as active.
    pub fn reopen(&mut self) {
        self.status = GoalStatus::Active;
        self.completed_at = None;
    }

    /// Store a freshly computed value and settle the active/completed state.
    ///
    /// Expired goals keep their status.
    pub fn apply_progress(&mut self, value: f64, now: Time) {
        self.current_value = value;
        match self.status {
            GoalStatus::Active if self.meets_target() => self.complete(now),
            GoalStatus::Completed if !self.meets_target() => self.reopen(),
            _ => {}
        }
    }

    /// Turn a one-shot goal into a template.
    pub fn make_template(&mut self) {
        self.is_recurring = true;
        self.current_value = 0.0;
        self.reopen();
    }

    /// Build the instance of this template for `reference_date`.
    ///
    /// `label` is the human-readable form of the day, appended to the name.
    pub fn spawn_instance(&self, reference_date: Time, label: &str, now: Time) -> Goal {
        Goal {
            id: GoalId::new(),
            owner_id: self.owner_id.clone(),
            goal_type: self.goal_type,
            name: format!("{} - {}", self.name, label),
            description: self.description.clone(),
            target_value: self.target_value,
            current_value: 0.0,
            unit: self.unit,
            window_start: reference_date,
            window_end: reference_date,
            subject_filter: self.subject_filter.clone(),
            category_filter: self.category_filter.clone(),
            status: GoalStatus::Active,
            completed_at: None,
            is_recurring: false,
            parent_goal_id: Some(self.id),
            reference_date: Some(reference_date),
            created_by: self.created_by.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filter for listing goals.
#[derive(Debug, Clone, Default)]
pub struct GoalFilter {
    /// Only goals in one of these statuses
    pub status: Option<Vec<GoalStatus>>,

    /// Only instances of this template
    pub parent_goal_id: Option<GoalId>,

    /// Drop templates
    pub visible_only: bool,
}

impl GoalFilter {
    /// Instances of one template.
    pub fn instances_of(parent: GoalId) -> Self {
        Self { parent_goal_id: Some(parent), ..Default::default() }
    }

    /// Goals in a single status.
    pub fn with_status(status: GoalStatus) -> Self {
        Self { status: Some(vec![status]), ..Default::default() }
    }

    /// Whether `goal` passes the filter.
    pub fn matches(&self, goal: &Goal) -> bool {
        if let Some(statuses) = &self.status {
            if !statuses.contains(&goal.status) {
                return false;
            }
        }
        if let Some(parent) = self.parent_goal_id {
            if goal.parent_goal_id != Some(parent) {
                return false;
            }
        }
        !self.visible_only || goal.is_visible()
    }
}
