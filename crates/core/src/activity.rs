//! Activity records the engine reads to compute progress.
//!
//! These are written by the rest of the platform; the goal engine only reads
//! them. Every variant carries a validated instant, so the aggregator never
//! has to guess where a record's date lives.

use serde::{Deserialize, Serialize};

use crate::Time;

/// A logged study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    /// Day studied
    pub date: Time,
    /// Subject studied
    #[serde(default)]
    pub subject: String,
    /// Minutes spent
    #[serde(default)]
    pub minutes_spent: f64,
    /// Questions attempted
    #[serde(default)]
    pub questions_attempted: f64,
    /// Questions answered correctly
    #[serde(default)]
    pub questions_correct: f64,
}

/// Correct answers for one subject of a mock exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectScore {
    /// Subject
    pub subject: String,
    /// Correct answers
    #[serde(default)]
    pub correct: f64,
}

/// A mock exam result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockExam {
    /// Day taken
    pub date: Time,
    /// Per-subject breakdown
    #[serde(default)]
    pub subject_breakdown: Vec<SubjectScore>,
    /// Total correct answers
    #[serde(default)]
    pub total_correct: f64,
}

/// Progress on one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCompletion {
    /// When the item was completed
    pub completed_at: Time,
    /// Category tag, absent on legacy items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_tag: Option<String>,
    /// Whether the item is done
    #[serde(default)]
    pub is_completed: bool,
}

/// Kinds of activity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Study,
    MockExam,
    Content,
}

impl ActivityKind {
    /// All kinds.
    pub const ALL: [ActivityKind; 3] = [ActivityKind::Study, ActivityKind::MockExam, ActivityKind::Content];
}

/// Any activity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityRecord {
    /// Study session
    Study(StudySession),
    /// Mock exam
    MockExam(MockExam),
    /// Content completion
    Content(ContentCompletion),
}

impl ActivityRecord {
    /// Which kind of record this is.
    pub fn kind(&self) -> ActivityKind {
        match self {
            ActivityRecord::Study(_) => ActivityKind::Study,
            ActivityRecord::MockExam(_) => ActivityKind::MockExam,
            ActivityRecord::Content(_) => ActivityKind::Content,
        }
    }

    /// The instant the record is filed under.
    pub fn date(&self) -> Time {
        match self {
            ActivityRecord::Study(s) => s.date,
            ActivityRecord::MockExam(m) => m.date,
            ActivityRecord::Content(c) => c.completed_at,
        }
    }
}
