//! Create and update requests, and their validation.
//!
//! Requests arrive loosely typed (strings for enums and dates) and are
//! turned into typed drafts before anything is written.

use goaltrack_core::{Calendar, GoalStatus, GoalType, GoalUnit, Time};
use serde::{Deserialize, Serialize};

use crate::error::{GoalError, Result};

/// Fields for creating a goal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalRequest {
    #[serde(rename = "type")]
    pub goal_type: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub window_start: Option<String>,
    pub window_end: Option<String>,
    pub subject_filter: Option<String>,
    pub category_filter: Option<String>,
    pub is_recurring: Option<bool>,
}

/// A validated create request.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalDraft {
    pub goal_type: GoalType,
    pub name: String,
    pub description: String,
    pub target_value: f64,
    pub unit: GoalUnit,
    pub window_start: Time,
    pub window_end: Time,
    pub subject_filter: Option<String>,
    pub category_filter: Option<String>,
    pub is_recurring: bool,
}

impl CreateGoalRequest {
    /// Check required fields and parse enums and dates.
    pub fn validate(&self, calendar: &Calendar) -> Result<GoalDraft> {
        let goal_type = parse_goal_type(required(self.goal_type.as_deref(), "type")?)?;
        let name = required(self.name.as_deref(), "name")?.to_string();
        let target_value = check_target(self.target_value.ok_or_else(|| GoalError::missing("targetValue"))?)?;
        let unit = match non_blank(self.unit.as_deref()) {
            Some(unit) => parse_unit(unit)?,
            None => goal_type.default_unit(),
        };
        let window_start = calendar.parse_local_date(required(self.window_start.as_deref(), "windowStart")?)?;
        let window_end = calendar.parse_local_date(required(self.window_end.as_deref(), "windowEnd")?)?;
        check_window(calendar, window_start, window_end)?;

        Ok(GoalDraft {
            goal_type,
            name,
            description: self.description.clone().unwrap_or_default(),
            target_value,
            unit,
            window_start,
            window_end,
            subject_filter: non_blank(self.subject_filter.as_deref()).map(str::to_string),
            category_filter: non_blank(self.category_filter.as_deref()).map(str::to_string),
            is_recurring: self.is_recurring.unwrap_or(false),
        })
    }
}

/// Fields for updating a goal. Absent fields are left untouched; an empty
/// string clears a filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub window_start: Option<String>,
    pub window_end: Option<String>,
    pub subject_filter: Option<String>,
    pub category_filter: Option<String>,
    pub status: Option<String>,
    pub is_recurring: Option<bool>,
}

/// A validated update request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<GoalUnit>,
    pub window_start: Option<Time>,
    pub window_end: Option<Time>,
    pub subject_filter: Option<Option<String>>,
    pub category_filter: Option<Option<String>>,
    pub status: Option<GoalStatus>,
    pub is_recurring: Option<bool>,
}

impl UpdateGoalRequest {
    /// Parse enums and dates of the fields that are present.
    pub fn validate(&self, calendar: &Calendar) -> Result<GoalPatch> {
        let name = match self.name.as_deref() {
            Some(name) if name.trim().is_empty() => return Err(GoalError::missing("name")),
            Some(name) => Some(name.to_string()),
            None => None,
        };
        let status = match self.status.as_deref() {
            Some(s) => Some(parse_status(s)?),
            None => None,
        };
        if status == Some(GoalStatus::Expired) {
            return Err(GoalError::InvalidArgument(
                "status 'expired' is only set by the expiration sweep".to_string(),
            ));
        }

        Ok(GoalPatch {
            name,
            description: self.description.clone(),
            target_value: self.target_value.map(check_target).transpose()?,
            unit: self.unit.as_deref().map(parse_unit).transpose()?,
            window_start: self.window_start.as_deref().map(|s| calendar.parse_local_date(s)).transpose()?,
            window_end: self.window_end.as_deref().map(|s| calendar.parse_local_date(s)).transpose()?,
            subject_filter: self.subject_filter.as_deref().map(|s| non_blank(Some(s)).map(str::to_string)),
            category_filter: self.category_filter.as_deref().map(|s| non_blank(Some(s)).map(str::to_string)),
            status,
            is_recurring: self.is_recurring,
        })
    }
}

impl GoalPatch {
    /// Whether the patch changes what progress is measured against.
    pub fn changes_measurement(&self) -> bool {
        self.window_start.is_some()
            || self.window_end.is_some()
            || self.target_value.is_some()
            || self.subject_filter.is_some()
            || self.category_filter.is_some()
    }
}

pub(crate) fn check_window(calendar: &Calendar, start: Time, end: Time) -> Result<()> {
    if calendar.is_before(end, start) {
        return Err(GoalError::InvalidArgument(format!(
            "windowEnd {} is before windowStart {}",
            calendar.render_local_date(end),
            calendar.render_local_date(start)
        )));
    }
    Ok(())
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    non_blank(value).ok_or_else(|| GoalError::missing(field))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn check_target(value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(GoalError::InvalidArgument(format!("targetValue must be positive, got {}", value)))
    }
}

fn parse_goal_type(s: &str) -> Result<GoalType> {
    s.parse().map_err(|e: goaltrack_core::ParseVariantError| GoalError::InvalidArgument(e.to_string()))
}

fn parse_status(s: &str) -> Result<GoalStatus> {
    s.parse().map_err(|e: goaltrack_core::ParseVariantError| GoalError::InvalidArgument(e.to_string()))
}

fn parse_unit(s: &str) -> Result<GoalUnit> {
    s.parse().map_err(|e: goaltrack_core::ParseVariantError| GoalError::InvalidArgument(e.to_string()))
}
