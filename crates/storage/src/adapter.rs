//! Conversion of raw activity documents into typed records.
//!
//! Activity documents were written by several generations of the platform,
//! so dates show up as `YYYY-MM-DD` strings, RFC 3339 timestamps, epoch
//! milliseconds, or `{seconds, nanoseconds}` objects, and numeric fields may
//! be missing or stored as strings. All of that is resolved here, once.

use chrono::{DateTime, TimeZone, Utc};
use goaltrack_core::{
    ActivityKind, ActivityRecord, Calendar, ContentCompletion, MockExam, StudySession,
    SubjectScore, Time,
};
use serde_json::Value;

/// Convert a raw document of the given kind, or `None` when it carries no
/// readable date.
pub fn record_from_value(kind: ActivityKind, raw: &Value, calendar: &Calendar) -> Option<ActivityRecord> {
    match kind {
        ActivityKind::Study => study_from_value(raw, calendar).map(ActivityRecord::Study),
        ActivityKind::MockExam => mock_exam_from_value(raw, calendar).map(ActivityRecord::MockExam),
        ActivityKind::Content => content_from_value(raw, calendar).map(ActivityRecord::Content),
    }
}

fn study_from_value(raw: &Value, calendar: &Calendar) -> Option<StudySession> {
    let date = first_date(raw, &["date", "createdAt"], calendar)?;
    Some(StudySession {
        date,
        subject: text(raw.get("subject")).unwrap_or_default(),
        minutes_spent: number(raw.get("minutesSpent")),
        questions_attempted: number(raw.get("questionsAttempted")),
        questions_correct: number(raw.get("questionsCorrect")),
    })
}

fn mock_exam_from_value(raw: &Value, calendar: &Calendar) -> Option<MockExam> {
    let date = first_date(raw, &["date", "createdAt"], calendar)?;
    let subject_breakdown = raw
        .get("subjectBreakdown")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(SubjectScore {
                        subject: text(item.get("subject"))?,
                        correct: number(item.get("correct")),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(MockExam {
        date,
        subject_breakdown,
        total_correct: number(raw.get("totalCorrect")),
    })
}

fn content_from_value(raw: &Value, calendar: &Calendar) -> Option<ContentCompletion> {
    let completed_at = first_date(raw, &["completedAt", "updatedAt"], calendar)?;
    Some(ContentCompletion {
        completed_at,
        category_tag: text(raw.get("categoryTag")).filter(|t| !t.is_empty()),
        is_completed: raw.get("isCompleted").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn first_date(raw: &Value, fields: &[&str], calendar: &Calendar) -> Option<Time> {
    fields.iter().find_map(|field| raw.get(*field).and_then(|v| parse_date(v, calendar)))
}

/// Read a date in any of the shapes activity documents use.
pub fn parse_date(value: &Value, calendar: &Calendar) -> Option<Time> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| calendar.parse_local_date(s).ok()),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::Object(map) => {
            let seconds = map.get("seconds").or_else(|| map.get("_seconds"))?.as_i64()?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, u32::try_from(nanos).ok()?).single()
        }
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_date_shapes() {
        let cal = Calendar::default();
        let noon = cal.parse_local_date("2026-01-05").unwrap();

        assert_eq!(parse_date(&json!("2026-01-05"), &cal), Some(noon));
        assert_eq!(parse_date(&json!("2026-01-05T15:00:00Z"), &cal), Some(noon));
        assert_eq!(parse_date(&json!(noon.timestamp_millis()), &cal), Some(noon));
        assert_eq!(parse_date(&json!({"seconds": noon.timestamp(), "nanoseconds": 0}), &cal), Some(noon));
        assert_eq!(parse_date(&json!({"_seconds": noon.timestamp()}), &cal), Some(noon));
        assert_eq!(parse_date(&json!("yesterday"), &cal), None);
        assert_eq!(parse_date(&json!(null), &cal), None);
    }

    #[test]
    fn test_timestamp_keeps_its_instant() {
        let cal = Calendar::default();
        // 22:00 local on the 5th
        let late = parse_date(&json!("2026-01-06T01:00:00Z"), &cal).unwrap();
        assert_eq!(cal.render_local_date(late), "2026-01-05");
    }

    #[test]
    fn test_study_defaults_missing_numbers() {
        let cal = Calendar::default();
        let raw = json!({"date": "2026-01-05", "subject": "math", "minutesSpent": "45"});
        let Some(ActivityRecord::Study(study)) = record_from_value(ActivityKind::Study, &raw, &cal) else {
            panic!("expected a study record");
        };
        assert_eq!(study.minutes_spent, 45.0);
        assert_eq!(study.questions_attempted, 0.0);
        assert_eq!(study.subject, "math");
    }

    #[test]
    fn test_falls_back_to_created_at() {
        let cal = Calendar::default();
        let raw = json!({"createdAt": "2026-01-05", "totalCorrect": 30});
        let record = record_from_value(ActivityKind::MockExam, &raw, &cal).unwrap();
        assert_eq!(cal.render_local_date(record.date()), "2026-01-05");
    }

    #[test]
    fn test_record_without_date_is_skipped() {
        let cal = Calendar::default();
        let raw = json!({"subject": "math", "minutesSpent": 30});
        assert!(record_from_value(ActivityKind::Study, &raw, &cal).is_none());
    }

    #[test]
    fn test_content_tag_and_breakdown() {
        let cal = Calendar::default();
        let raw = json!({"completedAt": "2026-01-05", "categoryTag": "", "isCompleted": true});
        let Some(ActivityRecord::Content(content)) = record_from_value(ActivityKind::Content, &raw, &cal) else {
            panic!("expected a content record");
        };
        assert!(content.category_tag.is_none());
        assert!(content.is_completed);

        let raw = json!({
            "date": "2026-01-05",
            "subjectBreakdown": [{"subject": "math", "correct": 12}, {"correct": 3}],
        });
        let Some(ActivityRecord::MockExam(exam)) = record_from_value(ActivityKind::MockExam, &raw, &cal) else {
            panic!("expected a mock exam record");
        };
        assert_eq!(exam.subject_breakdown.len(), 1);
        assert_eq!(exam.total_correct, 0.0);
    }
}
