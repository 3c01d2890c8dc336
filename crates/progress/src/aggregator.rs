//! Progress computation over activity records.
//!
//! Pure functions of the records, the goal window and filters, and "today"
//! (for streaks). Negative or non-finite numbers in records count as zero.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use goaltrack_core::{
    ActivityKind, ActivityRecord, Calendar, ContentCompletion, Goal, GoalType, MockExam,
    StudySession, Time,
};

/// What to measure and over which window.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressQuery {
    /// Formula to apply
    pub goal_type: GoalType,
    /// First day counted (inclusive)
    pub window_start: Time,
    /// Last day counted (inclusive)
    pub window_end: Time,
    /// Only this subject
    pub subject_filter: Option<String>,
    /// Only this content category
    pub category_filter: Option<String>,
}

impl ProgressQuery {
    /// The query a goal's current value is computed with.
    pub fn for_goal(goal: &Goal) -> Self {
        Self {
            goal_type: goal.goal_type,
            window_start: goal.window_start,
            window_end: goal.window_end,
            subject_filter: goal.subject_filter.clone(),
            category_filter: goal.category_filter.clone(),
        }
    }

    /// The only kind of record the formula reads.
    pub fn source_kind(&self) -> ActivityKind {
        match self.goal_type {
            GoalType::Hours | GoalType::Questions | GoalType::Streak => ActivityKind::Study,
            GoalType::MockExams | GoalType::ScoreRate => ActivityKind::MockExam,
            GoalType::Topics => ActivityKind::Content,
        }
    }
}

/// Computes a goal's progress value from activity records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityAggregator {
    calendar: Calendar,
}

impl ActivityAggregator {
    /// Create an aggregator comparing days in `calendar`.
    pub fn new(calendar: Calendar) -> Self {
        Self { calendar }
    }

    /// Compute the progress value for `query`.
    pub fn compute(&self, query: &ProgressQuery, records: &[ActivityRecord], today: Time) -> f64 {
        match query.goal_type {
            GoalType::Hours => {
                let minutes: f64 = self
                    .studies(query, records)
                    .filter(|s| subject_matches(query, &s.subject))
                    .map(|s| amount(s.minutes_spent))
                    .sum();
                round_one_decimal(minutes / 60.0)
            }
            GoalType::Questions => self
                .studies(query, records)
                .filter(|s| subject_matches(query, &s.subject))
                .map(|s| amount(s.questions_attempted))
                .sum(),
            GoalType::MockExams => self.mock_exams(query, records).count() as f64,
            GoalType::ScoreRate => match &query.subject_filter {
                None => self.mock_exams(query, records).map(|m| amount(m.total_correct)).sum(),
                Some(subject) => self
                    .mock_exams(query, records)
                    .flat_map(|m| m.subject_breakdown.iter())
                    .filter(|score| &score.subject == subject)
                    .map(|score| amount(score.correct))
                    .sum(),
            },
            GoalType::Topics => self
                .contents(query, records)
                .filter(|c| c.is_completed)
                .filter(|c| match (&query.category_filter, &c.category_tag) {
                    (Some(wanted), Some(tag)) => wanted == tag,
                    _ => true,
                })
                .count() as f64,
            GoalType::Streak => f64::from(self.streak(records, today)),
        }
    }

    /// Consecutive study days ending today, or yesterday when today has no
    /// record yet.
    pub fn streak(&self, records: &[ActivityRecord], today: Time) -> u32 {
        let days: BTreeSet<NaiveDate> = records
            .iter()
            .filter_map(|r| match r {
                ActivityRecord::Study(s) => Some(self.calendar.local_day(s.date)),
                _ => None,
            })
            .collect();

        let today = self.calendar.local_day(today);
        let mut cursor = if days.contains(&today) {
            today
        } else {
            match today.pred_opt() {
                Some(yesterday) if days.contains(&yesterday) => yesterday,
                _ => return 0,
            }
        };

        let mut count = 0;
        while days.contains(&cursor) {
            count += 1;
            match cursor.pred_opt() {
                Some(previous) => cursor = previous,
                None => break,
            }
        }
        count
    }

    fn in_window(&self, query: &ProgressQuery, date: Time) -> bool {
        self.calendar.in_range(date, query.window_start, query.window_end)
    }

    fn studies<'a>(
        &'a self,
        query: &'a ProgressQuery,
        records: &'a [ActivityRecord],
    ) -> impl Iterator<Item = &'a StudySession> + 'a {
        records.iter().filter_map(move |r| match r {
            ActivityRecord::Study(s) if self.in_window(query, s.date) => Some(s),
            _ => None,
        })
    }

    fn mock_exams<'a>(
        &'a self,
        query: &'a ProgressQuery,
        records: &'a [ActivityRecord],
    ) -> impl Iterator<Item = &'a MockExam> + 'a {
        records.iter().filter_map(move |r| match r {
            ActivityRecord::MockExam(m) if self.in_window(query, m.date) => Some(m),
            _ => None,
        })
    }

    fn contents<'a>(
        &'a self,
        query: &'a ProgressQuery,
        records: &'a [ActivityRecord],
    ) -> impl Iterator<Item = &'a ContentCompletion> + 'a {
        records.iter().filter_map(move |r| match r {
            ActivityRecord::Content(c) if self.in_window(query, c.completed_at) => Some(c),
            _ => None,
        })
    }
}

fn subject_matches(query: &ProgressQuery, subject: &str) -> bool {
    query.subject_filter.as_deref().map_or(true, |wanted| wanted == subject)
}

fn amount(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use goaltrack_core::SubjectScore;

    fn cal() -> Calendar {
        Calendar::default()
    }

    fn day(s: &str) -> Time {
        cal().parse_local_date(s).unwrap()
    }

    fn query(goal_type: GoalType) -> ProgressQuery {
        ProgressQuery {
            goal_type,
            window_start: day("2026-01-01"),
            window_end: day("2026-01-07"),
            subject_filter: None,
            category_filter: None,
        }
    }

    fn study(date: &str, subject: &str, minutes: f64, questions: f64) -> ActivityRecord {
        ActivityRecord::Study(StudySession {
            date: day(date),
            subject: subject.to_string(),
            minutes_spent: minutes,
            questions_attempted: questions,
            questions_correct: 0.0,
        })
    }

    fn exam(date: &str, total: f64, breakdown: &[(&str, f64)]) -> ActivityRecord {
        ActivityRecord::MockExam(MockExam {
            date: day(date),
            subject_breakdown: breakdown
                .iter()
                .map(|(subject, correct)| SubjectScore { subject: subject.to_string(), correct: *correct })
                .collect(),
            total_correct: total,
        })
    }

    fn content(date: &str, tag: Option<&str>, done: bool) -> ActivityRecord {
        ActivityRecord::Content(ContentCompletion {
            completed_at: day(date),
            category_tag: tag.map(str::to_string),
            is_completed: done,
        })
    }

    #[test]
    fn test_empty_records_are_zero_for_every_type() {
        let agg = ActivityAggregator::new(cal());
        for goal_type in GoalType::ALL {
            assert_eq!(agg.compute(&query(goal_type), &[], day("2026-01-07")), 0.0, "{goal_type}");
        }
    }

    #[test]
    fn test_hours_rounds_to_one_decimal() {
        let agg = ActivityAggregator::new(cal());
        let records = vec![
            study("2026-01-01", "math", 50.0, 0.0),
            study("2026-01-07", "physics", 30.0, 0.0),
            study("2026-01-08", "math", 600.0, 0.0),
        ];
        // 80 minutes = 1.333h
        assert_eq!(agg.compute(&query(GoalType::Hours), &records, day("2026-01-07")), 1.3);

        let mut math = query(GoalType::Hours);
        math.subject_filter = Some("math".to_string());
        assert_eq!(agg.compute(&math, &records, day("2026-01-07")), 0.8);
    }

    #[test]
    fn test_questions_with_subject_filter() {
        let agg = ActivityAggregator::new(cal());
        let records = vec![
            study("2026-01-02", "math", 0.0, 12.0),
            study("2026-01-03", "biology", 0.0, 8.0),
            study("2025-12-31", "math", 0.0, 100.0),
        ];
        assert_eq!(agg.compute(&query(GoalType::Questions), &records, day("2026-01-07")), 20.0);

        let mut math = query(GoalType::Questions);
        math.subject_filter = Some("math".to_string());
        assert_eq!(agg.compute(&math, &records, day("2026-01-07")), 12.0);
    }

    #[test]
    fn test_negative_numbers_count_as_zero() {
        let agg = ActivityAggregator::new(cal());
        let records = vec![
            study("2026-01-02", "math", -120.0, -5.0),
            study("2026-01-03", "math", 60.0, f64::NAN),
            exam("2026-01-04", -10.0, &[]),
        ];
        assert_eq!(agg.compute(&query(GoalType::Hours), &records, day("2026-01-07")), 1.0);
        assert_eq!(agg.compute(&query(GoalType::Questions), &records, day("2026-01-07")), 0.0);
        assert_eq!(agg.compute(&query(GoalType::ScoreRate), &records, day("2026-01-07")), 0.0);
    }

    #[test]
    fn test_mock_exams_ignore_subject_filter() {
        let agg = ActivityAggregator::new(cal());
        let records = vec![
            exam("2026-01-01", 30.0, &[]),
            exam("2026-01-07", 40.0, &[]),
            exam("2026-01-09", 50.0, &[]),
        ];
        let mut q = query(GoalType::MockExams);
        q.subject_filter = Some("math".to_string());
        assert_eq!(agg.compute(&q, &records, day("2026-01-07")), 2.0);
    }

    #[test]
    fn test_score_rate_total_and_by_subject() {
        let agg = ActivityAggregator::new(cal());
        let records = vec![
            exam("2026-01-02", 60.0, &[("math", 20.0), ("biology", 15.0)]),
            exam("2026-01-05", 70.0, &[("math", 25.0)]),
            exam("2026-01-20", 90.0, &[("math", 40.0)]),
        ];
        assert_eq!(agg.compute(&query(GoalType::ScoreRate), &records, day("2026-01-07")), 130.0);

        let mut math = query(GoalType::ScoreRate);
        math.subject_filter = Some("math".to_string());
        assert_eq!(agg.compute(&math, &records, day("2026-01-07")), 45.0);
    }

    #[test]
    fn test_topics_category_filter_passes_untagged() {
        let agg = ActivityAggregator::new(cal());
        let records = vec![
            content("2026-01-02", Some("chemistry"), true),
            content("2026-01-03", Some("physics"), true),
            content("2026-01-04", None, true),
            content("2026-01-05", Some("chemistry"), false),
            content("2026-02-01", Some("chemistry"), true),
        ];
        assert_eq!(agg.compute(&query(GoalType::Topics), &records, day("2026-01-07")), 3.0);

        let mut chemistry = query(GoalType::Topics);
        chemistry.category_filter = Some("chemistry".to_string());
        assert_eq!(agg.compute(&chemistry, &records, day("2026-01-07")), 2.0);
    }

    #[test]
    fn test_streak_counts_consecutive_days() {
        let agg = ActivityAggregator::new(cal());
        let records = vec![
            study("2026-01-05", "math", 30.0, 0.0),
            study("2026-01-06", "math", 30.0, 0.0),
            study("2026-01-07", "math", 30.0, 0.0),
        ];
        assert_eq!(agg.compute(&query(GoalType::Streak), &records, day("2026-01-07")), 3.0);
    }

    #[test]
    fn test_streak_starts_yesterday_when_today_missing() {
        let agg = ActivityAggregator::new(cal());
        let records = vec![
            study("2026-01-05", "math", 30.0, 0.0),
            study("2026-01-06", "math", 30.0, 0.0),
        ];
        assert_eq!(agg.streak(&records, day("2026-01-07")), 2);
        assert_eq!(agg.streak(&records, day("2026-01-08")), 0);
    }

    #[test]
    fn test_streak_stops_at_gap_and_ignores_window() {
        let agg = ActivityAggregator::new(cal());
        let records = vec![
            study("2025-12-30", "math", 30.0, 0.0),
            study("2025-12-31", "math", 30.0, 0.0),
            study("2026-01-02", "math", 30.0, 0.0),
            study("2026-01-03", "math", 30.0, 0.0),
            study("2026-01-03", "physics", 30.0, 0.0),
            exam("2026-01-01", 10.0, &[]),
        ];
        assert_eq!(agg.streak(&records, day("2026-01-03")), 2);
        // Window is January, streak still reaches back into December
        assert_eq!(agg.compute(&query(GoalType::Streak), &records, day("2025-12-31")), 2.0);
    }

    #[test]
    fn test_streak_uses_calendar_days() {
        let agg = ActivityAggregator::new(cal());
        // 23:30 local on the 6th and 00:10 local on the 7th
        let late: Time = chrono::DateTime::parse_from_rfc3339("2026-01-07T02:30:00Z").unwrap().into();
        let early: Time = chrono::DateTime::parse_from_rfc3339("2026-01-07T03:10:00Z").unwrap().into();
        let records: Vec<ActivityRecord> = [late, early]
            .into_iter()
            .map(|date| {
                ActivityRecord::Study(StudySession {
                    date,
                    subject: String::new(),
                    minutes_spent: 10.0,
                    questions_attempted: 0.0,
                    questions_correct: 0.0,
                })
            })
            .collect();
        assert_eq!(agg.streak(&records, day("2026-01-07")), 2);
    }

    #[test]
    fn test_source_kind() {
        assert_eq!(query(GoalType::Streak).source_kind(), ActivityKind::Study);
        assert_eq!(query(GoalType::ScoreRate).source_kind(), ActivityKind::MockExam);
        assert_eq!(query(GoalType::Topics).source_kind(), ActivityKind::Content);
    }
}
