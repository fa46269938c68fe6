//! Day-by-day burndown reconstruction.
//!
//! Read-only: the series is rebuilt from current issue state every time, so
//! two calls with no issue changes in between give the same result.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::Serialize;

use crate::database::entities::{issues, sprints};

/// Span used when a sprint has no end date, or starts and ends on one day.
const DEFAULT_SPAN_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedIssue {
    pub id: i32,
    pub code: String,
    pub title: String,
    pub story_points: i64,
    pub status: String,
    pub resolved_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurndownDay {
    pub date: NaiveDate,
    pub remaining: i64,
    pub is_weekend: bool,
    pub completed_today: i64,
    pub completed_issues: Vec<CompletedIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurndownReport {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: Vec<BurndownDay>,
    pub total_story_points: i64,
    pub completed_story_points: i64,
    pub completed_issues: Vec<CompletedIssue>,
    pub total_issues: usize,
    pub completed_issues_count: usize,
    pub sprint_status: String,
}

fn completion_date(issue: &issues::Model) -> NaiveDate {
    issue.resolved_at.unwrap_or(issue.updated_at).date_naive()
}

fn completed_issue(issue: &issues::Model) -> CompletedIssue {
    CompletedIssue {
        id: issue.id,
        code: issue.code.clone(),
        title: issue.title.clone(),
        story_points: issue.points(),
        status: issue.status().to_string(),
        resolved_at: issue.resolved_at,
        updated_at: issue.updated_at,
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Calendar range covered by the chart.
pub fn burndown_range(sprint: &sprints::Model, now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
    let start = sprint.started_at.unwrap_or(now).date_naive();
    let mut end = match sprint.finished_at {
        Some(finished) => finished.date_naive(),
        None => now.date_naive() + Duration::days(DEFAULT_SPAN_DAYS),
    };
    if end == start {
        end = end + Duration::days(DEFAULT_SPAN_DAYS);
    }
    (start, end)
}

pub fn build_burndown(
    sprint: &sprints::Model,
    issues: &[issues::Model],
    now: DateTime<Utc>,
) -> BurndownReport {
    let (start_date, end_date) = burndown_range(sprint, now);

    let total_story_points: i64 = issues.iter().map(issues::Model::points).sum();
    let completed: Vec<&issues::Model> = issues
        .iter()
        .filter(|issue| issue.status().is_completed())
        .collect();

    let mut days = Vec::new();
    let mut day = start_date;
    while day <= end_date {
        let completed_points: i64 = completed
            .iter()
            .filter(|issue| completion_date(issue) <= day)
            .map(|issue| issue.points())
            .sum();
        let completed_today: Vec<CompletedIssue> = completed
            .iter()
            .filter(|issue| completion_date(issue) == day)
            .map(|issue| completed_issue(issue))
            .collect();

        days.push(BurndownDay {
            date: day,
            remaining: (total_story_points - completed_points).max(0),
            is_weekend: is_weekend(day),
            completed_today: completed_today.iter().map(|i| i.story_points).sum(),
            completed_issues: completed_today,
        });
        day = day + Duration::days(1);
    }

    BurndownReport {
        name: sprint.name.clone(),
        start_date,
        end_date,
        days,
        total_story_points,
        completed_story_points: completed.iter().map(|issue| issue.points()).sum(),
        completed_issues: completed.iter().map(|issue| completed_issue(issue)).collect(),
        total_issues: issues.len(),
        completed_issues_count: completed.len(),
        sprint_status: sprint.state().label().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sprint(started: Option<DateTime<Utc>>, finished: Option<DateTime<Utc>>) -> sprints::Model {
        let created = Utc.with_ymd_and_hms(2026, 2, 27, 8, 0, 0).unwrap();
        sprints::Model {
            id: 1,
            project_id: 1,
            name: "Sprint 1".into(),
            goal: String::new(),
            is_started: started.is_some(),
            is_finished: false,
            started_at: started,
            finished_at: finished,
            created_at: created,
            updated_at: created,
        }
    }

    fn issue(id: i32, points: i32, status: &str, resolved: Option<DateTime<Utc>>) -> issues::Model {
        let created = Utc.with_ymd_and_hms(2026, 2, 27, 8, 0, 0).unwrap();
        issues::Model {
            id,
            project_id: 1,
            code: format!("ABC-{}", id),
            title: format!("Issue {}", id),
            description: String::new(),
            status: status.into(),
            issue_type: "task".into(),
            priority: "medium".into(),
            story_points: Some(points),
            acceptance_criteria: None,
            created_by: "alice".into(),
            assigned_to: None,
            in_backlog: false,
            in_sprint: true,
            product_backlog_id: None,
            sprint_id: Some(1),
            sprint_backlog_id: Some(1),
            epic_id: None,
            deleted_at: None,
            version: 1,
            created_at: created,
            updated_at: resolved.unwrap_or(created),
            resolved_at: resolved,
        }
    }

    #[test]
    fn remaining_points_drop_on_completion_day() {
        // Monday 2 March to Friday 6 March
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 6, 17, 0, 0).unwrap();
        let issues = vec![
            issue(1, 3, "done", Some(Utc.with_ymd_and_hms(2026, 3, 3, 15, 0, 0).unwrap())),
            issue(2, 5, "closed", Some(Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap())),
            issue(3, 2, "in-progress", None),
        ];

        let report = build_burndown(&sprint(Some(start), Some(end)), &issues, end);

        assert_eq!(report.days.len(), 5);
        let remaining: Vec<i64> = report.days.iter().map(|d| d.remaining).collect();
        assert_eq!(remaining, vec![10, 7, 7, 2, 2]);
        assert_eq!(report.days[1].completed_today, 3);
        assert_eq!(report.days[1].completed_issues[0].code, "ABC-1");
        assert_eq!(report.total_story_points, 10);
        assert_eq!(report.completed_story_points, 8);
        assert_eq!(report.completed_issues_count, 2);
        assert_eq!(report.sprint_status, "active");
    }

    #[test]
    fn flags_weekends() {
        let start = Utc.with_ymd_and_hms(2026, 3, 6, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap();
        let report = build_burndown(&sprint(Some(start), Some(end)), &[], end);
        let weekends: Vec<bool> = report.days.iter().map(|d| d.is_weekend).collect();
        assert_eq!(weekends, vec![false, true, true, false]);
    }

    #[test]
    fn missing_end_spans_a_week_from_now() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let (start, end) = burndown_range(&sprint(None, None), now);
        assert_eq!(start, now.date_naive());
        assert_eq!(end, now.date_naive() + Duration::days(7));
    }

    #[test]
    fn same_day_range_is_extended() {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let (start, end) = burndown_range(&sprint(Some(at), Some(at)), at);
        assert_eq!((end - start).num_days(), 7);
    }

    #[test]
    fn rebuilding_is_deterministic() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 13, 9, 0, 0).unwrap();
        let issues = vec![issue(1, 5, "done", Some(start + Duration::days(2)))];
        let s = sprint(Some(start), Some(end));
        assert_eq!(build_burndown(&s, &issues, end), build_burndown(&s, &issues, end));
    }
}
