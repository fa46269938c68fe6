//! Enumerations stored as text columns.
//!
//! The database keeps plain strings (see the migrations); these types are the
//! parsed form used everywhere above the entity layer.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IssueStatus {
    ToDo,
    InProgress,
    Review,
    #[serde(alias = "resolved")]
    #[strum(to_string = "done", serialize = "resolved")]
    Done,
    Closed,
}

impl IssueStatus {
    /// Statuses carried into the successor sprint when a sprint completes.
    pub const CARRY_OVER: [IssueStatus; 3] =
        [IssueStatus::ToDo, IssueStatus::InProgress, IssueStatus::Review];

    pub fn is_completed(&self) -> bool {
        matches!(self, IssueStatus::Done | IssueStatus::Closed)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueType {
    Bug,
    Feature,
    Task,
    Refactor,
    UserStory,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IssuePriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Where an issue currently lives. Exactly one of these holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IssueLocation {
    Unassigned,
    #[serde(rename_all = "camelCase")]
    ProductBacklog { backlog_id: i32 },
    #[serde(rename_all = "camelCase")]
    Sprint {
        sprint_id: i32,
        sprint_backlog_id: i32,
    },
}

/// Soft-delete state. Deleted issues keep their code reserved but never show
/// up in backlog or sprint listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum IssueLifecycle {
    Active,
    Deleted {
        at: chrono::DateTime<chrono::Utc>,
    },
}

/// Derived sprint lifecycle. "Finished but not started" has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SprintState {
    NotStarted,
    Started,
    Finished,
}

impl SprintState {
    /// Label used by project sprint listings.
    pub fn label(&self) -> &'static str {
        match self {
            SprintState::NotStarted => "inactive",
            SprintState::Started => "active",
            SprintState::Finished => "completed",
        }
    }
}

/// Metric types produced by the engine itself. Manually recorded metrics may
/// use any other name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MetricType {
    Velocity,
    CompletionRate,
    Burndown,
    Duration,
    Start,
    TimeToResolution,
}
