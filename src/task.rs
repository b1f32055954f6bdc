// Task data model

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Stable identifier for a task, assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn from_completed(completed: bool) -> Self {
        if completed {
            TaskStatus::Completed
        } else {
            TaskStatus::InProgress
        }
    }

    pub fn is_completed(self) -> bool {
        self == TaskStatus::Completed
    }

    /// Human-readable badge text
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    #[serde(with = "due_date_format")]
    pub due_date: NaiveDate,
    pub status: TaskStatus,
}

impl Task {
    pub fn new(id: TaskId, description: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            id,
            description: description.into(),
            due_date,
            status: TaskStatus::InProgress,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

/// Trim a raw description, rejecting empty or whitespace-only input
pub fn normalize_description(raw: &str) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    Ok(trimmed)
}

/// Parse due-date text into a calendar date
///
/// Accepts `YYYY-MM-DD` as well as full RFC 3339 timestamps, in which case
/// only the date part is kept.
pub fn parse_due_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::InvalidDate(raw.to_string()));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

pub(crate) mod due_date_format {
    // Lenient (de)serialization for the `dueDate` field

    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format("%Y-%m-%d"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_due_date(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_task_is_in_progress() {
        let task = Task::new(TaskId(1), "Buy milk", date(2024, 1, 10));
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(!task.is_completed());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"inprogress\"");

        let json = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }

    #[test]
    fn test_status_from_completed() {
        assert_eq!(TaskStatus::from_completed(true), TaskStatus::Completed);
        assert_eq!(TaskStatus::from_completed(false), TaskStatus::InProgress);
    }

    #[test]
    fn test_status_label() {
        assert_eq!(TaskStatus::InProgress.label(), "In Progress");
        assert_eq!(TaskStatus::Completed.to_string(), "Completed");
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description("  Pay rent \n").unwrap(), "Pay rent");
        assert_eq!(normalize_description(""), Err(ValidationError::EmptyDescription));
        assert_eq!(normalize_description(" \t "), Err(ValidationError::EmptyDescription));
    }

    #[test]
    fn test_parse_due_date_iso() {
        assert_eq!(parse_due_date("2024-01-10").unwrap(), date(2024, 1, 10));
        assert_eq!(parse_due_date(" 2024-02-29 ").unwrap(), date(2024, 2, 29));
    }

    #[test]
    fn test_parse_due_date_rfc3339() {
        assert_eq!(parse_due_date("2024-01-10T00:00:00.000Z").unwrap(), date(2024, 1, 10));
        assert_eq!(parse_due_date("2024-01-10T23:30:00+02:00").unwrap(), date(2024, 1, 10));
    }

    #[test]
    fn test_parse_due_date_invalid() {
        assert!(parse_due_date("").is_err());
        assert!(parse_due_date("tomorrow").is_err());
        assert!(parse_due_date("2023-02-29").is_err());
        assert!(parse_due_date("2024-13-01").is_err());
    }
}
