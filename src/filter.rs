// Filtered views over a task list

use chrono::{Local, NaiveDate};
use std::fmt;
use std::str::FromStr;

use crate::task::{Task, TaskStatus};

/// Where a due date falls relative to the current calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCategory {
    Overdue,
    Today,
    Future,
}

/// The local calendar day
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Bucket `date` against `today` by calendar day
pub fn date_category(date: NaiveDate, today: NaiveDate) -> DateCategory {
    match date.cmp(&today) {
        std::cmp::Ordering::Less => DateCategory::Overdue,
        std::cmp::Ordering::Equal => DateCategory::Today,
        std::cmp::Ordering::Greater => DateCategory::Future,
    }
}

/// Status half of a view filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    InProgress,
    Completed,
}

impl StatusFilter {
    pub fn matches(self, status: TaskStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::InProgress => status == TaskStatus::InProgress,
            StatusFilter::Completed => status == TaskStatus::Completed,
        }
    }
}

/// Due-date half of a view filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    Overdue,
    Today,
    Future,
}

impl DateFilter {
    pub fn matches(self, category: DateCategory) -> bool {
        match self {
            DateFilter::All => true,
            DateFilter::Overdue => category == DateCategory::Overdue,
            DateFilter::Today => category == DateCategory::Today,
            DateFilter::Future => category == DateCategory::Future,
        }
    }
}

/// Combined filter; both halves must match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskFilter {
    pub status: StatusFilter,
    pub date: DateFilter,
}

impl TaskFilter {
    pub fn new(status: StatusFilter, date: DateFilter) -> Self {
        Self { status, date }
    }

    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        self.status.matches(task.status) && self.date.matches(date_category(task.due_date, today))
    }
}

/// Tasks passing `filter`, in their original order
pub fn filtered_tasks<'a>(tasks: &'a [Task], filter: TaskFilter, today: NaiveDate) -> Vec<&'a Task> {
    tasks.iter().filter(|task| filter.matches(task, today)).collect()
}

/// Per-status totals for a task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub total: usize,
    pub in_progress: usize,
    pub completed: usize,
}

pub fn counts<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Counts {
    tasks.into_iter().fold(Counts::default(), |mut acc, task| {
        acc.total += 1;
        match task.status {
            TaskStatus::InProgress => acc.in_progress += 1,
            TaskStatus::Completed => acc.completed += 1,
        }
        acc
    })
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => write!(f, "all"),
            StatusFilter::InProgress => write!(f, "in-progress"),
            StatusFilter::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "in-progress" | "inprogress" | "in_progress" => Ok(StatusFilter::InProgress),
            "completed" | "done" => Ok(StatusFilter::Completed),
            other => Err(format!("Unknown status filter: {}", other)),
        }
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateFilter::All => write!(f, "all"),
            DateFilter::Overdue => write!(f, "overdue"),
            DateFilter::Today => write!(f, "today"),
            DateFilter::Future => write!(f, "future"),
        }
    }
}

impl FromStr for DateFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(DateFilter::All),
            "overdue" => Ok(DateFilter::Overdue),
            "today" => Ok(DateFilter::Today),
            "future" => Ok(DateFilter::Future),
            other => Err(format!("Unknown date filter: {}", other)),
        }
    }
}
