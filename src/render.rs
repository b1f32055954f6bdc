// Display rows derived from a filtered view

use chrono::NaiveDate;

use crate::filter::Counts;
use crate::task::{Task, TaskId, TaskStatus};

/// Shown in place of rows when a view is empty
pub const EMPTY_MESSAGE: &str = "No tasks to show.";

/// One rendered line of the task table
///
/// `id` is the correlation token a host passes back into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: TaskId,
    pub checked: bool,
    pub description: String,
    pub due: String,
    pub overdue: bool,
    pub status: TaskStatus,
}

impl Row {
    pub fn badge(&self) -> &'static str {
        self.status.label()
    }
}

/// Short display form, e.g. `Jan 10, 2024`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Build rows for `view`; open tasks due before `today` are flagged overdue
pub fn rows<'a>(view: impl IntoIterator<Item = &'a Task>, today: NaiveDate) -> Vec<Row> {
    view.into_iter()
        .map(|task| Row {
            id: task.id,
            checked: task.is_completed(),
            description: task.description.clone(),
            due: format_date(task.due_date),
            overdue: task.due_date < today && !task.is_completed(),
            status: task.status,
        })
        .collect()
}

/// Summary line for the filter bar
pub fn counts_line(counts: &Counts) -> String {
    format!(
        "All ({})  In Progress ({})  Completed ({})",
        counts.total, counts.in_progress, counts.completed
    )
}
