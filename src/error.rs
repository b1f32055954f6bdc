// Error taxonomy for store operations

use thiserror::Error;

/// User input rejected by `TaskStore::add`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a task description.")]
    EmptyDescription,

    #[error("Please enter a valid due date.")]
    InvalidDate(String),
}

/// Errors returned by mutating store operations
///
/// Stale ids and out-of-range indices are not errors: those calls are
/// no-ops that report `false`. Corrupt slot contents are recovered on load
/// and never surface here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to persist task list: {0:#}")]
    Persistence(eyre::Report),

    #[error("No task ids left to allocate")]
    IdsExhausted,
}

impl StoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}
