// TodoStore - to-do list with filtered views and local slot persistence

pub mod config;
pub mod confirm;
pub mod error;
pub mod filter;
pub mod render;
pub mod slot;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use config::{Backend, Config};
pub use confirm::{Always, Confirm};
pub use error::{StoreError, ValidationError};
pub use filter::{Counts, DateCategory, DateFilter, StatusFilter, TaskFilter, date_category, filtered_tasks, today};
pub use slot::{FileSlot, MemorySlot, Slot, SqliteSlot};
pub use store::{ClearOutcome, StoreEvent, TaskStore};
pub use task::{Task, TaskId, TaskStatus};
