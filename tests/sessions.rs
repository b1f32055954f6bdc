//! Multi-session behaviour over the on-disk slot backends

use chrono::NaiveDate;
use tempfile::TempDir;
use todostore::{
    Always, Backend, ClearOutcome, Config, Counts, DateFilter, FileSlot, SqliteSlot, StatusFilter, TaskFilter,
    TaskStatus, TaskStore,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_file_slot_survives_sessions() {
    let temp = TempDir::new().unwrap();

    let id = {
        let slot = FileSlot::open(temp.path(), "todoTasks").unwrap();
        let mut store = TaskStore::open(slot, Always::yes());
        store.add("Buy milk", date(2024, 1, 10)).unwrap();
        let id = store.add("Pay rent", date(2024, 1, 1)).unwrap();
        store.toggle_status(id, true).unwrap();
        id
    };

    let slot = FileSlot::open(temp.path(), "todoTasks").unwrap();
    let store = TaskStore::open(slot, Always::yes());

    assert_eq!(store.len(), 2);
    assert_eq!(store.tasks()[0].description, "Buy milk");
    assert_eq!(store.get(id).unwrap().status, TaskStatus::Completed);
    assert_eq!(store.get(id).unwrap().due_date, date(2024, 1, 1));
}

#[test]
fn test_sqlite_slot_scenario() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("todostore.db");

    {
        let slot = SqliteSlot::open(&db_path, "todoTasks").unwrap();
        let mut store = TaskStore::open(slot, Always::yes());
        store.add("Buy milk", date(2024, 1, 10)).unwrap();
        store.add("Pay rent", date(2024, 1, 1)).unwrap();
        assert_eq!(
            store.counts(),
            Counts {
                total: 2,
                in_progress: 2,
                completed: 0
            }
        );
    }

    {
        let slot = SqliteSlot::open(&db_path, "todoTasks").unwrap();
        let mut store = TaskStore::open(slot, Always::yes());
        store.toggle_status_at(0, true).unwrap();
        assert_eq!(
            store.counts(),
            Counts {
                total: 2,
                in_progress: 1,
                completed: 1
            }
        );

        let today = date(2024, 1, 5);
        let overdue_open = store.filtered(TaskFilter::new(StatusFilter::InProgress, DateFilter::Overdue), today);
        assert_eq!(overdue_open.len(), 1);
        assert_eq!(overdue_open[0].description, "Pay rent");
    }

    let slot = SqliteSlot::open(&db_path, "todoTasks").unwrap();
    let mut store = TaskStore::open(slot, Always::yes());
    assert_eq!(store.counts().completed, 1);
    assert_eq!(store.clear_all().unwrap(), ClearOutcome::Cleared(2));

    let slot = SqliteSlot::open(&db_path, "todoTasks").unwrap();
    let store = TaskStore::open(slot, Always::yes());
    assert!(store.is_empty());
}

#[test]
fn test_corrupt_file_slot_recovers_empty() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("todoTasks.json"), "{{{ not json").unwrap();

    let slot = FileSlot::open(temp.path(), "todoTasks").unwrap();
    let mut store = TaskStore::open(slot, Always::yes());
    assert!(store.is_empty());

    // The next write replaces the corrupt payload
    store.add("Fresh start", date(2024, 1, 1)).unwrap();
    let slot = FileSlot::open(temp.path(), "todoTasks").unwrap();
    assert_eq!(TaskStore::open(slot, Always::yes()).len(), 1);
}

#[test]
fn test_config_selected_backend_round_trip() {
    let temp = TempDir::new().unwrap();
    let config = Config {
        data_dir: Some(temp.path().to_path_buf()),
        backend: Backend::File,
        slot_key: "work".to_string(),
        ..Config::default()
    };

    let mut store = TaskStore::open(config.open_slot().unwrap(), Always::yes());
    store.add_raw("Ship release", "2024-06-01").unwrap();

    assert!(temp.path().join("work.json").exists());
    let store = TaskStore::open(config.open_slot().unwrap(), Always::yes());
    assert_eq!(store.tasks()[0].description, "Ship release");
}
