// Key-value storage slots backing a task list

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::cell::RefCell;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Default slot key, shared by every backend
pub const DEFAULT_SLOT_KEY: &str = "todoTasks";

/// A single named value in local storage
///
/// A slot holds one serialized payload. Reading an absent slot is not an
/// error; it yields `None`.
pub trait Slot {
    /// Key this slot is stored under
    fn key(&self) -> &str;

    /// Current payload, if any has been written
    fn read(&self) -> Result<Option<String>>;

    /// Replace the payload
    fn write(&mut self, value: &str) -> Result<()>;
}

impl<S: Slot + ?Sized> Slot for Box<S> {
    fn key(&self) -> &str {
        (**self).key()
    }

    fn read(&self) -> Result<Option<String>> {
        (**self).read()
    }

    fn write(&mut self, value: &str) -> Result<()> {
        (**self).write(value)
    }
}

/// Validate a slot key
///
/// Keys become filenames for `FileSlot`, so they are restricted to
/// alphanumerics plus `_` and `-`.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Slot key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Slot key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid slot key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

// ============================================================================
// In-memory slot
// ============================================================================

/// In-process slot; clones share the same cell
///
/// Handing a clone to a second store simulates a fresh session over the
/// same storage.
#[derive(Debug, Clone)]
pub struct MemorySlot {
    key: String,
    value: Rc<RefCell<Option<String>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::with_key(DEFAULT_SLOT_KEY)
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Rc::new(RefCell::new(None)),
        }
    }

    /// Pre-populate the slot with a raw payload
    pub fn with_value(value: impl Into<String>) -> Self {
        let slot = Self::new();
        *slot.value.borrow_mut() = Some(value.into());
        slot
    }

    /// Raw payload as last written
    pub fn raw(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    /// Drop the payload, as if storage was wiped externally
    pub fn wipe(&self) {
        *self.value.borrow_mut() = None;
    }
}

impl Default for MemorySlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Slot for MemorySlot {
    fn key(&self) -> &str {
        &self.key
    }

    fn read(&self) -> Result<Option<String>> {
        Ok(self.value.borrow().clone())
    }

    fn write(&mut self, value: &str) -> Result<()> {
        *self.value.borrow_mut() = Some(value.to_string());
        Ok(())
    }
}

// ============================================================================
// File slot
// ============================================================================

/// Slot stored as `<dir>/<key>.json`
///
/// Writes go to a temp file which is renamed over the target while an
/// exclusive lock is held on `<key>.lock`.
#[derive(Debug, Clone)]
pub struct FileSlot {
    key: String,
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileSlot {
    pub fn open<P: AsRef<Path>>(dir: P, key: &str) -> Result<Self> {
        validate_key(key)?;

        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create slot directory")?;

        Ok(Self {
            key: key.to_string(),
            path: dir.join(format!("{}.json", key)),
            lock_path: dir.join(format!("{}.lock", key)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .context("Failed to open slot lock file")
    }
}

impl Slot for FileSlot {
    fn key(&self) -> &str {
        &self.key
    }

    fn read(&self) -> Result<Option<String>> {
        let lock = self.lock_file()?;
        FileExt::lock_shared(&lock).context("Failed to acquire shared slot lock")?;

        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to read slot file"),
        };
        debug!(path = ?self.path, bytes = data.len(), "Read slot file");

        // Lock is released when `lock` is dropped
        Ok(Some(data))
    }

    fn write(&mut self, value: &str) -> Result<()> {
        let lock = self.lock_file()?;
        FileExt::lock_exclusive(&lock).context("Failed to acquire file lock")?;

        let tmp_path = self.path.with_extension("json.tmp");
        if let Err(e) = replace_file(&tmp_path, &self.path, value) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        debug!(path = ?self.path, bytes = value.len(), "Wrote slot file");
        Ok(())
    }
}

fn replace_file(tmp_path: &Path, path: &Path, value: &str) -> Result<()> {
    let mut file = File::create(tmp_path).context("Failed to create temp slot file")?;
    file.write_all(value.as_bytes()).context("Failed to write temp slot file")?;
    file.sync_all().context("Failed to sync temp slot file")?;
    fs::rename(tmp_path, path).context("Failed to replace slot file")?;
    Ok(())
}

// ============================================================================
// SQLite slot
// ============================================================================

/// Slot stored as one row of a `slots(key, value)` table
pub struct SqliteSlot {
    key: String,
    db: Connection,
}

impl SqliteSlot {
    pub fn open<P: AsRef<Path>>(db_path: P, key: &str) -> Result<Self> {
        validate_key(key)?;

        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).context("Failed to create slot directory")?;
        }

        let db = Connection::open(db_path).context("Failed to open SQLite database")?;
        Self::from_connection(db, key)
    }

    /// Wrap an existing connection; used with in-memory databases
    pub fn from_connection(db: Connection, key: &str) -> Result<Self> {
        validate_key(key)?;

        let slot = Self {
            key: key.to_string(),
            db,
        };
        slot.create_schema()?;
        Ok(slot)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating slot schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

impl Slot for SqliteSlot {
    fn key(&self) -> &str {
        &self.key
    }

    fn read(&self) -> Result<Option<String>> {
        let value = self
            .db
            .query_row("SELECT value FROM slots WHERE key = ?1", [&self.key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .context("Failed to read slot row")?;

        Ok(value)
    }

    fn write(&mut self, value: &str) -> Result<()> {
        self.db
            .execute(
                "INSERT OR REPLACE INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![&self.key, value, now_ms()],
            )
            .context("Failed to write slot row")?;

        debug!(key = %self.key, bytes = value.len(), "Wrote slot row");
        Ok(())
    }
}

// Helper function for timestamps
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_key() {
        // Valid
        assert!(validate_key("todoTasks").is_ok());
        assert!(validate_key("work-list_2").is_ok());

        // Invalid
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("has space").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_memory_slot_clones_share_storage() {
        let mut slot = MemorySlot::new();
        let other = slot.clone();
        assert_eq!(slot.key(), DEFAULT_SLOT_KEY);
        assert!(other.read().unwrap().is_none());

        slot.write("[]").unwrap();
        assert_eq!(other.read().unwrap().as_deref(), Some("[]"));

        other.wipe();
        assert!(slot.read().unwrap().is_none());
    }

    #[test]
    fn test_file_slot_missing_file_reads_none() {
        let temp = TempDir::new().unwrap();
        let slot = FileSlot::open(temp.path(), "todoTasks").unwrap();
        assert!(slot.read().unwrap().is_none());

        // The read still went through the lock
        assert!(temp.path().join("todoTasks.lock").exists());
    }

    #[test]
    fn test_file_slot_failed_write_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let mut slot = FileSlot::open(temp.path(), "todoTasks").unwrap();

        // A directory in the way makes the final rename fail
        fs::create_dir(slot.path()).unwrap();
        fs::write(slot.path().join("occupied"), "x").unwrap();

        assert!(slot.write("[]").is_err());
        assert!(!slot.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_slot_write_then_read() {
        let temp = TempDir::new().unwrap();
        let mut slot = FileSlot::open(temp.path().join("nested"), "todoTasks").unwrap();

        slot.write(r#"[{"a":1}]"#).unwrap();
        slot.write(r#"[{"a":2}]"#).unwrap();

        assert!(slot.path().exists());
        assert!(!slot.path().with_extension("json.tmp").exists());

        let reopened = FileSlot::open(temp.path().join("nested"), "todoTasks").unwrap();
        assert_eq!(reopened.read().unwrap().as_deref(), Some(r#"[{"a":2}]"#));
    }

    #[test]
    fn test_file_slot_rejects_bad_key() {
        let temp = TempDir::new().unwrap();
        assert!(FileSlot::open(temp.path(), "a/b").is_err());
    }

    #[test]
    fn test_sqlite_slot_round_trip() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("todostore.db");

        let mut slot = SqliteSlot::open(&db_path, "todoTasks").unwrap();
        assert!(slot.read().unwrap().is_none());

        slot.write("first").unwrap();
        slot.write("second").unwrap();
        drop(slot);

        let reopened = SqliteSlot::open(&db_path, "todoTasks").unwrap();
        assert_eq!(reopened.read().unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_sqlite_slots_are_keyed() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("todostore.db");

        let mut work = SqliteSlot::open(&db_path, "work").unwrap();
        let home = SqliteSlot::open(&db_path, "home").unwrap();

        work.write("w").unwrap();
        assert_eq!(work.read().unwrap().as_deref(), Some("w"));
        assert!(home.read().unwrap().is_none());
    }

    #[test]
    fn test_boxed_slot_delegates() {
        let inner = MemorySlot::new();
        let mut boxed: Box<dyn Slot> = Box::new(inner.clone());
        boxed.write("payload").unwrap();
        assert_eq!(boxed.key(), DEFAULT_SLOT_KEY);
        assert_eq!(inner.raw().as_deref(), Some("payload"));
    }

    #[test]
    fn test_now_ms() {
        let ts = now_ms();
        // Should be reasonable timestamp (after year 2020)
        assert!(ts > 1_600_000_000_000);
    }
}
