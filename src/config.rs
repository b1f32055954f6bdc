// Configuration file handling

use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::slot::{DEFAULT_SLOT_KEY, FileSlot, Slot, SqliteSlot};

/// Environment variable overriding the data directory
pub const HOME_ENV: &str = "TODOSTORE_HOME";

/// Storage backend for the task slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    File,
}

/// Settings read from `config.yaml`; every field is optional
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub slot_key: String,
    pub backend: Backend,
    pub confirm_clear: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            slot_key: DEFAULT_SLOT_KEY.to_string(),
            backend: Backend::default(),
            confirm_clear: true,
        }
    }
}

impl Config {
    /// `<config dir>/todostore/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("todostore").join("config.yaml"))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default location is
    /// tried and a missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&content).with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = ?path, "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content).context("Failed to parse YAML")?;
        Ok(config)
    }

    /// Directory holding the slot files
    ///
    /// Resolution order: config value, `$TODOSTORE_HOME`, platform data dir.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        if let Ok(dir) = std::env::var(HOME_ENV) {
            return Ok(PathBuf::from(dir));
        }
        let base = dirs::data_dir().ok_or_else(|| eyre!("No data directory available"))?;
        Ok(base.join("todostore"))
    }

    /// Open the configured slot backend
    pub fn open_slot(&self) -> Result<Box<dyn Slot>> {
        let dir = self.data_dir()?;
        debug!(dir = ?dir, backend = ?self.backend, key = %self.slot_key, "Opening slot");

        let slot: Box<dyn Slot> = match self.backend {
            Backend::Sqlite => Box::new(SqliteSlot::open(dir.join("todostore.db"), &self.slot_key)?),
            Backend::File => Box::new(FileSlot::open(&dir, &self.slot_key)?),
        };
        Ok(slot)
    }
}
