// Configuration file handling

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "tasktrack";
const CONFIG_FILE_NAME: &str = "tasktrack.yml";

/// Task file name
pub const TASK_FILE_NAME: &str = "task_store.json";

/// Settings read from `tasktrack.yml`.
///
/// Every key is optional:
///
/// ```yaml
/// task_file: /home/me/notes/task_store.json
/// color: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Location of the task file; relative paths are taken from the
    /// directory holding the config file
    pub task_file: PathBuf,

    /// Colorize terminal output
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            task_file: default_task_file(),
            color: true,
        }
    }
}

/// `<config dir>/tasktrack/tasktrack.yml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_NAME).join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// `<data dir>/tasktrack/task_store.json`
pub fn default_task_file() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_NAME).join(TASK_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(TASK_FILE_NAME))
}

impl Config {
    /// Load configuration.
    ///
    /// With an explicit `path` the file must exist. Without one the default
    /// location is tried and a missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    debug!(file = ?path, "No config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;

        let mut config = Self::from_yaml(&content)
            .wrap_err_with(|| format!("Failed to parse config file {}", path.display()))?;

        if config.task_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.task_file = dir.join(&config.task_file);
            }
        }

        debug!(file = ?path, task_file = ?config.task_file, "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Invalid config YAML")
    }
}
