// Task file: JSON document holding every task plus the id counter

use crate::error::{Result, StoreError};
use crate::models::{Task, TaskStatus, timestamp};
use crate::store::TaskStore;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Backing file for a [`TaskStore`]
#[derive(Debug, Clone)]
pub struct TaskFile {
    path: PathBuf,
}

/// Result of [`TaskFile::load`]
#[derive(Debug)]
pub struct Loaded {
    pub store: TaskStore,
    pub origin: LoadOrigin,
}

/// Where a loaded store came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Read from the task file
    File { tasks: usize },
    /// No task file yet; the store starts empty
    Missing,
    /// The file is not a task document; the store starts empty
    Unparsable(String),
}

/// On-disk task record; timestamps stay as text until validated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: u64,
    description: String,
    status: String,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct StoredDocument {
    #[serde(default)]
    all_tasks: Vec<TaskRecord>,
    // Status indexes are redundant with all_tasks and only order hints, so
    // they are read loosely; see `index_ids`
    #[serde(default)]
    tasks_done: Value,
    #[serde(default)]
    tasks_in_progress: Value,
    #[serde(default)]
    tasks_todo: Value,
    #[serde(default, rename = "nextId", alias = "task_id_counter")]
    next_id: u64,
}

#[derive(Debug, Serialize)]
struct DocumentOut {
    all_tasks: Vec<TaskRecord>,
    tasks_done: Vec<TaskRecord>,
    tasks_in_progress: Vec<TaskRecord>,
    tasks_todo: Vec<TaskRecord>,
    #[serde(rename = "nextId")]
    next_id: u64,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            description: task.description.clone(),
            status: task.status.to_string(),
            created_at: timestamp::format(&task.created_at),
            updated_at: timestamp::format(&task.updated_at),
        }
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = StoreError;

    fn try_from(record: TaskRecord) -> Result<Self> {
        let status = record
            .status
            .parse::<TaskStatus>()
            .map_err(|_| StoreError::CorruptData(format!("task {}: invalid status '{}'", record.id, record.status)))?;

        Ok(Task {
            id: record.id,
            created_at: parse_timestamp(record.id, "createdAt", &record.created_at)?,
            updated_at: parse_timestamp(record.id, "updatedAt", &record.updated_at)?,
            description: record.description,
            status,
        })
    }
}

fn parse_timestamp(id: u64, field: &str, text: &str) -> Result<DateTime<Utc>> {
    timestamp::parse(text).map_err(|e| match e {
        StoreError::CorruptData(reason) => StoreError::CorruptData(format!("task {} {}: {}", id, field, reason)),
        other => other,
    })
}

impl DocumentOut {
    fn from_store(store: &TaskStore) -> Self {
        let records = |status| -> Vec<TaskRecord> {
            store
                .list_by_status(status)
                .into_iter()
                .map(TaskRecord::from)
                .collect()
        };

        Self {
            all_tasks: store.list_all().iter().map(TaskRecord::from).collect(),
            tasks_done: records(TaskStatus::Done),
            tasks_in_progress: records(TaskStatus::InProgress),
            tasks_todo: records(TaskStatus::Todo),
            next_id: store.next_id(),
        }
    }
}

impl StoredDocument {
    fn index_order(&self) -> BTreeMap<TaskStatus, Vec<u64>> {
        BTreeMap::from([
            (TaskStatus::Todo, index_ids("tasks_todo", &self.tasks_todo)),
            (TaskStatus::InProgress, index_ids("tasks_in_progress", &self.tasks_in_progress)),
            (TaskStatus::Done, index_ids("tasks_done", &self.tasks_done)),
        ])
    }
}

/// Ids from a persisted status index.
///
/// Entries are task records (only `id` is read) or bare ids. Anything else
/// is skipped with a warning; the index is rebuilt from `all_tasks` anyway.
fn index_ids(field: &str, value: &Value) -> Vec<u64> {
    let entries = match value {
        Value::Null => return Vec::new(),
        Value::Array(entries) => entries,
        other => {
            warn!(field, value = %other, "Status index is not an array, ignoring it");
            return Vec::new();
        }
    };

    entries
        .iter()
        .filter_map(|entry| {
            let id = entry.as_u64().or_else(|| entry.get("id").and_then(Value::as_u64));
            if id.is_none() {
                warn!(field, entry = %entry, "Skipping status index entry without an id");
            }
            id
        })
        .collect()
}

impl TaskFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the task file into a store.
    ///
    /// A missing or unparsable file yields an empty store and says so in
    /// [`Loaded::origin`]. A task with a bad timestamp or status, or a
    /// repeated id, is [`StoreError::CorruptData`]. Other read failures are
    /// [`StoreError::Io`].
    pub fn load(&self) -> Result<Loaded> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(file = ?self.path, "No task file found, starting fresh");
                return Ok(Loaded {
                    store: TaskStore::new(),
                    origin: LoadOrigin::Missing,
                });
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Ok(Self::unparsable(&self.path, e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let doc: StoredDocument = match serde_json::from_str(&text) {
            Ok(doc) => doc,
            Err(e) => return Ok(Self::unparsable(&self.path, e.to_string())),
        };

        let order = doc.index_order();
        let tasks = doc
            .all_tasks
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>>>()?;

        let store = TaskStore::from_parts(tasks, doc.next_id, &order)?;

        info!(
            file = ?self.path,
            count = store.len(),
            next_id = store.next_id(),
            "Loaded tasks"
        );

        Ok(Loaded {
            origin: LoadOrigin::File { tasks: store.len() },
            store,
        })
    }

    /// Write the whole store.
    ///
    /// The document goes to a sibling temp file which is synced and then
    /// renamed over the task file, so readers see either the previous
    /// contents or the new ones. An exclusive lock on `<file>.lock` is held
    /// while writing.
    pub fn save(&self, store: &TaskStore) -> Result<()> {
        let doc = DocumentOut::from_store(store);

        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        doc.serialize(&mut ser)?;
        buf.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;

        // Acquire exclusive lock before writing
        lock.lock_exclusive()?;

        let tmp_path = self.temp_path();
        if let Err(e) = write_and_rename(&tmp_path, &self.path, &buf) {
            warn!(file = ?self.path, error = %e, "Failed to save tasks");
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!(file = ?self.path, count = store.len(), "Saved tasks");

        // Lock is released when the lock file is dropped
        Ok(())
    }

    /// Copy the task file to `<file>.bak`, replacing any older backup.
    ///
    /// Used before overwriting a file that could not be loaded.
    pub fn backup(&self) -> Result<PathBuf> {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        let backup_path = PathBuf::from(name);

        fs::copy(&self.path, &backup_path)?;
        info!(file = ?self.path, backup = ?backup_path, "Backed up task file");
        Ok(backup_path)
    }

    fn unparsable(path: &Path, reason: String) -> Loaded {
        warn!(file = ?path, error = %reason, "Task file is not valid task data, starting fresh");
        Loaded {
            store: TaskStore::new(),
            origin: LoadOrigin::Unparsable(reason),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    pub(crate) fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("tasks");
        let tmp_name = format!(".{}.tmp-{}", name, std::process::id());
        self.path.with_file_name(tmp_name)
    }
}

fn write_and_rename(tmp_path: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(tmp_path, path)
}
