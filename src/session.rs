// One CLI session: a task file, the store read from it, and save bookkeeping

use crate::error::{Result, StoreError};
use crate::persist::{LoadOrigin, TaskFile};
use crate::store::TaskStore;
use std::path::PathBuf;
use tracing::{info, warn};

/// How the session's store was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStart {
    /// Loaded from the task file
    Loaded { tasks: usize },
    /// No task file existed
    Fresh,
    /// The task file could not be used; the store started empty
    Degraded { reason: String },
}

/// A store opened from a [`TaskFile`].
///
/// If the file existed but could not be loaded, the first save copies it to
/// `<file>.bak` before overwriting it.
#[derive(Debug)]
pub struct Session {
    file: TaskFile,
    store: TaskStore,
    start: SessionStart,
    needs_backup: bool,
}

impl Session {
    /// Load `file`, falling back to an empty store when its contents are
    /// unparsable or corrupt. Other read failures are returned.
    pub fn open(file: TaskFile) -> Result<Self> {
        let (store, start) = match file.load() {
            Ok(loaded) => {
                let start = match loaded.origin {
                    LoadOrigin::File { tasks } => SessionStart::Loaded { tasks },
                    LoadOrigin::Missing => SessionStart::Fresh,
                    LoadOrigin::Unparsable(reason) => SessionStart::Degraded { reason },
                };
                (loaded.store, start)
            }
            Err(StoreError::CorruptData(reason)) => {
                warn!(file = ?file.path(), %reason, "Corrupt task file, starting fresh");
                (TaskStore::new(), SessionStart::Degraded { reason })
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            needs_backup: matches!(start, SessionStart::Degraded { .. }),
            file,
            store,
            start,
        })
    }

    pub fn start(&self) -> &SessionStart {
        &self.start
    }

    pub fn file(&self) -> &TaskFile {
        &self.file
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore {
        &mut self.store
    }

    /// Save the store, returning the backup path if this save had to
    /// preserve an unreadable file first.
    ///
    /// When the backup fails nothing is written.
    pub fn save(&mut self) -> Result<Option<PathBuf>> {
        let backup = if self.needs_backup {
            Some(self.file.backup()?)
        } else {
            None
        };

        self.file.save(&self.store)?;
        self.needs_backup = false;

        if let Some(path) = &backup {
            info!(backup = ?path, "Replaced unreadable task file");
        }
        Ok(backup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("task_store.json");

        let mut session = Session::open(TaskFile::new(&path)).unwrap();
        assert_eq!(*session.start(), SessionStart::Fresh);
        assert!(session.store().is_empty());

        session.store_mut().create("first", TaskStatus::Todo).unwrap();
        assert_eq!(session.save().unwrap(), None);
        assert!(path.exists());
        assert!(!temp.path().join("task_store.json.bak").exists());
    }

    #[test]
    fn test_open_existing_file() {
        let temp = TempDir::new().unwrap();
        let file = TaskFile::new(temp.path().join("task_store.json"));
        let mut store = TaskStore::new();
        store.create("a", TaskStatus::Done).unwrap();
        file.save(&store).unwrap();

        let mut session = Session::open(file).unwrap();
        assert_eq!(*session.start(), SessionStart::Loaded { tasks: 1 });
        assert_eq!(session.save().unwrap(), None);
    }

    #[test]
    fn test_unparsable_file_backed_up_on_first_save_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("task_store.json");
        fs::write(&path, "{definitely not json").unwrap();

        let mut session = Session::open(TaskFile::new(&path)).unwrap();
        assert!(matches!(session.start(), SessionStart::Degraded { .. }));
        assert!(session.store().is_empty());

        session.store_mut().create("fresh start", TaskStatus::Todo).unwrap();
        let backup = session.save().unwrap().unwrap();
        assert_eq!(fs::read_to_string(&backup).unwrap(), "{definitely not json");

        // The task file now holds the new store
        let reloaded = TaskFile::new(&path).load().unwrap();
        assert_eq!(reloaded.origin, LoadOrigin::File { tasks: 1 });

        // Later saves leave the backup alone
        session.store_mut().create("second", TaskStatus::Todo).unwrap();
        assert_eq!(session.save().unwrap(), None);
        assert_eq!(fs::read_to_string(&backup).unwrap(), "{definitely not json");
    }

    #[test]
    fn test_corrupt_file_backed_up_before_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("task_store.json");
        let corrupt = r#"{"all_tasks": [{"id": 0, "description": "a", "status": "todo", "createdAt": "soon", "updatedAt": "soon"}], "nextId": 1}"#;
        fs::write(&path, corrupt).unwrap();

        let mut session = Session::open(TaskFile::new(&path)).unwrap();
        match session.start() {
            SessionStart::Degraded { reason } => assert!(reason.contains("createdAt")),
            other => panic!("expected a degraded start, got {:?}", other),
        }

        let backup = session.save().unwrap().unwrap();
        assert_eq!(backup, temp.path().join("task_store.json.bak"));
        assert_eq!(fs::read_to_string(backup).unwrap(), corrupt);
    }

    #[test]
    fn test_open_unreadable_path_fails() {
        let temp = TempDir::new().unwrap();

        // A directory where the task file should be
        let err = Session::open(TaskFile::new(temp.path())).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
