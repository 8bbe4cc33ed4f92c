// Error taxonomy for the task store and its backing file

use thiserror::Error;

/// Errors returned by store and persistence operations.
///
/// Every variant is recoverable at the session level: the in-memory store
/// stays valid after any of them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Status text outside `todo`, `in-progress`, `done`
    #[error("invalid status '{0}' (expected one of: todo, in-progress, done)")]
    InvalidStatus(String),

    /// No task carries the requested id
    #[error("task {0} not found")]
    NotFound(u64),

    /// Id counter reached the top of the id range
    #[error("no task ids left to assign")]
    IdsExhausted,

    /// Backing file is readable but its contents cannot be trusted
    #[error("corrupt task data: {0}")]
    CorruptData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StoreError::InvalidStatus("blocked".to_string()).to_string(),
            "invalid status 'blocked' (expected one of: todo, in-progress, done)"
        );
        assert_eq!(StoreError::NotFound(7).to_string(), "task 7 not found");
        assert_eq!(
            StoreError::CorruptData("bad timestamp".to_string()).to_string(),
            "corrupt task data: bad timestamp"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
