// tasktrack - personal task tracking with a file-backed store

pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod persist;
pub mod session;
pub mod store;

// Re-export main types for convenience
pub use config::Config;
pub use error::{Result, StoreError};
pub use filter::ListFilter;
pub use models::{Task, TaskStatus, now};
pub use persist::{LoadOrigin, Loaded, TaskFile};
pub use session::{Session, SessionStart};
pub use store::{TaskStore, TaskUpdate};
