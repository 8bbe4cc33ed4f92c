// Status filter for listing tasks

use crate::error::StoreError;
use crate::models::{Task, TaskStatus};
use std::str::FromStr;

/// Which tasks a listing should return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFilter {
    /// Every task, in creation order
    #[default]
    All,
    /// Tasks holding one status, in status-index order
    Status(TaskStatus),
}

impl ListFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            ListFilter::All => true,
            ListFilter::Status(status) => task.status == *status,
        }
    }
}

impl From<TaskStatus> for ListFilter {
    fn from(status: TaskStatus) -> Self {
        ListFilter::Status(status)
    }
}

impl FromStr for ListFilter {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(ListFilter::All);
        }
        s.parse::<TaskStatus>().map(ListFilter::Status)
    }
}

impl std::fmt::Display for ListFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListFilter::All => write!(f, "all"),
            ListFilter::Status(status) => write!(f, "{}", status),
        }
    }
}
