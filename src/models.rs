// Data models for tasktrack

use crate::error::StoreError;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A unit of tracked work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Every status, in display order
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = StoreError;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| StoreError::InvalidStatus(s.to_string()))
    }
}

/// Current time at the precision the task file keeps
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Canonical timestamp text used at the persistence boundary.
///
/// Written as RFC 3339 in UTC with microseconds
/// (`2024-03-01T09:30:00.123456Z`). Reading also accepts other offsets and
/// naive ISO-8601 text, which is taken as local time.
pub mod timestamp {
    use crate::error::StoreError;
    use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn parse(text: &str) -> Result<DateTime<Utc>, StoreError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(dt.with_timezone(&Utc).trunc_subsecs(6));
        }

        let naive = NaiveDateTime::parse_from_str(text, NAIVE_FORMAT)
            .map_err(|e| StoreError::CorruptData(format!("unparsable timestamp '{}': {}", text, e)))?;

        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(6))
            .ok_or_else(|| StoreError::CorruptData(format!("timestamp '{}' does not exist in local time", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, NaiveDate, TimeZone, Timelike};

    #[test]
    fn test_now_is_microsecond_precision() {
        let ts = now();
        assert_eq!(ts.nanosecond() % 1_000, 0);
        // Should be reasonable timestamp (after 2020)
        assert!(ts.timestamp() > 1_600_000_000);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&TaskStatus::Todo).unwrap(), "\"todo\"");
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"in-progress\"");
        assert_eq!(serde_json::to_string(&TaskStatus::Done).unwrap(), "\"done\"");

        let status: TaskStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(status, TaskStatus::InProgress);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("todo".parse::<TaskStatus>().unwrap(), TaskStatus::Todo);
        assert_eq!(" In-Progress ".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("DONE".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
    }

    #[test]
    fn test_status_from_str_rejects_unknown() {
        let err = "blocked".parse::<TaskStatus>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatus(ref s) if s == "blocked"));

        // The underscore spelling is not accepted
        assert!("in_progress".parse::<TaskStatus>().is_err());
        assert!("".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap() + chrono::Duration::microseconds(123_456);
        assert_eq!(timestamp::format(&ts), "2024-03-01T09:30:00.123456Z");
    }

    #[test]
    fn test_timestamp_parse_canonical() {
        let ts = now();
        let parsed = timestamp::parse(&timestamp::format(&ts)).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_timestamp_parse_offset() {
        let parsed = timestamp::parse("2024-03-01T11:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_timestamp_parse_naive_as_local() {
        let parsed = timestamp::parse("2024-03-01T09:30:00.250000").unwrap();

        let naive = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_micro_opt(9, 30, 0, 250_000)
            .unwrap();
        let expected = Local.from_local_datetime(&naive).earliest().unwrap().with_timezone(&Utc);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_timestamp_parse_garbage() {
        let err = timestamp::parse("yesterday").unwrap_err();
        assert!(matches!(err, StoreError::CorruptData(_)));
    }
}
