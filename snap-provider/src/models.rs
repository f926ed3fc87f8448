//! Provider-neutral snapshot and action types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of image stored by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageType {
    Snapshot,
    Backup,
    Other(String),
}

impl ImageType {
    pub fn as_str(&self) -> &str {
        match self {
            ImageType::Snapshot => "snapshot",
            ImageType::Backup => "backup",
            ImageType::Other(s) => s,
        }
    }
}

impl From<String> for ImageType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "snapshot" => ImageType::Snapshot,
            "backup" => ImageType::Backup,
            _ => ImageType::Other(value),
        }
    }
}

impl From<ImageType> for String {
    fn from(value: ImageType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider-managed disk image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: u64,
    pub description: String,
    pub image_type: ImageType,
    /// Instance the image was taken from, when the provider still knows it.
    pub created_from: Option<u64>,
    pub created: DateTime<Utc>,
}

/// Status of an asynchronous provider action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Running,
    Success,
    Error,
    /// Anything the provider reports outside the known set.
    Unknown(String),
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Success | ActionStatus::Error)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionStatus::Running => "running",
            ActionStatus::Success => "success",
            ActionStatus::Error => "error",
            ActionStatus::Unknown(s) => s,
        }
    }
}

impl From<&str> for ActionStatus {
    fn from(value: &str) -> Self {
        match value {
            "running" => ActionStatus::Running,
            "success" => ActionStatus::Success,
            "error" => ActionStatus::Error,
            other => ActionStatus::Unknown(other.to_string()),
        }
    }
}

/// An in-flight provider operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: u64,
    pub status: ActionStatus,
    /// Completion percentage, clamped to 0..=100.
    pub progress: u8,
}

impl Action {
    pub fn new(id: u64, status: ActionStatus, progress: u64) -> Self {
        Self {
            id,
            status,
            progress: progress.min(100) as u8,
        }
    }
}

/// Parses a provider timestamp.
///
/// RFC 3339 values keep their offset; values without one are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_image_type_roundtrip_keeps_unknown_values() {
        assert_eq!(ImageType::from("snapshot".to_string()), ImageType::Snapshot);
        assert_eq!(ImageType::from("backup".to_string()), ImageType::Backup);
        let other = ImageType::from("system".to_string());
        assert_eq!(other, ImageType::Other("system".into()));
        assert_eq!(String::from(other), "system");
    }

    #[test]
    fn test_action_status_terminal_states() {
        assert!(!ActionStatus::Running.is_terminal());
        assert!(ActionStatus::Success.is_terminal());
        assert!(ActionStatus::Error.is_terminal());
        assert!(!ActionStatus::from("paused").is_terminal());
        assert_eq!(
            ActionStatus::from("paused"),
            ActionStatus::Unknown("paused".into())
        );
    }

    #[test]
    fn test_action_progress_is_clamped() {
        assert_eq!(Action::new(1, ActionStatus::Running, 250).progress, 100);
        assert_eq!(Action::new(1, ActionStatus::Running, 42).progress, 42);
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        let parsed = parse_timestamp("2024-03-10T12:00:00+01:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 10, 11, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_without_offset_is_utc() {
        let parsed = parse_timestamp("2024-03-10T12:00:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
