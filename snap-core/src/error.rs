use std::fmt::{self, Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapError {
    Config(String),
    UnknownProvider(String),
    Provider(String),
    Network(String),
    Heartbeat(String),
    UnexpectedActionStatus { action_id: u64, status: String },
    PollTimeout { action_id: u64, attempts: u32 },
    Io(#[from] std::io::Error),
    Serialization(String),
    Other(#[from] anyhow::Error),
}

impl SnapError {
    /// True for errors that must abort the process rather than be reported
    /// as a failed job.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SnapError::Config(_)
                | SnapError::UnknownProvider(_)
                | SnapError::UnexpectedActionStatus { .. }
        )
    }
}

impl Display for SnapError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            SnapError::Config(s) => write!(f, "Configuration error: {}", s),
            SnapError::UnknownProvider(name) => {
                write!(f, "No provider could be found with name '{}'", name)
            }
            SnapError::Provider(s) => write!(f, "Provider error: {}", s),
            SnapError::Network(s) => write!(f, "Network error: {}", s),
            SnapError::Heartbeat(s) => write!(f, "Heartbeat error: {}", s),
            SnapError::UnexpectedActionStatus { action_id, status } => write!(
                f,
                "Unexpected status '{}' for server action #{}",
                status, action_id
            ),
            SnapError::PollTimeout {
                action_id,
                attempts,
            } => write!(
                f,
                "Server action #{} still running after {} status queries",
                action_id, attempts
            ),
            SnapError::Io(e) => write!(f, "I/O error: {}", e),
            SnapError::Serialization(s) => write!(f, "Serialization error: {}", s),
            SnapError::Other(e) => write!(f, "Other error: {}", e),
        }
    }
}

impl From<reqwest::Error> for SnapError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SnapError::Serialization(err.to_string())
        } else {
            SnapError::Network(err.to_string())
        }
    }
}

impl From<serde_yaml_ng::Error> for SnapError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        SnapError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SnapError {
    fn from(err: serde_json::Error) -> Self {
        SnapError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SnapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(SnapError::UnknownProvider("ovh".into()).is_fatal());
        assert!(SnapError::UnexpectedActionStatus {
            action_id: 1,
            status: "paused".into()
        }
        .is_fatal());
        assert!(!SnapError::Network("connection reset".into()).is_fatal());
    }

    #[test]
    fn test_display_messages() {
        let err = SnapError::UnexpectedActionStatus {
            action_id: 42,
            status: "paused".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unexpected status 'paused' for server action #42"
        );

        let err = SnapError::UnknownProvider("ovh".into());
        assert_eq!(err.to_string(), "No provider could be found with name 'ovh'");
    }

    #[test]
    fn test_serde_json_conversion() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("not json");
        let err: SnapError = parse.unwrap_err().into();
        assert!(matches!(err, SnapError::Serialization(_)));
    }
}
