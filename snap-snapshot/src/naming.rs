//! Snapshot description convention.
//!
//! Descriptions look like `auto-{token}-{instance}-{DD-MM-YYYY}_{HH-MM-SS}`
//! and are the only marker telling this job's snapshots apart from manual
//! ones, so generation and matching live side by side.

use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

/// Whole-description grammar for job-created snapshots.
///
/// Anchored at both ends on purpose: a description that merely contains a
/// job name (a renamed or annotated copy) is not treated as job-owned and is
/// never pruned.
pub const SNAPSHOT_NAME_PATTERN: &str =
    r"^auto-[A-Za-z0-9_]{13}-[0-9]+-[0-9]{2}-[0-9]{2}-[0-9]{4}_[0-9]{2}-[0-9]{2}-[0-9]{2}$";

const TOKEN_LEN: usize = 13;

#[derive(Debug, Clone)]
pub struct NamingScheme {
    pattern: Regex,
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            pattern: Regex::new(SNAPSHOT_NAME_PATTERN)
                .expect("Hardcoded snapshot name pattern should always compile"),
        }
    }
}

impl NamingScheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matches(&self, description: &str) -> bool {
        self.pattern.is_match(description)
    }

    /// Description for a snapshot of `instance_id` taken at `at`.
    pub fn describe(&self, instance_id: u64, at: DateTime<Utc>) -> String {
        self.describe_with_token(&unique_token(), instance_id, at)
    }

    fn describe_with_token(&self, token: &str, instance_id: u64, at: DateTime<Utc>) -> String {
        format!(
            "auto-{}-{}-{}",
            token,
            instance_id,
            at.format("%d-%m-%Y_%H-%M-%S")
        )
    }
}

/// 13 lowercase hex characters, unique per call.
fn unique_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(TOKEN_LEN);
    token
}
