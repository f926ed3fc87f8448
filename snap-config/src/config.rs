//! Settings model for `config.yaml`.
//!
//! Every section is optional in the file; missing sections fall back to the
//! defaults below so an empty file is a valid (if unmonitored) configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use snap_core::{Result, SnapError};
use std::path::PathBuf;
use std::time::Duration;

/// Root structure of the job configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub healthchecks: HealthchecksSettings,

    #[serde(default)]
    pub polling: PollingSettings,

    #[serde(default)]
    pub lock: LockSettings,

    #[serde(default)]
    pub http: HttpSettings,

    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// Credentials and endpoints per cloud provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub hetzner: HetznerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HetznerSettings {
    /// API token; `HCLOUD_TOKEN` takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    #[serde(default = "default_hetzner_base_url")]
    pub api_base_url: String,
}

fn default_hetzner_base_url() -> String {
    "https://api.hetzner.cloud/v1/".to_string()
}

impl Default for HetznerSettings {
    fn default() -> Self {
        Self {
            api_token: None,
            api_base_url: default_hetzner_base_url(),
        }
    }
}

/// Healthchecks.io monitoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthchecksSettings {
    /// Read-only API key used for the lock check; `HEALTHCHECKS_API_KEY`
    /// takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_ping_url")]
    pub ping_url: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Check ids keyed by `snapshot_<provider>_id`.
    #[serde(default)]
    pub checks: IndexMap<String, String>,
}

fn default_ping_url() -> String {
    "https://hc-ping.com".to_string()
}

fn default_api_url() -> String {
    "https://healthchecks.io/api/v1".to_string()
}

impl Default for HealthchecksSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            ping_url: default_ping_url(),
            api_url: default_api_url(),
            checks: IndexMap::new(),
        }
    }
}

impl HealthchecksSettings {
    /// Check id stored under `snapshot_<provider>_id`. Blank ids count as unset.
    pub fn check_id_for(&self, provider: &str) -> Option<&str> {
        let key = format!("snapshot_{}_id", provider.to_lowercase());
        self.checks
            .get(&key)
            .map(String::as_str)
            .filter(|id| !id.trim().is_empty())
    }
}

/// Action polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Upper bound on status queries. Unset means poll until terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

fn default_interval_secs() -> u64 {
    2
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_attempts: None,
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Overlapping-run guard based on the heartbeat check timings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LockSettings {
    /// Skip the run when the previous one is still inside its grace window.
    #[serde(default)]
    pub skip_when_locked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Overlays secrets from the environment onto the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("HCLOUD_TOKEN").filter(|v| !v.is_empty()) {
            self.providers.hetzner.api_token = Some(token);
        }
        if let Some(key) = lookup("HEALTHCHECKS_API_KEY").filter(|v| !v.is_empty()) {
            self.healthchecks.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_secs == 0 && self.polling.max_attempts.is_none() {
            return Err(SnapError::Config(
                "polling.interval_secs must be greater than 0 unless polling.max_attempts is set"
                    .to_string(),
            ));
        }
        if self.polling.max_attempts == Some(0) {
            return Err(SnapError::Config(
                "polling.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(SnapError::Config(
                "http.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
