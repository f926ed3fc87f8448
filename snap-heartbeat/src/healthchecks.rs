//! Healthchecks.io client.

use reqwest::blocking::Client;
use snap_config::HealthchecksSettings;
use snap_core::{Result, SnapError};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{CheckStatus, Heartbeat};

/// Pings and reads a single Healthchecks check.
pub struct HealthchecksClient {
    client: Client,
    ping_url: String,
    api_url: String,
    api_key: String,
    check_id: String,
}

impl HealthchecksClient {
    pub fn new(settings: &HealthchecksSettings, check_id: &str, timeout: Duration) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                SnapError::Config(
                    "Healthchecks API key is missing (set HEALTHCHECKS_API_KEY or healthchecks.api_key)"
                        .to_string(),
                )
            })?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cloudsnap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            ping_url: settings.ping_url.trim_end_matches('/').to_string(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key,
            check_id: check_id.to_string(),
        })
    }

    pub fn check_id(&self) -> &str {
        &self.check_id
    }

    fn ping(&self, suffix: Option<&str>) -> Result<()> {
        let url = match suffix {
            Some(suffix) => format!("{}/{}/{}", self.ping_url, self.check_id, suffix),
            None => format!("{}/{}", self.ping_url, self.check_id),
        };

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SnapError::Heartbeat(format!(
                "ping {} answered {}",
                url, status
            )));
        }

        debug!(check_id = %self.check_id, signal = suffix.unwrap_or("success"), "Heartbeat sent");
        Ok(())
    }
}

impl Heartbeat for HealthchecksClient {
    fn start(&self) -> Result<()> {
        self.ping(Some("start"))
    }

    fn report_success(&self) -> Result<()> {
        self.ping(None)
    }

    fn report_failure(&self) -> Result<()> {
        self.ping(Some("fail"))
    }

    fn fetch_check(&self) -> Result<Option<CheckStatus>> {
        let url = format!("{}/checks/{}", self.api_url, self.check_id);
        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(SnapError::Heartbeat(format!(
                "reading check {} answered {}",
                self.check_id, status
            )));
        }

        let body = response.text()?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<CheckStatus>(&body) {
            Ok(check) => Ok(Some(check)),
            Err(e) => {
                warn!(check_id = %self.check_id, error = %e, "Unreadable check payload");
                Ok(None)
            }
        }
    }
}
