//! Per-provider heartbeat lookup.

use snap_config::{AppConfig, HealthchecksSettings};
use snap_core::Result;
use std::time::Duration;
use tracing::debug;

use crate::{HealthchecksClient, Heartbeat};

/// Finds the heartbeat a run against `provider` should report to.
pub trait HeartbeatResolver {
    /// `Ok(None)` when no check is configured for the provider.
    fn resolve(&self, provider: &str) -> Result<Option<Box<dyn Heartbeat>>>;
}

/// Healthchecks clients for the check ids listed in the configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredHeartbeats {
    settings: HealthchecksSettings,
    timeout: Duration,
}

impl ConfiguredHeartbeats {
    pub fn new(settings: HealthchecksSettings, timeout: Duration) -> Self {
        Self { settings, timeout }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.healthchecks.clone(), config.http.timeout())
    }
}

impl HeartbeatResolver for ConfiguredHeartbeats {
    fn resolve(&self, provider: &str) -> Result<Option<Box<dyn Heartbeat>>> {
        let Some(check_id) = self.settings.check_id_for(provider) else {
            debug!(provider, "No heartbeat check configured");
            return Ok(None);
        };

        let client = HealthchecksClient::new(&self.settings, check_id, self.timeout)?;
        debug!(provider, check_id = client.check_id(), "Heartbeat check configured");
        Ok(Some(Box::new(client)))
    }
}

/// Never reports anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHeartbeat;

impl HeartbeatResolver for NoHeartbeat {
    fn resolve(&self, _provider: &str) -> Result<Option<Box<dyn Heartbeat>>> {
        Ok(None)
    }
}
