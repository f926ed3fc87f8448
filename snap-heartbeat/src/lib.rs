//! Heartbeat monitoring for snapshot runs.
//!
//! A run announces itself with `start`, ends with exactly one of
//! `report_success` / `report_failure`, and may consult the remote check
//! timings to find out whether a previous run is still inside its window.

use chrono::{DateTime, Utc};
use snap_core::Result;
use tracing::{debug, warn};

pub mod check;
pub mod healthchecks;
pub mod resolver;

#[cfg(any(test, feature = "test-helpers"))]
pub mod recording;

pub use check::CheckStatus;
pub use healthchecks::HealthchecksClient;
pub use resolver::{ConfiguredHeartbeats, HeartbeatResolver, NoHeartbeat};

pub trait Heartbeat {
    /// Signals that a run has begun.
    fn start(&self) -> Result<()>;

    /// Signals that the run completed successfully.
    fn report_success(&self) -> Result<()>;

    /// Signals that the run failed.
    fn report_failure(&self) -> Result<()>;

    /// Reads the remote check. `Ok(None)` means the monitor answered but
    /// returned nothing usable.
    fn fetch_check(&self) -> Result<Option<CheckStatus>>;

    /// Whether a previous run is judged still active at `now`.
    ///
    /// Lookup failures degrade to `false`; the lock is advisory.
    fn is_locked(&self, now: DateTime<Utc>) -> bool {
        match self.fetch_check() {
            Ok(Some(check)) => check.is_locked_at(now),
            Ok(None) => {
                debug!("Heartbeat check returned no data, treating as unlocked");
                false
            }
            Err(e) => {
                warn!(error = %e, "Could not read heartbeat check, treating as unlocked");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingHeartbeat;
    use chrono::Duration;

    #[test]
    fn test_is_locked_uses_check_timings() {
        let now = Utc::now();
        let heartbeat = RecordingHeartbeat::new().with_check(CheckStatus {
            name: "snapshot".into(),
            tags: String::new(),
            desc: String::new(),
            grace: 60,
            n_pings: 1,
            status: "started".into(),
            last_ping: Some(now - Duration::minutes(1)),
            next_ping: Some(now + Duration::minutes(10)),
        });
        assert!(heartbeat.is_locked(now));
        assert!(!heartbeat.is_locked(now + Duration::minutes(11)));
    }

    #[test]
    fn test_is_locked_degrades_on_failure() {
        let heartbeat = RecordingHeartbeat::new().failing_check();
        assert!(!heartbeat.is_locked(Utc::now()));

        let empty = RecordingHeartbeat::new();
        assert!(!empty.is_locked(Utc::now()));
    }
}
