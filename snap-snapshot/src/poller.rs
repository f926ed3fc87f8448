//! Drives a provider action to a terminal state.
//!
//! Polling is split into a single status query ([`ActionPoller::query_once`])
//! and a driver loop that owns the waiting, so callers can supply their own
//! timer and tests never sleep.

use snap_config::PollingSettings;
use snap_core::{Result, SnapError};
use snap_provider::{ActionStatus, CloudProvider, ProgressSink};
use std::time::Duration;
use tracing::{debug, error, info};

/// Final result of a polled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Success,
    Failed,
}

/// Result of one status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Still running, with the reported progress.
    Pending(u8),
    Done(PollOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` polls until the action is terminal.
    pub max_attempts: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: None,
        }
    }
}

impl From<&PollingSettings> for PollSettings {
    fn from(settings: &PollingSettings) -> Self {
        Self {
            interval: settings.interval(),
            max_attempts: settings.max_attempts,
        }
    }
}

pub struct ActionPoller<'a> {
    provider: &'a dyn CloudProvider,
    progress: &'a dyn ProgressSink,
    settings: PollSettings,
    instance_id: u64,
    action_id: u64,
    attempts: u32,
}

impl<'a> ActionPoller<'a> {
    pub fn new(
        provider: &'a dyn CloudProvider,
        progress: &'a dyn ProgressSink,
        settings: PollSettings,
        instance_id: u64,
        action_id: u64,
    ) -> Self {
        Self {
            provider,
            progress,
            settings,
            instance_id,
            action_id,
            attempts: 0,
        }
    }

    /// Number of status queries issued so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Issues one status query.
    ///
    /// A status outside `running`/`success`/`error` is a protocol violation
    /// and is returned as an error rather than retried.
    pub fn query_once(&mut self) -> Result<PollStep> {
        self.attempts += 1;
        let action = self
            .provider
            .get_server_action(self.instance_id, self.action_id)?;

        debug!(
            action_id = self.action_id,
            status = action.status.as_str(),
            progress = action.progress,
            attempt = self.attempts,
            "Polled server action"
        );
        self.progress.set_progress(action.progress);

        if let ActionStatus::Unknown(status) = action.status {
            self.progress.finish("unexpected action status");
            error!(action_id = self.action_id, status = %status, "Unexpected server action status");
            return Err(SnapError::UnexpectedActionStatus {
                action_id: self.action_id,
                status,
            });
        }
        if !action.status.is_terminal() {
            return Ok(PollStep::Pending(action.progress));
        }

        let outcome = if action.status == ActionStatus::Success {
            self.progress.finish("snapshot created");
            PollOutcome::Success
        } else {
            self.progress.finish("snapshot failed");
            PollOutcome::Failed
        };
        Ok(PollStep::Done(outcome))
    }

    /// Polls until terminal, waiting the configured interval between queries.
    pub fn run(&mut self) -> Result<PollOutcome> {
        self.run_with(std::thread::sleep)
    }

    /// Same as [`run`](Self::run) with a caller-supplied wait.
    pub fn run_with(&mut self, mut wait: impl FnMut(Duration)) -> Result<PollOutcome> {
        loop {
            match self.query_once()? {
                PollStep::Done(outcome) => {
                    info!(
                        action_id = self.action_id,
                        attempts = self.attempts,
                        ?outcome,
                        "Server action finished"
                    );
                    return Ok(outcome);
                }
                PollStep::Pending(_) => {
                    if let Some(max) = self.settings.max_attempts {
                        if self.attempts >= max {
                            self.progress.finish("gave up waiting");
                            return Err(SnapError::PollTimeout {
                                action_id: self.action_id,
                                attempts: self.attempts,
                            });
                        }
                    }
                    wait(self.settings.interval);
                }
            }
        }
    }
}

/// Polls `action_id` on `instance_id` to completion.
pub fn poll_to_completion(
    provider: &dyn CloudProvider,
    progress: &dyn ProgressSink,
    settings: PollSettings,
    instance_id: u64,
    action_id: u64,
) -> Result<PollOutcome> {
    ActionPoller::new(provider, progress, settings, instance_id, action_id).run()
}
