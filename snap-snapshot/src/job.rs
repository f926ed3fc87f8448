//! End-to-end snapshot run
//!
//! Resolve the provider and its heartbeat, optionally honour the advisory
//! lock, create a snapshot, wait for the action, prune expired snapshots and
//! report the outcome.

use chrono::Utc;
use snap_config::AppConfig;
use snap_core::Result;
use snap_heartbeat::{Heartbeat, HeartbeatResolver};
use snap_provider::{CloudProvider, ImageType, NoProgress, ProgressSink, ProviderRegistry};
use tracing::{debug, error, info, warn};

use crate::filter::select_valid;
use crate::naming::NamingScheme;
use crate::poller::{poll_to_completion, PollOutcome, PollSettings};
use crate::retention::RetentionPlan;

/// Immutable parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub instance_id: u64,
    pub provider: String,
    /// Number of most recent job snapshots to retain.
    pub keep: usize,
}

impl JobContext {
    pub fn new(instance_id: u64, provider: impl Into<String>, keep: usize) -> Self {
        Self {
            instance_id,
            provider: provider.into(),
            keep,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    /// The snapshot could not be created or its action ended in `error`.
    Failed,
    /// A previous run still held the heartbeat lock.
    SkippedLocked,
}

impl JobOutcome {
    /// Whether the run should exit successfully.
    pub fn is_success(&self) -> bool {
        !matches!(self, JobOutcome::Failed)
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub outcome: JobOutcome,
    pub snapshot_description: Option<String>,
    /// Snapshots selected for deletion, oldest first.
    pub planned: Vec<u64>,
    pub deleted: Vec<u64>,
    /// Deletions the provider refused or that errored. Each was logged.
    pub failed_deletions: Vec<u64>,
}

impl JobReport {
    fn new(outcome: JobOutcome) -> Self {
        Self {
            outcome,
            snapshot_description: None,
            planned: Vec::new(),
            deleted: Vec::new(),
            failed_deletions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    pub poll: PollSettings,
    pub skip_when_locked: bool,
    /// Compute and log the retention plan only.
    pub dry_run: bool,
}

impl JobOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            poll: PollSettings::from(&config.polling),
            skip_when_locked: config.lock.skip_when_locked,
            dry_run: false,
        }
    }
}

pub struct SnapshotJob<'a> {
    registry: &'a ProviderRegistry,
    heartbeats: &'a dyn HeartbeatResolver,
    progress: &'a dyn ProgressSink,
    naming: NamingScheme,
    options: JobOptions,
}

impl<'a> SnapshotJob<'a> {
    pub fn new(registry: &'a ProviderRegistry, heartbeats: &'a dyn HeartbeatResolver) -> Self {
        Self {
            registry,
            heartbeats,
            progress: &NoProgress,
            naming: NamingScheme::new(),
            options: JobOptions::default(),
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs the job once.
    ///
    /// Expected failures come back as [`JobOutcome::Failed`]. Errors are
    /// reserved for configuration problems, protocol violations and
    /// transport failures; once the run has started, the heartbeat receives
    /// a failure ping before the error is returned.
    pub fn run(&self, ctx: &JobContext) -> Result<JobReport> {
        let provider = self.registry.resolve(&ctx.provider)?;
        provider.check_ready()?;
        let heartbeat = self.heartbeats.resolve(provider.name())?;

        if self.options.dry_run {
            return self.plan_only(provider, ctx);
        }

        if self.options.skip_when_locked {
            if let Some(heartbeat) = heartbeat.as_deref() {
                if heartbeat.is_locked(Utc::now()) {
                    warn!(
                        instance_id = ctx.instance_id,
                        provider = provider.name(),
                        "Previous run still active according to heartbeat, skipping"
                    );
                    return Ok(JobReport::new(JobOutcome::SkippedLocked));
                }
                debug!("Heartbeat lock is free");
            }
        }

        ping(heartbeat.as_deref(), Signal::Start);

        let mut report = JobReport::new(JobOutcome::Failed);
        match self.execute(provider, ctx, &mut report) {
            Ok(outcome) => {
                report.outcome = outcome;
                let signal = if outcome.is_success() {
                    Signal::Success
                } else {
                    Signal::Failure
                };
                ping(heartbeat.as_deref(), signal);
                Ok(report)
            }
            Err(e) => {
                if e.is_fatal() {
                    error!(instance_id = ctx.instance_id, error = %e, "Snapshot run aborted");
                } else {
                    error!(instance_id = ctx.instance_id, error = %e, "Snapshot run interrupted by a remote error");
                }
                ping(heartbeat.as_deref(), Signal::Failure);
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        provider: &dyn CloudProvider,
        ctx: &JobContext,
        report: &mut JobReport,
    ) -> Result<JobOutcome> {
        let description = self.naming.describe(ctx.instance_id, Utc::now());
        report.snapshot_description = Some(description.clone());
        info!(instance_id = ctx.instance_id, description = %description, "Creating snapshot");

        let Some(action) =
            provider.create_snapshot(ctx.instance_id, &description, &ImageType::Snapshot)?
        else {
            error!(instance_id = ctx.instance_id, "Provider returned no action for the snapshot");
            return Ok(JobOutcome::Failed);
        };
        self.progress.set_progress(action.progress);

        let outcome = poll_to_completion(
            provider,
            self.progress,
            self.options.poll,
            ctx.instance_id,
            action.id,
        )?;

        if outcome == PollOutcome::Failed {
            error!(
                instance_id = ctx.instance_id,
                action_id = action.id,
                "Snapshot action failed, skipping cleanup"
            );
            return Ok(JobOutcome::Failed);
        }

        self.cleanup(provider, ctx, report)?;
        Ok(JobOutcome::Succeeded)
    }

    fn cleanup(
        &self,
        provider: &dyn CloudProvider,
        ctx: &JobContext,
        report: &mut JobReport,
    ) -> Result<()> {
        let catalog = provider.list_snapshots()?;
        let valid = select_valid(&catalog, ctx.instance_id, &self.naming);
        let plan = RetentionPlan::new(&valid, ctx.keep);
        report.planned = plan.delete.iter().map(|s| s.id).collect();

        info!(
            instance_id = ctx.instance_id,
            valid = valid.len(),
            keep = ctx.keep,
            expired = plan.delete.len(),
            "Applying retention"
        );

        for snapshot in plan.delete {
            match provider.delete_snapshot(snapshot.id) {
                Ok(true) => {
                    info!(snapshot_id = snapshot.id, description = %snapshot.description, "Deleted snapshot");
                    report.deleted.push(snapshot.id);
                }
                Ok(false) => {
                    warn!(snapshot_id = snapshot.id, "Provider refused to delete snapshot");
                    report.failed_deletions.push(snapshot.id);
                }
                Err(e) => {
                    warn!(snapshot_id = snapshot.id, error = %e, "Failed to delete snapshot");
                    report.failed_deletions.push(snapshot.id);
                }
            }
        }
        Ok(())
    }

    fn plan_only(&self, provider: &dyn CloudProvider, ctx: &JobContext) -> Result<JobReport> {
        let catalog = provider.list_snapshots()?;
        let valid = select_valid(&catalog, ctx.instance_id, &self.naming);
        let plan = RetentionPlan::new(&valid, ctx.keep);

        let mut report = JobReport::new(JobOutcome::Succeeded);
        report.snapshot_description = Some(self.naming.describe(ctx.instance_id, Utc::now()));
        report.planned = plan.delete.iter().map(|s| s.id).collect();

        info!(
            instance_id = ctx.instance_id,
            description = report.snapshot_description.as_deref().unwrap_or_default(),
            "Dry run: would create snapshot"
        );
        for snapshot in plan.delete {
            info!(snapshot_id = snapshot.id, created = %snapshot.created, "Dry run: would delete snapshot");
        }
        Ok(report)
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Start,
    Success,
    Failure,
}

/// Sends a ping if a heartbeat is configured. Failures are only logged.
fn ping(heartbeat: Option<&dyn Heartbeat>, signal: Signal) {
    let Some(heartbeat) = heartbeat else {
        return;
    };
    let result = match signal {
        Signal::Start => heartbeat.start(),
        Signal::Success => heartbeat.report_success(),
        Signal::Failure => heartbeat.report_failure(),
    };
    if let Err(e) = result {
        warn!(?signal, error = %e, "Heartbeat ping failed");
    }
}
