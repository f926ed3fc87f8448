// Wiring from parsed arguments to a snapshot run

use anyhow::Result;
use snap_config::{expand_path, AppConfig, ConfigLoader};
use snap_core::{snap_info, snap_success, snap_warning};
use snap_heartbeat::ConfiguredHeartbeats;
use snap_provider::{ActionProgressBar, NoProgress, ProgressSink, ProviderRegistry};
use snap_snapshot::{JobContext, JobOptions, JobOutcome, JobReport, SnapshotJob};
use tracing::{debug, info_span};

use crate::cli::Args;

/// Loads configuration and runs the job described by `args`.
pub fn execute_command(args: &Args) -> Result<JobReport> {
    let config = load_config(args)?;
    debug!(source = ?config.source_path, "Configuration loaded");

    let registry = ProviderRegistry::from_config(&config)?;
    let heartbeats = ConfiguredHeartbeats::from_config(&config);
    let options = JobOptions {
        dry_run: args.dry_run,
        ..JobOptions::from_config(&config)
    };
    let ctx = JobContext::new(args.instance_id, &args.provider, args.keep);

    let span = info_span!(
        "job",
        instance_id = ctx.instance_id,
        provider = %ctx.provider,
        keep = ctx.keep
    );
    let _entered = span.enter();

    let bar;
    let progress: &dyn ProgressSink = if args.no_progress || args.dry_run {
        &NoProgress
    } else {
        bar = ActionProgressBar::new("creating snapshot");
        &bar
    };

    let report = SnapshotJob::new(&registry, &heartbeats)
        .with_progress(progress)
        .with_options(options)
        .run(&ctx)?;

    print_summary(&ctx, &report, args.dry_run);
    Ok(report)
}

/// Names of the built-in providers, sorted.
pub fn supported_providers() -> Vec<String> {
    ProviderRegistry::from_config(&AppConfig::default())
        .map(|registry| registry.names().into_iter().map(str::to_string).collect())
        .unwrap_or_default()
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::with_path(expand_path(&path.to_string_lossy())),
        None => ConfigLoader::new(),
    };
    loader.load_with(|config| {
        if let Some(secs) = args.poll_interval {
            config.polling.interval_secs = secs;
        }
        if let Some(max) = args.max_attempts {
            config.polling.max_attempts = Some(max);
        }
    })
}

fn print_summary(ctx: &JobContext, report: &JobReport, dry_run: bool) {
    if dry_run {
        snap_info!(
            "Dry run for instance {}: would create {}",
            ctx.instance_id,
            report.snapshot_description.as_deref().unwrap_or("a snapshot")
        );
        if report.planned.is_empty() {
            snap_info!("Nothing to prune (keeping {})", ctx.keep);
        } else {
            snap_info!("Would delete {} snapshot(s): {:?}", report.planned.len(), report.planned);
        }
        return;
    }

    match report.outcome {
        JobOutcome::Succeeded => {
            if let Some(description) = &report.snapshot_description {
                snap_success!("Snapshot {} created", description);
            }
            snap_info!(
                "Deleted {} expired snapshot(s), keeping {}",
                report.deleted.len(),
                ctx.keep
            );
            if !report.failed_deletions.is_empty() {
                snap_warning!(
                    "Could not delete snapshot(s) {:?}",
                    report.failed_deletions
                );
            }
        }
        JobOutcome::SkippedLocked => {
            snap_warning!("A previous run is still active; nothing was done");
        }
        JobOutcome::Failed => {}
    }
}
