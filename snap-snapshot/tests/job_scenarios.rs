//! End-to-end job runs against the in-memory provider and heartbeat.

use chrono::{TimeZone, Utc};
use snap_core::SnapError;
use snap_heartbeat::recording::{RecordingHeartbeat, Signal};
use snap_heartbeat::{CheckStatus, NoHeartbeat};
use snap_provider::mock::MockProvider;
use snap_provider::{ActionStatus, ImageType, ProviderRegistry, Snapshot};
use snap_snapshot::{
    select_valid, to_delete, JobContext, JobOptions, JobOutcome, NamingScheme, PollSettings,
    SnapshotJob,
};
use std::time::Duration;

const INSTANCE: u64 = 10;
const ACTION: u64 = 42;

fn job_snapshot(id: u64, instance: u64, day: u32) -> Snapshot {
    Snapshot {
        id,
        description: format!("auto-65f1c2a3b4d5e-{instance}-{day:02}-03-2024_03-00-00"),
        image_type: ImageType::Snapshot,
        created_from: Some(instance),
        created: Utc.with_ymd_and_hms(2024, 3, day, 3, 0, 0).unwrap(),
    }
}

fn manual_snapshot(id: u64, day: u32) -> Snapshot {
    Snapshot {
        description: "before kernel upgrade".to_string(),
        ..job_snapshot(id, INSTANCE, day)
    }
}

fn options() -> JobOptions {
    JobOptions {
        poll: PollSettings {
            interval: Duration::ZERO,
            max_attempts: None,
        },
        ..Default::default()
    }
}

fn registry_with(provider: &MockProvider) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(Box::new(provider.clone()));
    registry
}

fn succeeding() -> Vec<ActionStatus> {
    vec![ActionStatus::Running, ActionStatus::Running, ActionStatus::Success]
}

fn locked_check() -> CheckStatus {
    let now = Utc::now();
    CheckStatus {
        name: "snapshot".into(),
        tags: String::new(),
        desc: String::new(),
        grace: 3600,
        n_pings: 12,
        status: "started".into(),
        last_ping: Some(now - chrono::Duration::minutes(5)),
        next_ping: Some(now + chrono::Duration::hours(1)),
    }
}

#[test]
fn test_retention_keeps_three_of_five() {
    let catalog: Vec<Snapshot> = (1..=5).map(|day| job_snapshot(day as u64, INSTANCE, day)).collect();
    let valid = select_valid(&catalog, INSTANCE, &NamingScheme::new());
    let ids: Vec<u64> = to_delete(&valid, 3).iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_successful_run_prunes_oldest_snapshots() {
    // Four existing job snapshots plus the one this run creates.
    let provider = MockProvider::new()
        .with_catalog(vec![
            job_snapshot(104, INSTANCE, 4),
            job_snapshot(101, INSTANCE, 1),
            manual_snapshot(200, 2),
            job_snapshot(103, INSTANCE, 3),
            job_snapshot(300, 11, 1),
            job_snapshot(102, INSTANCE, 2),
        ])
        .with_action(ACTION, succeeding());
    let heartbeat = RecordingHeartbeat::new();
    let registry = registry_with(&provider);

    let report = SnapshotJob::new(&registry, &heartbeat)
        .with_options(options())
        .run(&JobContext::new(INSTANCE, "mock", 3))
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Succeeded);
    assert_eq!(report.deleted, vec![101, 102]);
    assert!(report.failed_deletions.is_empty());
    assert_eq!(provider.deleted(), vec![101, 102]);
    assert_eq!(provider.status_queries(), 3);
    assert_eq!(heartbeat.signals(), vec![Signal::Start, Signal::Success]);

    let created = provider.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, INSTANCE);
    assert_eq!(report.snapshot_description.as_deref(), Some(created[0].1.as_str()));
    assert!(NamingScheme::new().matches(&created[0].1));
}

#[test]
fn test_running_running_success_reports_success_and_cleans_up() {
    let provider = MockProvider::new().with_action(ACTION, succeeding());
    let heartbeat = RecordingHeartbeat::new();
    let registry = registry_with(&provider);

    let report = SnapshotJob::new(&registry, &heartbeat)
        .with_options(options())
        .run(&JobContext::new(INSTANCE, "mock", 3))
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Succeeded);
    assert_eq!(provider.status_queries(), 3);
    assert_eq!(provider.list_calls(), 1);
    assert_eq!(heartbeat.signals(), vec![Signal::Start, Signal::Success]);
}

#[test]
fn test_failed_action_skips_cleanup() {
    let provider = MockProvider::new()
        .with_catalog((1..=5).map(|day| job_snapshot(day as u64, INSTANCE, day)).collect())
        .with_action(ACTION, vec![ActionStatus::Running, ActionStatus::Error]);
    let heartbeat = RecordingHeartbeat::new();
    let registry = registry_with(&provider);

    let report = SnapshotJob::new(&registry, &heartbeat)
        .with_options(options())
        .run(&JobContext::new(INSTANCE, "mock", 1))
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Failed);
    assert!(!report.outcome.is_success());
    assert_eq!(provider.list_calls(), 0);
    assert!(provider.delete_attempts().is_empty());
    assert_eq!(heartbeat.signals(), vec![Signal::Start, Signal::Failure]);
}

#[test]
fn test_no_valid_snapshots_means_no_deletions() {
    let provider = MockProvider::new()
        .with_catalog(vec![manual_snapshot(200, 2), job_snapshot(300, 11, 1)])
        .with_action(ACTION, succeeding());
    let heartbeat = RecordingHeartbeat::new();
    let registry = registry_with(&provider);

    let report = SnapshotJob::new(&registry, &heartbeat)
        .with_options(options())
        .run(&JobContext::new(INSTANCE, "mock", 3))
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Succeeded);
    assert!(report.planned.is_empty());
    assert!(provider.delete_attempts().is_empty());
}

#[test]
fn test_failed_deletion_is_a_warning_not_a_failure() {
    let provider = MockProvider::new()
        .with_catalog((1..=5).map(|day| job_snapshot(day as u64, INSTANCE, day)).collect())
        .with_action(ACTION, succeeding())
        .refusing_delete(2);
    let heartbeat = RecordingHeartbeat::new();
    let registry = registry_with(&provider);

    // Six valid after creation, keep three: the three oldest go.
    let report = SnapshotJob::new(&registry, &heartbeat)
        .with_options(options())
        .run(&JobContext::new(INSTANCE, "mock", 3))
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Succeeded);
    assert_eq!(report.planned, vec![1, 2, 3]);
    assert_eq!(report.deleted, vec![1, 3]);
    assert_eq!(report.failed_deletions, vec![2]);
    assert_eq!(provider.delete_attempts(), vec![1, 2, 3]);
    assert_eq!(heartbeat.signals(), vec![Signal::Start, Signal::Success]);
}

#[test]
fn test_erroring_deletion_does_not_stop_the_loop() {
    let provider = MockProvider::new()
        .with_catalog((1..=4).map(|day| job_snapshot(day as u64, INSTANCE, day)).collect())
        .with_action(ACTION, succeeding())
        .erroring_delete(1);
    let registry = registry_with(&provider);

    let report = SnapshotJob::new(&registry, &NoHeartbeat)
        .with_options(options())
        .run(&JobContext::new(INSTANCE, "mock", 2))
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Succeeded);
    assert_eq!(report.failed_deletions, vec![1]);
    assert_eq!(report.deleted, vec![2, 3]);
}

#[test]
fn test_missing_action_is_a_failed_run() {
    let provider = MockProvider::new();
    let heartbeat = RecordingHeartbeat::new();
    let registry = registry_with(&provider);

    let report = SnapshotJob::new(&registry, &heartbeat)
        .with_options(options())
        .run(&JobContext::new(INSTANCE, "mock", 3))
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Failed);
    assert_eq!(provider.created().len(), 1);
    assert_eq!(provider.status_queries(), 0);
    assert_eq!(provider.list_calls(), 0);
    assert_eq!(heartbeat.signals(), vec![Signal::Start, Signal::Failure]);
}

#[test]
fn test_unexpected_status_aborts_with_failure_ping() {
    let provider = MockProvider::new().with_action(
        ACTION,
        vec![ActionStatus::Running, ActionStatus::Unknown("paused".into())],
    );
    let heartbeat = RecordingHeartbeat::new();
    let registry = registry_with(&provider);

    let result = SnapshotJob::new(&registry, &heartbeat)
        .with_options(options())
        .run(&JobContext::new(INSTANCE, "mock", 3));

    assert!(matches!(
        result,
        Err(SnapError::UnexpectedActionStatus { action_id: ACTION, .. })
    ));
    assert_eq!(provider.list_calls(), 0);
    assert_eq!(heartbeat.signals(), vec![Signal::Start, Signal::Failure]);
}

#[test]
fn test_bounded_polling_times_out() {
    let provider = MockProvider::new().with_action(ACTION, vec![ActionStatus::Running; 5]);
    let heartbeat = RecordingHeartbeat::new();
    let registry = registry_with(&provider);
    let options = JobOptions {
        poll: PollSettings {
            interval: Duration::ZERO,
            max_attempts: Some(2),
        },
        ..Default::default()
    };

    let result = SnapshotJob::new(&registry, &heartbeat)
        .with_options(options)
        .run(&JobContext::new(INSTANCE, "mock", 3));

    assert!(matches!(result, Err(SnapError::PollTimeout { attempts: 2, .. })));
    assert_eq!(heartbeat.signals(), vec![Signal::Start, Signal::Failure]);
}

#[test]
fn test_unknown_provider_fails_before_any_call() {
    let provider = MockProvider::new().with_action(ACTION, succeeding());
    let heartbeat = RecordingHeartbeat::new();
    let registry = registry_with(&provider);

    let result = SnapshotJob::new(&registry, &heartbeat)
        .with_options(options())
        .run(&JobContext::new(INSTANCE, "ovh", 3));

    match result {
        Err(SnapError::UnknownProvider(name)) => assert_eq!(name, "ovh"),
        other => panic!("expected unknown provider, got {other:?}"),
    }
    assert!(heartbeat.signals().is_empty());
    assert_eq!(heartbeat.check_fetches(), 0);
    assert!(provider.created().is_empty());
}

#[test]
fn test_unready_provider_fails_before_pinging() {
    let provider = MockProvider::new().not_ready();
    let heartbeat = RecordingHeartbeat::new();
    let registry = registry_with(&provider);

    let result = SnapshotJob::new(&registry, &heartbeat)
        .with_options(options())
        .run(&JobContext::new(INSTANCE, "MOCK", 3));

    assert!(matches!(result, Err(SnapError::Config(_))));
    assert!(heartbeat.signals().is_empty());
}

#[test]
fn test_locked_run_is_skipped_when_guard_enabled() {
    let provider = MockProvider::new().with_action(ACTION, succeeding());
    let heartbeat = RecordingHeartbeat::new().with_check(locked_check());
    let registry = registry_with(&provider);

    let report = SnapshotJob::new(&registry, &heartbeat)
        .with_options(JobOptions {
            skip_when_locked: true,
            ..options()
        })
        .run(&JobContext::new(INSTANCE, "mock", 3))
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::SkippedLocked);
    assert!(report.outcome.is_success());
    assert!(provider.created().is_empty());
    assert!(heartbeat.signals().is_empty());
}

#[test]
fn test_lock_is_ignored_when_guard_disabled() {
    let provider = MockProvider::new().with_action(ACTION, succeeding());
    let heartbeat = RecordingHeartbeat::new().with_check(locked_check());
    let registry = registry_with(&provider);

    let report = SnapshotJob::new(&registry, &heartbeat)
        .with_options(options())
        .run(&JobContext::new(INSTANCE, "mock", 3))
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Succeeded);
    assert_eq!(heartbeat.check_fetches(), 0);
}

#[test]
fn test_unreadable_lock_lets_the_run_proceed() {
    let provider = MockProvider::new().with_action(ACTION, succeeding());
    let heartbeat = RecordingHeartbeat::new().failing_check();
    let registry = registry_with(&provider);

    let report = SnapshotJob::new(&registry, &heartbeat)
        .with_options(JobOptions {
            skip_when_locked: true,
            ..options()
        })
        .run(&JobContext::new(INSTANCE, "mock", 3))
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Succeeded);
    assert_eq!(heartbeat.check_fetches(), 1);
    assert_eq!(heartbeat.signals(), vec![Signal::Start, Signal::Success]);
}

#[test]
fn test_failing_pings_do_not_mask_the_outcome() {
    let provider = MockProvider::new().with_action(ACTION, succeeding());
    let heartbeat = RecordingHeartbeat::new().failing_pings();
    let registry = registry_with(&provider);

    let report = SnapshotJob::new(&registry, &heartbeat)
        .with_options(options())
        .run(&JobContext::new(INSTANCE, "mock", 3))
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Succeeded);
    assert_eq!(heartbeat.signals(), vec![Signal::Start, Signal::Success]);
}

#[test]
fn test_dry_run_changes_nothing() {
    let provider = MockProvider::new()
        .with_catalog((1..=5).map(|day| job_snapshot(day as u64, INSTANCE, day)).collect())
        .with_action(ACTION, succeeding());
    let heartbeat = RecordingHeartbeat::new();
    let registry = registry_with(&provider);

    let report = SnapshotJob::new(&registry, &heartbeat)
        .with_options(JobOptions {
            dry_run: true,
            ..options()
        })
        .run(&JobContext::new(INSTANCE, "mock", 3))
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Succeeded);
    assert_eq!(report.planned, vec![1, 2]);
    assert!(report.deleted.is_empty());
    assert!(provider.created().is_empty());
    assert!(provider.delete_attempts().is_empty());
    assert!(heartbeat.signals().is_empty());
}
