//! Instance snapshot job library
//!
//! Creates a snapshot, waits for the provider action to finish and prunes
//! the instance's older job snapshots down to a retention count.

pub mod filter;
pub mod job;
pub mod naming;
pub mod poller;
pub mod retention;

// Re-export key types
pub use filter::select_valid;
pub use job::{JobContext, JobOptions, JobOutcome, JobReport, SnapshotJob};
pub use naming::{NamingScheme, SNAPSHOT_NAME_PATTERN};
pub use poller::{poll_to_completion, ActionPoller, PollOutcome, PollSettings, PollStep};
pub use retention::{to_delete, RetentionPlan};
