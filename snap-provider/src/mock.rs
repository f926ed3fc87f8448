//! Scripted in-memory provider for tests.

use crate::models::{Action, ActionStatus, ImageType, Snapshot};
use crate::CloudProvider;
use chrono::Utc;
use snap_core::{Result, SnapError};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// First id handed out to snapshots created through the mock.
const CREATED_ID_BASE: u64 = 900_000;

#[derive(Debug, Default)]
struct MockState {
    catalog: Vec<Snapshot>,
    action_id: Option<u64>,
    statuses: VecDeque<ActionStatus>,
    refused_deletes: HashSet<u64>,
    erroring_deletes: HashSet<u64>,
    not_ready: bool,
    pending: Option<Snapshot>,

    created: Vec<(u64, String)>,
    status_queries: usize,
    list_calls: usize,
    delete_attempts: Vec<u64>,
    deleted: Vec<u64>,
}

/// Provider double whose responses are scripted up front.
///
/// Clones share state, so a test can keep a handle for assertions after
/// handing a boxed copy to a registry.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock provider state poisoned")
    }

    /// Images returned by `list_snapshots`.
    pub fn with_catalog(self, catalog: Vec<Snapshot>) -> Self {
        self.state().catalog = catalog;
        self
    }

    /// `create_snapshot` returns action `id`; status queries replay `statuses`.
    pub fn with_action(self, id: u64, statuses: Vec<ActionStatus>) -> Self {
        {
            let mut state = self.state();
            state.action_id = Some(id);
            state.statuses = statuses.into();
        }
        self
    }

    /// Deleting `id` returns `Ok(false)`.
    pub fn refusing_delete(self, id: u64) -> Self {
        self.state().refused_deletes.insert(id);
        self
    }

    /// Deleting `id` returns a network error.
    pub fn erroring_delete(self, id: u64) -> Self {
        self.state().erroring_deletes.insert(id);
        self
    }

    /// `check_ready` fails with a configuration error.
    pub fn not_ready(self) -> Self {
        self.state().not_ready = true;
        self
    }

    pub fn created(&self) -> Vec<(u64, String)> {
        self.state().created.clone()
    }

    pub fn status_queries(&self) -> usize {
        self.state().status_queries
    }

    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    pub fn delete_attempts(&self) -> Vec<u64> {
        self.state().delete_attempts.clone()
    }

    pub fn deleted(&self) -> Vec<u64> {
        self.state().deleted.clone()
    }
}

impl CloudProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn check_ready(&self) -> Result<()> {
        if self.state().not_ready {
            return Err(SnapError::Config("mock provider is not configured".into()));
        }
        Ok(())
    }

    fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let mut state = self.state();
        state.list_calls += 1;
        Ok(state.catalog.clone())
    }

    fn create_snapshot(
        &self,
        instance_id: u64,
        description: &str,
        image_type: &ImageType,
    ) -> Result<Option<Action>> {
        let mut state = self.state();
        state.created.push((instance_id, description.to_string()));

        let Some(action_id) = state.action_id else {
            return Ok(None);
        };

        let snapshot_id = CREATED_ID_BASE + state.created.len() as u64;
        state.pending = Some(Snapshot {
            id: snapshot_id,
            description: description.to_string(),
            image_type: image_type.clone(),
            created_from: Some(instance_id),
            created: Utc::now(),
        });

        Ok(Some(Action::new(action_id, ActionStatus::Running, 0)))
    }

    fn get_server_action(&self, _instance_id: u64, action_id: u64) -> Result<Action> {
        let mut state = self.state();
        state.status_queries += 1;

        let status = state.statuses.pop_front().ok_or_else(|| {
            SnapError::Provider(format!("no scripted status left for action #{action_id}"))
        })?;

        let progress = match status {
            ActionStatus::Success => {
                // The finished image becomes visible in the catalog.
                if let Some(snapshot) = state.pending.take() {
                    state.catalog.push(snapshot);
                }
                100
            }
            _ => (state.status_queries as u64 * 30).min(90),
        };

        Ok(Action::new(action_id, status, progress))
    }

    fn delete_snapshot(&self, snapshot_id: u64) -> Result<bool> {
        let mut state = self.state();
        state.delete_attempts.push(snapshot_id);

        if state.erroring_deletes.contains(&snapshot_id) {
            return Err(SnapError::Network(format!(
                "connection reset while deleting image {snapshot_id}"
            )));
        }
        if state.refused_deletes.contains(&snapshot_id) {
            return Ok(false);
        }

        state.catalog.retain(|s| s.id != snapshot_id);
        state.deleted.push(snapshot_id);
        Ok(true)
    }
}
