//! In-memory heartbeat that records every signal, for tests.

use crate::{CheckStatus, Heartbeat, HeartbeatResolver};
use snap_core::{Result, SnapError};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Start,
    Success,
    Failure,
}

#[derive(Debug, Default)]
struct RecordingState {
    signals: Vec<Signal>,
    check: Option<CheckStatus>,
    check_fails: bool,
    pings_fail: bool,
    check_fetches: usize,
}

/// Clones share state, so a test keeps a handle after boxing one.
#[derive(Debug, Clone, Default)]
pub struct RecordingHeartbeat {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingHeartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().expect("recording heartbeat state poisoned")
    }

    pub fn with_check(self, check: CheckStatus) -> Self {
        self.state().check = Some(check);
        self
    }

    /// `fetch_check` returns a transport error.
    pub fn failing_check(self) -> Self {
        self.state().check_fails = true;
        self
    }

    /// Every ping is recorded and then reported as failed.
    pub fn failing_pings(self) -> Self {
        self.state().pings_fail = true;
        self
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.state().signals.clone()
    }

    pub fn check_fetches(&self) -> usize {
        self.state().check_fetches
    }

    fn record(&self, signal: Signal) -> Result<()> {
        let mut state = self.state();
        state.signals.push(signal);
        if state.pings_fail {
            return Err(SnapError::Heartbeat(format!("{signal:?} ping refused")));
        }
        Ok(())
    }
}

impl Heartbeat for RecordingHeartbeat {
    fn start(&self) -> Result<()> {
        self.record(Signal::Start)
    }

    fn report_success(&self) -> Result<()> {
        self.record(Signal::Success)
    }

    fn report_failure(&self) -> Result<()> {
        self.record(Signal::Failure)
    }

    fn fetch_check(&self) -> Result<Option<CheckStatus>> {
        let mut state = self.state();
        state.check_fetches += 1;
        if state.check_fails {
            return Err(SnapError::Network("monitor unreachable".into()));
        }
        Ok(state.check.clone())
    }
}

/// Hands out a shared handle for every provider, so assertions see all runs.
impl HeartbeatResolver for RecordingHeartbeat {
    fn resolve(&self, _provider: &str) -> Result<Option<Box<dyn Heartbeat>>> {
        Ok(Some(Box::new(self.clone())))
    }
}
