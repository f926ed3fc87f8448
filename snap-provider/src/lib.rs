//! Cloud provider abstraction library.
//!
//! Defines the [`CloudProvider`] contract the snapshot job drives, a
//! name-keyed [`ProviderRegistry`] for resolving providers from the command
//! line, and the concrete Hetzner Cloud adapter.

// Standard library
use std::collections::HashMap;

// Internal imports
use snap_config::AppConfig;
use snap_core::{Result, SnapError};

pub mod hetzner;
pub mod models;
pub mod progress;

// When the `test-helpers` feature is enabled, include the mock provider.
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

pub use hetzner::HetznerProvider;
pub use models::{Action, ActionStatus, ImageType, Snapshot};
pub use progress::{ActionProgressBar, NoProgress, ProgressSink};

/// The core trait for all cloud providers.
/// This defines the snapshot lifecycle operations the job relies on.
pub trait CloudProvider {
    /// Get the name of the provider (e.g., "hetzner").
    fn name(&self) -> &'static str;

    /// Whether this provider answers to `name`.
    fn supports(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }

    /// Check that credentials and endpoints are usable before any remote call.
    fn check_ready(&self) -> Result<()> {
        Ok(())
    }

    /// List every snapshot image visible to the account.
    fn list_snapshots(&self) -> Result<Vec<Snapshot>>;

    /// Request a new image of `instance_id`.
    ///
    /// Returns `None` when the provider accepted the call but did not hand back
    /// an action to track, which the job treats as a failed creation.
    fn create_snapshot(
        &self,
        instance_id: u64,
        description: &str,
        image_type: &ImageType,
    ) -> Result<Option<Action>>;

    /// Fetch the current state of an action running on `instance_id`.
    fn get_server_action(&self, instance_id: u64, action_id: u64) -> Result<Action>;

    /// Delete a snapshot image. `Ok(false)` means the provider refused.
    fn delete_snapshot(&self, snapshot_id: u64) -> Result<bool>;
}

/// Providers keyed by lower-cased name.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Box<dyn CloudProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in provider configured from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Box::new(HetznerProvider::new(
            &config.providers.hetzner,
            config.http.timeout(),
        )?));
        Ok(registry)
    }

    /// Add a provider, replacing any previous one with the same name.
    pub fn register(&mut self, provider: Box<dyn CloudProvider>) -> &mut Self {
        self.providers
            .insert(provider.name().to_lowercase(), provider);
        self
    }

    /// Look up a provider by name, ignoring case.
    pub fn resolve(&self, name: &str) -> Result<&dyn CloudProvider> {
        self.providers
            .get(&name.to_lowercase())
            .map(|provider| provider.as_ref())
            .ok_or_else(|| SnapError::UnknownProvider(name.to_string()))
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;

    #[test]
    fn test_resolve_is_case_insensitive() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(MockProvider::new()));

        assert_eq!(registry.resolve("MOCK").unwrap().name(), "mock");
        assert!(registry.resolve("mock").unwrap().supports("Mock"));
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let registry = ProviderRegistry::new();
        match registry.resolve("ovh") {
            Err(SnapError::UnknownProvider(name)) => assert_eq!(name, "ovh"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("empty registry resolved a provider"),
        }
    }

    #[test]
    fn test_from_config_registers_hetzner() {
        let registry = ProviderRegistry::from_config(&AppConfig::default()).unwrap();
        assert_eq!(registry.names(), vec!["hetzner"]);
    }
}
