//! Configuration for the cloudsnap job.
//!
//! Loads the YAML settings file, applies environment overrides for secrets,
//! and exposes the per-provider monitoring check lookup.

pub mod config;
pub mod loader;
mod paths;


pub use config::{
    AppConfig, HealthchecksSettings, HetznerSettings, HttpSettings, LockSettings,
    PollingSettings, ProvidersConfig,
};
pub use loader::ConfigLoader;
pub use paths::{default_config_path, expand_path};
