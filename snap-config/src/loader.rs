// Standard library imports
use std::fs;
use std::path::{Path, PathBuf};

// External crate imports
use anyhow::{bail, Context, Result};
use tracing::debug;

// Internal imports
use crate::config::AppConfig;
use crate::paths::default_config_path;

/// Finds and loads the job configuration.
///
/// An explicit path (from `--config`) must exist. Without one, the default
/// location is tried and a missing file yields the built-in defaults, so the
/// job can run with nothing but environment variables.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    explicit_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit_path: Some(path.into()),
        }
    }

    /// Loads the configuration, applies environment overrides and validates it.
    pub fn load(&self) -> Result<AppConfig> {
        self.load_with(|_| {})
    }

    /// Like [`load`](Self::load), with command-line overrides applied after
    /// the environment and before validation.
    pub fn load_with(&self, overrides: impl FnOnce(&mut AppConfig)) -> Result<AppConfig> {
        let mut config = self.load_without_env()?;
        config.apply_env_overrides();
        overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn load_without_env(&self) -> Result<AppConfig> {
        if let Some(path) = &self.explicit_path {
            if !path.exists() {
                bail!("Configuration file not found: {}", path.display());
            }
            debug!("Loading config from: {}", path.display());
            return self.load_file(path);
        }

        let default_path = default_config_path();
        if default_path.exists() {
            debug!("Loading config from: {}", default_path.display());
            return self.load_file(&default_path);
        }

        debug!(
            "No config file at {}, using defaults",
            default_path.display()
        );
        Ok(AppConfig::default())
    }

    fn load_file(&self, path: &Path) -> Result<AppConfig> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file at {}", path.display()))?;

        // An empty file is a valid, all-defaults configuration.
        let mut config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml_ng::from_str(&contents)
                .with_context(|| format!("Invalid configuration in {}", path.display()))?
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }
}
