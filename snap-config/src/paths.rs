use std::env;
use std::path::PathBuf;

/// Default configuration file location.
/// Priority order:
/// 1. SNAP_CONFIG environment variable
/// 2. <user config dir>/cloudsnap/config.yaml
/// 3. ./config.yaml when no config dir can be determined
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var("SNAP_CONFIG") {
        if !path.is_empty() {
            return expand_path(&path);
        }
    }

    dirs::config_dir()
        .map(|dir| dir.join("cloudsnap").join("config.yaml"))
        .unwrap_or_else(|| PathBuf::from("config.yaml"))
}

/// Expands `~` and environment variables in a user supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}
