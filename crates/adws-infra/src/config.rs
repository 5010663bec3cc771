//! Global configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.adws/` by default,
//! overridable via `ADWS_DATA_DIR`) and deserializes it into
//! [`GlobalConfig`]. Falls back to defaults when the file is missing or
//! malformed.

use std::path::{Path, PathBuf};

use adws_types::config::GlobalConfig;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "ADWS_DATA_DIR";

/// Resolve the ADWS data directory.
///
/// `ADWS_DATA_DIR` wins when set; otherwise `~/.adws`. Falls back to
/// `.adws` in the working directory when no home directory can be
/// determined.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    match dirs::home_dir() {
        Some(home) => home.join(".adws"),
        None => PathBuf::from(".adws"),
    }
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - Missing file: returns [`GlobalConfig::default()`].
/// - Unreadable or unparseable file: logs a warning and returns the default.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config.toml at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}
