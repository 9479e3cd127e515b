//! Path utilities for tabwarden data directories

use std::path::PathBuf;
use std::sync::OnceLock;

/// Global storage for custom data directory path
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the data directory with an optional custom path.
/// Must be called early in main() before any other path functions are used.
/// If custom_path is None, uses the default ~/.tabwarden location.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    if DATA_DIR.set(path.clone()).is_err() {
        let existing = DATA_DIR
            .get()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        tracing::debug!(
            path = %path.display(),
            existing = %existing,
            "Data directory already initialized"
        );
    }
}

/// Get the default data directory path (~/.tabwarden)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".tabwarden"))
        .unwrap_or_else(|| PathBuf::from(".tabwarden"))
}

/// Get the base data directory.
/// Returns the custom path if set via init_data_dir(), otherwise ~/.tabwarden
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// Get the database file path (~/.tabwarden/tabwarden.db)
pub fn database_path() -> PathBuf {
    data_dir().join("tabwarden.db")
}

/// Get the logs directory (~/.tabwarden/logs)
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Get the default log file path (~/.tabwarden/logs/tabwarden.log)
pub fn log_file_path() -> PathBuf {
    logs_dir().join("tabwarden.log")
}

/// Get the config file path (~/.tabwarden/config.toml)
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Get the default browser state file used by the CLI (~/.tabwarden/browser.json)
pub fn browser_state_path() -> PathBuf {
    data_dir().join("browser.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_share_data_dir() {
        let base = data_dir();
        assert_eq!(database_path(), base.join("tabwarden.db"));
        assert_eq!(log_file_path(), base.join("logs").join("tabwarden.log"));
        assert_eq!(config_path(), base.join("config.toml"));
        assert!(browser_state_path().starts_with(&base));
    }
}
