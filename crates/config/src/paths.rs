//! Path utilities

use std::path::PathBuf;

/// Data directory (~/.tablechat)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".tablechat"))
        .unwrap_or_else(|| PathBuf::from(".tablechat"))
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Default conversation store location
pub fn store_dir() -> PathBuf {
    data_dir().join("state")
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
