//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data | `~/Library/Application Support/pantry/` | `~/.local/share/pantry/` |
//! | Config | `~/Library/Application Support/pantry/` | `~/.config/pantry/` |
//!
//! Overrides for tests and custom deployments:
//! - `PANTRY_DATA_DIR` overrides [`data_dir`]
//! - `PANTRY_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root, holding the catalog seed file.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("PANTRY_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("pantry"))
        .unwrap_or_else(|| PathBuf::from("/tmp/pantry-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("PANTRY_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("pantry"))
        .unwrap_or_else(|| PathBuf::from("/tmp/pantry-config"))
}

/// Main config file (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Catalog seed used when the config names none (`data_dir()/catalog.json`).
#[must_use]
pub fn default_catalog_file() -> PathBuf {
    data_dir().join("catalog.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_their_dirs() {
        assert!(config_file().starts_with(config_dir()));
        assert!(config_file().ends_with("config.toml"));
        assert!(default_catalog_file().starts_with(data_dir()));
    }
}
