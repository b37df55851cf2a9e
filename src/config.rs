//! Configuration types for the pantry service.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pantry_search::{AggregatorConfig, HttpStore, SourceKind};
use serde::{Deserialize, Serialize};

use crate::error::{PantryError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PantryConfig {
    /// Aggregator tuning: per-source limit and timeout, cache, circuit breaker.
    pub search: AggregatorConfig,
    /// Interactive query session settings.
    pub session: SessionConfig,
    /// Where each source's records come from.
    pub backends: BackendConfig,
}

/// Query session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period after the last keystroke before a query runs.
    pub debounce_ms: u64,
    /// Sources a new session searches until the caller toggles them.
    pub default_sources: Vec<SourceKind>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            default_sources: SourceKind::all().to_vec(),
        }
    }
}

impl SessionConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Backend wiring.
///
/// A source with an entry in `endpoints` is served over HTTP; otherwise it
/// is served from the catalog seed file, if one is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// JSON catalog seed file (None = `pantry_dirs::default_catalog_file()` if present).
    pub catalog: Option<PathBuf>,
    /// User-Agent for HTTP backends (None = crate default).
    pub user_agent: Option<String>,
    /// JSON search endpoint per source.
    pub endpoints: BTreeMap<SourceKind, String>,
}

impl PantryConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| PantryError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PantryError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path (see [`crate::pantry_dirs::config_file`]).
    pub fn default_config_path() -> PathBuf {
        crate::pantry_dirs::config_file()
    }

    /// Load the config at `path` if it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "no config file; using defaults");
            Ok(Self::default())
        }
    }

    /// Validates this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PantryError::Aggregation`] for an invalid search section and
    /// [`PantryError::Config`] for a zero debounce or an unparseable endpoint.
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        if self.session.debounce_ms == 0 {
            return Err(PantryError::Config(
                "session.debounce_ms must be greater than 0".into(),
            ));
        }
        for (kind, endpoint) in &self.backends.endpoints {
            HttpStore::parse_endpoint(endpoint)
                .map_err(|e| PantryError::Config(format!("backends.endpoints.{kind}: {e}")))?;
        }
        Ok(())
    }
}
