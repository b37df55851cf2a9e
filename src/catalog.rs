//! Backend wiring: which record store serves each source.
//!
//! Sources with a configured HTTP endpoint are served by an [`HttpStore`];
//! the rest come from a JSON catalog seed file loaded into memory:
//!
//! ```json
//! { "recipes": [...], "foods": [...], "news": [...], "users": [...] }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pantry_search::http::build_client;
use pantry_search::{
    AdapterRegistry, FoodAdapter, HttpStore, NewsAdapter, RecipeAdapter, RecordStore, SourceKind,
    UserAdapter,
};
use serde::Deserialize;
use serde_json::Value;

use crate::config::PantryConfig;
use crate::error::{PantryError, Result};

/// Seed records for every in-memory source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub recipes: Vec<Value>,
    pub foods: Vec<Value>,
    pub news: Vec<Value>,
    pub users: Vec<Value>,
}

impl Catalog {
    /// Load a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`PantryError::Io`] if the file cannot be read and
    /// [`PantryError::Catalog`] if it is not a catalog document.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| PantryError::Catalog(format!("{}: {e}", path.display())))
    }

    /// Raw records for `kind`.
    pub fn records(&self, kind: SourceKind) -> &[Value] {
        match kind {
            SourceKind::Recipe => &self.recipes,
            SourceKind::Food => &self.foods,
            SourceKind::News => &self.news,
            SourceKind::User => &self.users,
        }
    }
}

/// The catalog file to load: the configured one, else the default seed if it exists.
fn catalog_path(config: &PantryConfig) -> Option<PathBuf> {
    config.backends.catalog.clone().or_else(|| {
        let default = crate::pantry_dirs::default_catalog_file();
        default.exists().then_some(default)
    })
}

/// Build the adapter registry described by `config`.
///
/// A source with neither an endpoint nor a catalog gets no adapter.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, an endpoint is not a
/// valid URL, or the HTTP client cannot be built.
pub fn build_registry(config: &PantryConfig) -> Result<AdapterRegistry> {
    let catalog = catalog_path(config)
        .map(|path| {
            tracing::info!(path = %path.display(), "loading catalog");
            Catalog::from_file(&path)
        })
        .transpose()?;

    let client = if config.backends.endpoints.is_empty() {
        None
    } else {
        Some(
            build_client(
                config.search.per_source_timeout(),
                config.backends.user_agent.as_deref(),
            )
            .map_err(|e| PantryError::Config(e.to_string()))?,
        )
    };

    let mut registry = AdapterRegistry::new();
    for &kind in SourceKind::all() {
        let endpoint = config.backends.endpoints.get(&kind);
        match (endpoint, &client, &catalog) {
            (Some(endpoint), Some(client), _) => {
                let store = HttpStore::new(client.clone(), endpoint)
                    .map_err(|e| PantryError::Config(format!("backends.endpoints.{kind}: {e}")))?;
                tracing::info!(source = %kind, endpoint = %store.endpoint(), "HTTP backend");
                register_store(&mut registry, kind, Arc::new(store));
            }
            (_, _, Some(catalog)) => {
                let records = catalog.records(kind).to_vec();
                tracing::info!(source = %kind, records = records.len(), "catalog backend");
                register_in_memory(&mut registry, kind, records);
            }
            _ => tracing::debug!(source = %kind, "no backend configured"),
        }
    }
    Ok(registry)
}

fn register_store(registry: &mut AdapterRegistry, kind: SourceKind, store: Arc<dyn RecordStore>) {
    match kind {
        SourceKind::Recipe => registry.register(RecipeAdapter::new(store)),
        SourceKind::Food => registry.register(FoodAdapter::new(store)),
        SourceKind::News => registry.register(NewsAdapter::new(store)),
        SourceKind::User => registry.register(UserAdapter::new(store)),
    };
}

fn register_in_memory(registry: &mut AdapterRegistry, kind: SourceKind, records: Vec<Value>) {
    match kind {
        SourceKind::Recipe => registry.register(RecipeAdapter::in_memory(records)),
        SourceKind::Food => registry.register(FoodAdapter::in_memory(records)),
        SourceKind::News => registry.register(NewsAdapter::in_memory(records)),
        SourceKind::User => registry.register(UserAdapter::in_memory(records)),
    };
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn write_catalog(dir: &Path) -> PathBuf {
        let path = dir.join("catalog.json");
        std::fs::write(
            &path,
            r#"{
                "recipes": [{"id": "r1", "name": "Gà xào sả ớt"}],
                "foods": [{"id": 1, "name": "Gà ta", "calories": 199}]
            }"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::from_file(&write_catalog(dir.path())).unwrap();
        assert_eq!(catalog.records(SourceKind::Recipe).len(), 1);
        assert!(catalog.records(SourceKind::User).is_empty());
    }

    #[test]
    fn malformed_catalog_is_a_catalog_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            Catalog::from_file(&path),
            Err(PantryError::Catalog(_))
        ));
    }

    #[test]
    fn catalog_serves_every_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PantryConfig::default();
        config.backends.catalog = Some(write_catalog(dir.path()));
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.kinds(), SourceKind::all().to_vec());
    }

    #[test]
    fn endpoint_overrides_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PantryConfig::default();
        config.backends.catalog = Some(write_catalog(dir.path()));
        config
            .backends
            .endpoints
            .insert(SourceKind::News, "http://127.0.0.1:9/news".into());
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn invalid_endpoint_is_a_config_error() {
        let mut config = PantryConfig::default();
        config
            .backends
            .endpoints
            .insert(SourceKind::News, "not a url".into());
        assert!(matches!(
            build_registry(&config),
            Err(PantryError::Config(_))
        ));
    }
}
