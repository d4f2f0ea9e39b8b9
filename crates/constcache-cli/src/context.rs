//! Store and registry setup shared by every command.

use anyhow::{Context as _, Result};
use constcache_core::{
    CacheConfig, CacheRegistry, EntityDescriptor, FixtureSet, MemoryStore,
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// The in-memory store and the cache registry reading from it.
#[derive(Debug)]
pub struct Context {
    /// Backing store loaded from fixtures
    pub store: Arc<MemoryStore>,
    /// Cache registry over `store`
    pub registry: CacheRegistry,
}

impl Context {
    /// Load fixtures and entity config, then register every table.
    ///
    /// Configured entities are registered first. Each fixture table that
    /// no configured entity already uses as its name is registered under
    /// the table name with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture or config file cannot be read or
    /// parsed, or if the config registers an entity twice.
    pub fn build(fixtures: Option<&Path>, config: Option<&Path>) -> Result<Self> {
        let fixtures = match fixtures {
            Some(path) => FixtureSet::load(path)
                .with_context(|| format!("Failed to load fixtures from {}", path.display()))?,
            None => FixtureSet::new(),
        };
        let store = Arc::new(MemoryStore::from_fixtures(&fixtures));
        let registry = CacheRegistry::new(store.clone());

        let config = CacheConfig::discover(config).context("Failed to load entity config")?;
        let configured = config.apply(&registry)?;

        let mut implicit = 0_usize;
        for (table, _) in fixtures.tables() {
            if !registry.is_registered(table) {
                registry.register(EntityDescriptor::new(table).table(table))?;
                implicit += 1;
            }
        }
        debug!(
            configured,
            implicit,
            tables = fixtures.len(),
            "registered cached entities"
        );

        store.subscribe(registry.reset_hook());
        Ok(Self { store, registry })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const FIXTURES: &str = r#"
        [pies]
        rows = [
            { id = 1, filling = "Tasty beef steak" },
            { id = 2, filling = "Mince" },
        ]
    "#;

    #[tokio::test]
    async fn test_fixture_tables_are_registered_by_name() {
        let dir = TempDir::new().unwrap();
        let fixtures = dir.path().join("pies.toml");
        let config = dir.path().join("constcache.toml");
        fs::write(&fixtures, FIXTURES).unwrap();
        fs::write(
            &config,
            "[[entity]]\nname = 'NamedPie'\ntable = 'pies'\n[entity.options]\nname = 'filling'\n",
        )
        .unwrap();

        let ctx = Context::build(Some(&fixtures), Some(&config)).unwrap();

        assert_eq!(ctx.registry.entities(), ["NamedPie", "pies"]);
        assert_eq!(ctx.registry.all("pies").await.unwrap().len(), 2);
        assert!(ctx.registry.has_named_accessor("NamedPie", "mince").await.unwrap());
    }

    #[test]
    fn test_missing_fixture_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Context::build(Some(&dir.path().join("nope.toml")), None).unwrap_err();
        assert!(err.to_string().contains("Failed to load fixtures"));
    }
}
