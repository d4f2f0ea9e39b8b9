//! Configuration of cached entities.
//!
//! A `constcache.toml` file lists the entities to register:
//!
//! ```toml
//! [[entity]]
//! name = "ConstantNamedPie"
//! table = "pies"
//! primary_key = "id"
//!
//! [entity.options]
//! name = "filling"
//! name_suffix = "_pie"
//! ```
//!
//! ## Location
//!
//! The file is found, in order, from an explicit path, the
//! `CONSTCACHE_CONFIG` environment variable, or the platform config
//! directory:
//! - Linux: `~/.config/constcache/constcache.toml`
//! - macOS: `~/Library/Application Support/dev.outfitter.constcache/constcache.toml`
//! - Windows: `%APPDATA%\outfitter\constcache\config\constcache.toml`
//!
//! A missing file at the platform location means no entities; a missing
//! file named explicitly is an error.

use crate::{CacheRegistry, EntityDescriptor, EntityOptions, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "CONSTCACHE_CONFIG";

/// File name used in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "constcache.toml";

/// One `[[entity]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    /// Entity identifier used in lookups.
    pub name: String,
    /// Backing table; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Primary-key field; asked of the store when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    /// Named-accessor options.
    #[serde(default)]
    pub options: EntityOptions,
}

impl EntityConfig {
    /// Descriptor for registration.
    #[must_use]
    pub fn descriptor(&self) -> EntityDescriptor {
        let mut descriptor = EntityDescriptor::new(&self.name).options(self.options.clone());
        if let Some(table) = &self.table {
            descriptor = descriptor.table(table);
        }
        if let Some(primary_key) = &self.primary_key {
            descriptor = descriptor.primary_key(primary_key);
        }
        descriptor
    }
}

/// Root of `constcache.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Entities to register.
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityConfig>,
}

impl CacheConfig {
    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed,
    /// including unknown option keys.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config {}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed TOML or unknown keys.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Platform default location of the config file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "outfitter", "constcache")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load from an explicit path, `CONSTCACHE_CONFIG`, or the platform
    /// default, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an explicitly named file is missing or
    /// any file found is invalid.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        Self::discover_with(explicit, from_env, Self::default_path())
    }

    fn discover_with(
        explicit: Option<&Path>,
        from_env: Option<PathBuf>,
        default: Option<PathBuf>,
    ) -> Result<Self> {
        if let Some(path) = explicit.map(Path::to_path_buf).or(from_env) {
            tracing::debug!(path = %path.display(), "loading config");
            return Self::load(&path);
        }
        match default {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "loading default config");
                Self::load(&path)
            },
            _ => Ok(Self::default()),
        }
    }

    /// Register every configured entity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an entity is already registered.
    pub fn apply(&self, registry: &CacheRegistry) -> Result<usize> {
        for entity in &self.entities {
            registry.register(entity.descriptor())?;
        }
        Ok(self.entities.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
        [[entity]]
        name = "ConstantPie"
        table = "pies"

        [[entity]]
        name = "ConstantLongNamedPie"
        table = "pies"
        primary_key = "id"

        [entity.options]
        name = "filling"
        name_prefix = "a_"
        name_suffix = "_pie"
    "#;

    #[test]
    fn test_parse_entities() {
        let config = CacheConfig::parse(CONFIG).unwrap();

        assert_eq!(config.entities.len(), 2);
        let long = config.entities[1].descriptor();
        assert_eq!(long.name(), "ConstantLongNamedPie");
        assert_eq!(long.table_name(), "pies");
        assert_eq!(
            long.entity_options(),
            &EntityOptions::named("filling").with_prefix("a_").with_suffix("_pie")
        );
        assert_eq!(config.entities[0].options, EntityOptions::default());
    }

    #[test]
    fn test_unknown_option_key_is_config_error() {
        let err = CacheConfig::parse("[[entity]]\nname = 'Pie'\n[entity.options]\nlabel = 'x'")
            .unwrap_err();
        match err {
            Error::Config(msg) => assert!(msg.contains("label")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_registers_entities() {
        let registry = CacheRegistry::new(Arc::new(MemoryStore::new()));
        let count = CacheConfig::parse(CONFIG).unwrap().apply(&registry).unwrap();

        assert_eq!(count, 2);
        assert_eq!(registry.entities(), ["ConstantLongNamedPie", "ConstantPie"]);
    }

    #[test]
    fn test_discover_precedence() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("explicit.toml");
        let from_env = dir.path().join("env.toml");
        fs::write(&explicit, "[[entity]]\nname = 'A'").unwrap();
        fs::write(&from_env, "[[entity]]\nname = 'B'").unwrap();

        let config =
            CacheConfig::discover_with(Some(&explicit), Some(from_env.clone()), None).unwrap();
        assert_eq!(config.entities[0].name, "A");

        let config = CacheConfig::discover_with(None, Some(from_env), None).unwrap();
        assert_eq!(config.entities[0].name, "B");
    }

    #[test]
    fn test_missing_default_means_no_entities() {
        let dir = TempDir::new().unwrap();
        let config =
            CacheConfig::discover_with(None, None, Some(dir.path().join(CONFIG_FILE_NAME)))
                .unwrap();
        assert!(config.entities.is_empty());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(CacheConfig::discover_with(Some(&missing), None, None).is_err());
    }
}
