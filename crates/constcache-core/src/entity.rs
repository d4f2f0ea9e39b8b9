//! Entity descriptors and registration options.
//!
//! An [`EntityDescriptor`] identifies one cacheable collection: the name used
//! in lookups and error messages, the backing table, its primary-key field and
//! the [`EntityOptions`] controlling named-accessor derivation. Several
//! entities may share a table, each with its own cache.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Primary-key field used when neither the descriptor nor the store names one.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Options accepted at registration time.
///
/// ```rust
/// use constcache_core::EntityOptions;
///
/// let options = EntityOptions::from_pairs([("name", "filling"), ("name_suffix", "_pie")])?;
/// assert_eq!(options.name_field.as_deref(), Some("filling"));
///
/// assert!(EntityOptions::from_pairs([("nmae", "filling")]).is_err());
/// # Ok::<(), constcache_core::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityOptions {
    /// Field whose value is turned into an accessor name.
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub name_field: Option<String>,
    /// Prepended to every derived accessor name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    /// Appended to every derived accessor name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_suffix: Option<String>,
}

impl EntityOptions {
    /// Option keys understood by [`EntityOptions::from_pairs`].
    pub const KNOWN_KEYS: &'static [&'static str] =
        &["name", "name_field", "name_prefix", "name_suffix"];

    /// Options deriving accessors from `field`.
    pub fn named(field: impl Into<String>) -> Self {
        Self {
            name_field: Some(field.into()),
            ..Self::default()
        }
    }

    /// Set the accessor name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    /// Set the accessor name suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.name_suffix = Some(suffix.into());
        self
    }

    /// Build options from loose key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first unrecognized key.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref() {
                "name" | "name_field" => options.name_field = Some(value),
                "name_prefix" => options.name_prefix = Some(value),
                "name_suffix" => options.name_suffix = Some(value),
                other => {
                    return Err(Error::Config(format!(
                        "Unknown key: {other}. Valid keys are: {}",
                        Self::KNOWN_KEYS.join(", ")
                    )));
                },
            }
        }
        Ok(options)
    }
}

/// Identifies one cacheable collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    name: String,
    table: String,
    primary_key: Option<String>,
    options: EntityOptions,
}

impl EntityDescriptor {
    /// Descriptor whose table has the same name as the entity.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            primary_key: None,
            options: EntityOptions::default(),
        }
    }

    /// Read from a differently named table.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Use an explicit primary-key field instead of asking the store.
    #[must_use]
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    /// Attach registration options.
    #[must_use]
    pub fn options(mut self, options: EntityOptions) -> Self {
        self.options = options;
        self
    }

    /// Entity identifier, used in lookups and error messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing table.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Primary-key field.
    #[must_use]
    pub fn primary_key_field(&self) -> &str {
        self.primary_key.as_deref().unwrap_or(DEFAULT_PRIMARY_KEY)
    }

    /// Whether the primary key was named explicitly.
    #[must_use]
    pub const fn has_explicit_primary_key(&self) -> bool {
        self.primary_key.is_some()
    }

    /// Registration options.
    #[must_use]
    pub const fn entity_options(&self) -> &EntityOptions {
        &self.options
    }
}
