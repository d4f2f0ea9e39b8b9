//! Named accessors derived from a designated field.
//!
//! For an entity registered with a name field, every cached record whose
//! field value normalizes to a non-blank identifier is reachable by that
//! identifier (with the configured prefix and suffix). `"Tasty beef steak"`
//! becomes `tasty_beef_steak`.

use crate::{EntityOptions, Record, Value};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

/// Runs of non-word characters.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// Normalize a field value into an identifier fragment.
///
/// Lowercases, collapses every run of non-word characters to `_` and trims
/// leading and trailing underscores. May return an empty string.
///
/// ```rust
/// use constcache_core::accessor::normalize_name;
///
/// assert_eq!(normalize_name("Tasty mushrooms with tarragon"), "tasty_mushrooms_with_tarragon");
/// assert_eq!(normalize_name("  --  "), "");
/// ```
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    NON_WORD_RE
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Accessor name for `value` under `options`, or `None` if the value is
/// null or normalizes to nothing.
#[must_use]
pub fn accessor_name(value: &Value, options: &EntityOptions) -> Option<String> {
    let raw = match value {
        Value::Null => return None,
        Value::Text(text) => text.clone(),
        other => other.to_string(),
    };
    let normalized = normalize_name(&raw);
    if normalized.is_empty() {
        return None;
    }
    Some(format!(
        "{}{normalized}{}",
        options.name_prefix.as_deref().unwrap_or_default(),
        options.name_suffix.as_deref().unwrap_or_default()
    ))
}

/// Name-to-record mapping for one snapshot.
#[derive(Debug, Default)]
pub struct AccessorTable {
    by_name: HashMap<String, Arc<Record>>,
    names: Vec<String>,
}

impl AccessorTable {
    /// Derive accessors for `records`.
    ///
    /// Entities without a name field get an empty table. When two records
    /// derive the same name the later record wins.
    pub fn build(entity: &str, options: &EntityOptions, records: &[Arc<Record>]) -> Self {
        let Some(field) = options.name_field.as_deref() else {
            return Self::default();
        };

        let mut table = Self::default();
        for record in records {
            let Some(name) = record.get(field).and_then(|v| accessor_name(v, options)) else {
                continue;
            };
            if let Some(previous) = table.by_name.insert(name.clone(), Arc::clone(record)) {
                warn!(
                    entity,
                    accessor = %name,
                    replaced = ?previous.get(field),
                    "accessor name collision; later record wins"
                );
            } else {
                table.names.push(name);
            }
        }
        debug!(entity, accessors = table.names.len(), "accessor table built");
        table
    }

    /// Record reachable under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Record>> {
        self.by_name.get(name)
    }

    /// Whether `name` is a derived accessor.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Accessor names in record order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of accessors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no accessor was derived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
