//! Table fixtures loaded from TOML.
//!
//! A fixture file declares one TOML table per database table:
//!
//! ```toml
//! [pies]
//! primary_key = "id"
//! rows = [
//!     { id = 1, filling = "Tasty beef steak" },
//!     { id = 2, filling = "Tasty mushrooms with tarragon" },
//! ]
//! ```
//!
//! `primary_key` defaults to `id`. Bulk-loading a [`FixtureSet`] into a
//! [`crate::MemoryStore`] notifies the store's observers, which is how
//! constant-table caches get reset between test runs.

use crate::{DEFAULT_PRIMARY_KEY, Error, Record, Result, Value};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Rows for a single table.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureTable {
    /// Primary-key field of the table.
    pub primary_key: String,
    /// Rows in file order.
    pub rows: Vec<Record>,
}

/// A set of table fixtures keyed by table name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureSet {
    tables: BTreeMap<String, FixtureTable>,
}

impl FixtureSet {
    /// Empty fixture set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a table.
    #[must_use]
    pub fn table(
        mut self,
        name: impl Into<String>,
        primary_key: impl Into<String>,
        rows: Vec<Record>,
    ) -> Self {
        self.tables.insert(
            name.into(),
            FixtureTable {
                primary_key: primary_key.into(),
                rows,
            },
        );
        self
    }

    /// Read fixtures from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read fixtures {}: {e}", path.display()))
        })?;
        content.parse()
    }

    /// Tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &FixtureTable)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    /// Rows for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FixtureTable> {
        self.tables.get(name)
    }

    /// Number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when no table is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTable {
    #[serde(default = "default_primary_key")]
    primary_key: String,
    #[serde(default)]
    rows: Vec<BTreeMap<String, toml::Value>>,
}

fn default_primary_key() -> String {
    DEFAULT_PRIMARY_KEY.to_string()
}

impl FromStr for FixtureSet {
    type Err = Error;

    fn from_str(content: &str) -> Result<Self> {
        let document: BTreeMap<String, RawTable> = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse fixtures: {e}")))?;

        let mut set = Self::new();
        for (name, raw) in document {
            let rows = raw
                .rows
                .iter()
                .enumerate()
                .map(|(position, fields)| parse_row(&name, position, fields))
                .collect::<Result<_>>()?;
            set.tables.insert(
                name,
                FixtureTable {
                    primary_key: raw.primary_key,
                    rows,
                },
            );
        }
        Ok(set)
    }
}

fn parse_row(
    table: &str,
    position: usize,
    fields: &BTreeMap<String, toml::Value>,
) -> Result<Record> {
    let attributes = fields
        .iter()
        .map(|(field, value)| {
            let value = Value::from_toml(value).ok_or_else(|| {
                Error::Config(format!(
                    "Fixture '{table}' row {position}: field '{field}' holds a nested table"
                ))
            })?;
            Ok((field.clone(), value))
        })
        .collect::<Result<_>>()?;
    Ok(Record::from_attributes(table, attributes))
}
