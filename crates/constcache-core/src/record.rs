//! Records: a table row as a mapping of field name to [`Value`].
//!
//! Records are mutable while they belong to the caller and become read-only
//! once frozen. The loader freezes every record before it enters a snapshot,
//! so writes against cached records fail with [`Error::FrozenRecord`].

use crate::{Error, Result, Value};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// One row of a table.
#[derive(Debug, Clone)]
pub struct Record {
    table: String,
    fields: BTreeMap<String, Value>,
    frozen: bool,
}

impl Record {
    /// Create an empty, unfrozen record for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: BTreeMap::new(),
            frozen: false,
        }
    }

    /// Builder-style field assignment for constructing fresh records.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Create a record from existing attributes.
    pub fn from_attributes(table: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            table: table.into(),
            fields,
            frozen: false,
        }
    }

    /// Table this record was read from.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Field value, if present.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All attributes, ordered by field name.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Write a field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrozenRecord`] if the record has been frozen.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let field = field.into();
        self.ensure_unfrozen(&field)?;
        self.fields.insert(field, value.into());
        Ok(())
    }

    /// Remove a field, returning its previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrozenRecord`] if the record has been frozen.
    pub fn remove(&mut self, field: &str) -> Result<Option<Value>> {
        self.ensure_unfrozen(field)?;
        Ok(self.fields.remove(field))
    }

    /// Make the record read-only. Idempotent.
    pub const fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Whether the record rejects writes.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Unfrozen copy that the caller may modify freely.
    #[must_use]
    pub fn thawed(&self) -> Self {
        Self {
            table: self.table.clone(),
            fields: self.fields.clone(),
            frozen: false,
        }
    }

    /// Copy restricted to the named fields (a column projection).
    #[must_use]
    pub fn project(&self, fields: &[String]) -> Self {
        let projected = self
            .fields
            .iter()
            .filter(|(name, _)| fields.iter().any(|f| f == *name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self::from_attributes(self.table.clone(), projected)
    }

    fn ensure_unfrozen(&self, field: &str) -> Result<()> {
        if self.frozen {
            return Err(Error::FrozenRecord {
                entity: self.table.clone(),
                field: field.to_string(),
            });
        }
        Ok(())
    }
}

// Equality is attribute equality; a frozen record equals its unfrozen twin.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.fields == other.fields
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}
