//! The backing-store boundary.
//!
//! The cache never talks to a database directly. It consumes a [`Store`]:
//! one unconditional full-table fetch per epoch, direct execution of
//! bypassed requests, and the ambient scope the caller has established.
//! Implement this trait over a real driver; [`crate::MemoryStore`] is the
//! in-process reference implementation.

use crate::{EntityDescriptor, QueryOptions, Record, Result, Selector};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Result of a lookup: one record, several, or nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Found {
    /// A single record (`first`, `last`, single key).
    One(Arc<Record>),
    /// A list of records (`all`, key lists).
    Many(Vec<Arc<Record>>),
    /// `first`/`last` on an empty result.
    Nothing,
}

impl Found {
    /// The single record, if this is [`Found::One`].
    #[must_use]
    pub fn into_one(self) -> Option<Arc<Record>> {
        match self {
            Self::One(record) => Some(record),
            Self::Many(_) | Self::Nothing => None,
        }
    }

    /// All records as a list; a single record becomes a one-element list.
    #[must_use]
    pub fn into_many(self) -> Vec<Arc<Record>> {
        match self {
            Self::One(record) => vec![record],
            Self::Many(records) => records,
            Self::Nothing => Vec::new(),
        }
    }

    /// Number of records carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(records) => records.len(),
            Self::Nothing => 0,
        }
    }

    /// True when no record is carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capabilities the cache consumes from the backing store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch every record of the entity's table in the store's natural
    /// order.
    ///
    /// Must ignore any ambient scope active in the calling context: the
    /// result always represents the entire table.
    async fn fetch_all(&self, entity: &EntityDescriptor) -> Result<Vec<Record>>;

    /// Execute a request directly against the store, honoring every
    /// qualifier and the ambient scope. Used for bypassed requests.
    async fn execute(
        &self,
        entity: &EntityDescriptor,
        selector: &Selector,
        options: &QueryOptions,
    ) -> Result<Found>;

    /// Primary-key field of `table`, when the store knows it.
    fn primary_key(&self, _table: &str) -> Option<String> {
        None
    }

    /// Scope currently active for `table` in the calling context.
    fn ambient_scope(&self, _table: &str) -> Option<QueryOptions> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_conversions() {
        let record = Arc::new(Record::new("pies").with("id", 1));

        assert_eq!(Found::One(Arc::clone(&record)).len(), 1);
        assert_eq!(
            Found::One(Arc::clone(&record)).into_many(),
            vec![Arc::clone(&record)]
        );
        assert!(Found::Many(vec![record]).into_one().is_none());
        assert!(Found::Nothing.is_empty());
        assert!(Found::Nothing.into_many().is_empty());
    }
}
