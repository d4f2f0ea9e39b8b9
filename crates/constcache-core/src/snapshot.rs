//! Cached snapshots, the primary-key index and the lookup engine.
//!
//! A [`Snapshot`] is one epoch's frozen copy of a table: the records in load
//! order, a [`KeyIndex`] over their normalized primary keys, and a lazily
//! built [`AccessorTable`]. Snapshots are immutable once built, so any
//! number of readers can share one through an `Arc`.

use crate::accessor::AccessorTable;
use crate::{
    EntityDescriptor, EntityOptions, Error, Found, KeyParam, Record, Result, Selector, Store,
    ToParam, Value,
};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Lookup-by-key structure over a record list.
#[derive(Debug, Default)]
pub struct KeyIndex {
    positions: HashMap<KeyParam, usize>,
}

impl KeyIndex {
    /// Index `records` by the normalized value of `primary_key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] if a record has no usable key or two records
    /// normalize to the same key.
    pub fn build(entity: &str, primary_key: &str, records: &[Arc<Record>]) -> Result<Self> {
        let mut positions = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            let key = record
                .get(primary_key)
                .and_then(|value| value.to_param())
                .ok_or_else(|| {
                    Error::Index(format!(
                        "{entity} record at position {position} has no value for primary key '{primary_key}'"
                    ))
                })?;
            match positions.entry(key) {
                Entry::Occupied(slot) => {
                    return Err(Error::Index(format!(
                        "{entity} has more than one record with {primary_key}={}",
                        slot.key()
                    )));
                },
                Entry::Vacant(slot) => {
                    slot.insert(position);
                },
            }
        }
        Ok(Self { positions })
    }

    /// Position of the record with `key`.
    #[must_use]
    pub fn position(&self, key: &KeyParam) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Number of indexed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

fn flatten_into(value: &Value, out: &mut Vec<KeyParam>) {
    match value {
        Value::List(items) => {
            for item in items {
                flatten_into(item, out);
            }
        },
        other => {
            if let Some(param) = other.to_param() {
                if !out.contains(&param) {
                    out.push(param);
                }
            }
        },
    }
}

/// Resolve `selector` against `records` and their `index`.
///
/// Shared by the cache and by stores executing bypassed requests, so a
/// missing key fails the same way on both paths.
///
/// # Errors
///
/// Returns [`Error::RecordNotFound`] when a key lookup has no usable key or
/// any requested key is missing.
pub fn resolve(
    entity: &str,
    records: &[Arc<Record>],
    index: &KeyIndex,
    selector: &Selector,
) -> Result<Found> {
    let lookup = |key: &KeyParam| index.position(key).map(|pos| Arc::clone(&records[pos]));

    match selector {
        Selector::All => Ok(Found::Many(records.to_vec())),
        Selector::First => Ok(records
            .first()
            .map_or(Found::Nothing, |r| Found::One(Arc::clone(r)))),
        Selector::Last => Ok(records
            .last()
            .map_or(Found::Nothing, |r| Found::One(Arc::clone(r)))),
        Selector::Id(Value::List(keys)) => {
            resolve(entity, records, index, &Selector::Ids(keys.clone()))
        },
        Selector::Id(key) => {
            let param = key
                .to_param()
                .ok_or_else(|| Error::not_found_without_id(entity))?;
            lookup(&param)
                .map(Found::One)
                .ok_or_else(|| Error::not_found_id(entity, param.as_str()))
        },
        Selector::Ids(keys) if keys.is_empty() => Ok(Found::Many(Vec::new())),
        Selector::Ids(keys) => {
            let mut params = Vec::with_capacity(keys.len());
            for key in keys {
                flatten_into(key, &mut params);
            }
            match params.as_slice() {
                [] => Err(Error::not_found_without_id(entity)),
                [param] => lookup(param)
                    .map(|record| Found::Many(vec![record]))
                    .ok_or_else(|| Error::not_found_id(entity, param.as_str())),
                _ => {
                    let found: Vec<Arc<Record>> = params.iter().filter_map(lookup).collect();
                    if found.len() == params.len() {
                        Ok(Found::Many(found))
                    } else {
                        let requested: Vec<String> =
                            params.iter().map(|p| p.as_str().to_string()).collect();
                        Err(Error::not_found_ids(entity, &requested, found.len()))
                    }
                },
            }
        },
    }
}

/// One epoch's frozen copy of an entity's table.
#[derive(Debug)]
pub struct Snapshot {
    entity: String,
    epoch: u64,
    records: Vec<Arc<Record>>,
    index: KeyIndex,
    accessors: OnceLock<AccessorTable>,
}

impl Snapshot {
    /// Fetch the whole table once and freeze it.
    ///
    /// Store failures are returned as-is; nothing is retained.
    pub async fn load(
        store: &dyn Store,
        descriptor: &EntityDescriptor,
        epoch: u64,
    ) -> Result<Self> {
        let records = store.fetch_all(descriptor).await?;
        Self::build(descriptor, records, epoch)
    }

    /// Freeze `records` and index them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] if the records cannot be indexed.
    pub fn build(descriptor: &EntityDescriptor, records: Vec<Record>, epoch: u64) -> Result<Self> {
        let records: Vec<Arc<Record>> = records
            .into_iter()
            .map(|mut record| {
                record.freeze();
                Arc::new(record)
            })
            .collect();
        let index = KeyIndex::build(descriptor.name(), descriptor.primary_key_field(), &records)?;
        debug!(
            entity = descriptor.name(),
            epoch,
            records = records.len(),
            "snapshot built"
        );
        Ok(Self {
            entity: descriptor.name().to_string(),
            epoch,
            records,
            index,
            accessors: OnceLock::new(),
        })
    }

    /// Answer a plain request from this snapshot.
    ///
    /// # Errors
    ///
    /// See [`resolve`].
    pub fn resolve(&self, selector: &Selector) -> Result<Found> {
        resolve(&self.entity, &self.records, &self.index, selector)
    }

    /// Named-accessor table, built on first use.
    pub fn accessors(&self, options: &EntityOptions) -> &AccessorTable {
        self.accessors
            .get_or_init(|| AccessorTable::build(&self.entity, options, &self.records))
    }

    /// Whether the accessor table has been built for this epoch.
    #[must_use]
    pub fn accessors_built(&self) -> bool {
        self.accessors.get().is_some()
    }

    /// Epoch this snapshot belongs to.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Records in load order.
    #[must_use]
    pub fn records(&self) -> &[Arc<Record>] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True for an empty table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
