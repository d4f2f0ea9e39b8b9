//! Registry of cached entities.
//!
//! [`CacheRegistry`] is the entry point callers use. Entities are registered
//! once; every lookup is classified and either answered from the entity's
//! cache or forwarded to the store unchanged.
//!
//! ```rust
//! use constcache_core::{CacheRegistry, EntityDescriptor, EntityOptions, MemoryStore, Record};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! store.insert_table("pies", "id", vec![
//!     Record::new("pies").with("id", 1).with("filling", "Mince"),
//! ]);
//!
//! let registry = CacheRegistry::new(store.clone());
//! registry.register(
//!     EntityDescriptor::new("Pie").table("pies").options(EntityOptions::named("filling")),
//! )?;
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().build()?;
//! runtime.block_on(async {
//!     let pie = registry.invoke_named_accessor("Pie", "mince").await?;
//!     assert_eq!(pie, registry.find_one("Pie", 1).await?);
//!     Ok::<(), constcache_core::Error>(())
//! })?;
//! assert_eq!(store.query_count(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::cache::{CacheStatsSummary, EntityCache};
use crate::query::{Classification, classify};
use crate::{EntityDescriptor, Error, Found, QueryOptions, Record, Result, Selector, Store, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Callback that resets every cached entity.
pub type ResetHook = Arc<dyn Fn() + Send + Sync>;

struct Inner {
    store: Arc<dyn Store>,
    entities: RwLock<HashMap<String, Arc<EntityCache>>>,
}

impl Inner {
    fn reset_all(&self) {
        let caches: Vec<Arc<EntityCache>> = self.entities.read().values().cloned().collect();
        for cache in &caches {
            cache.reset();
        }
        info!(entities = caches.len(), "all caches reset");
    }
}

/// Process-wide registry of cached entities over one store.
///
/// Cloning is cheap; clones share the same caches.
#[derive(Clone)]
pub struct CacheRegistry {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("entities", &self.entities())
            .finish_non_exhaustive()
    }
}

impl CacheRegistry {
    /// Registry over `store` with no entities.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                entities: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    /// Register an entity for caching.
    ///
    /// Without an explicit primary key the store is asked for one, falling
    /// back to `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an entity with the same name is already
    /// registered.
    pub fn register(&self, descriptor: EntityDescriptor) -> Result<()> {
        let descriptor = if descriptor.has_explicit_primary_key() {
            descriptor
        } else {
            match self.inner.store.primary_key(descriptor.table_name()) {
                Some(field) => descriptor.primary_key(field),
                None => descriptor,
            }
        };

        let mut entities = self.inner.entities.write();
        if entities.contains_key(descriptor.name()) {
            return Err(Error::Config(format!(
                "Entity '{}' is already registered",
                descriptor.name()
            )));
        }
        debug!(
            entity = descriptor.name(),
            table = descriptor.table_name(),
            primary_key = descriptor.primary_key_field(),
            named = descriptor.entity_options().name_field.is_some(),
            "entity registered"
        );
        entities.insert(
            descriptor.name().to_string(),
            Arc::new(EntityCache::new(descriptor)),
        );
        Ok(())
    }

    /// Whether `entity` is registered.
    #[must_use]
    pub fn is_registered(&self, entity: &str) -> bool {
        self.inner.entities.read().contains_key(entity)
    }

    /// Registered entity names, sorted.
    #[must_use]
    pub fn entities(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.entities.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn cache(&self, entity: &str) -> Result<Arc<EntityCache>> {
        self.inner
            .entities
            .read()
            .get(entity)
            .cloned()
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))
    }

    /// Look up records of `entity`.
    ///
    /// Plain requests are answered from the cache, populating it on first
    /// use. Requests carrying any qualifier, explicit or ambient, go to the
    /// store unchanged and leave the cache untouched.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownEntity`] for unregistered entities,
    /// [`Error::RecordNotFound`] for missing keys, and any store error.
    pub async fn find(
        &self,
        entity: &str,
        selector: &Selector,
        options: &QueryOptions,
    ) -> Result<Found> {
        let cache = self.cache(entity)?;
        let store = self.inner.store.as_ref();
        let ambient = store.ambient_scope(cache.descriptor().table_name());

        match classify(options, ambient.as_ref()) {
            Classification::Bypass(qualifier) => {
                debug!(entity, %selector, %qualifier, "bypassing cache");
                cache.stats().record_bypass();
                store.execute(cache.descriptor(), selector, options).await
            },
            Classification::Cacheable => {
                let found = cache.lookup(store, selector).await?;
                debug!(entity, %selector, records = found.len(), "cache hit");
                Ok(found)
            },
        }
    }

    /// Every record of `entity`, in load order.
    ///
    /// The returned list is the caller's own; the records are shared.
    ///
    /// # Errors
    ///
    /// As for [`CacheRegistry::find`].
    pub async fn all(&self, entity: &str) -> Result<Vec<Arc<Record>>> {
        Ok(self
            .find(entity, &Selector::All, &QueryOptions::default())
            .await?
            .into_many())
    }

    /// First record in load order.
    ///
    /// # Errors
    ///
    /// As for [`CacheRegistry::find`].
    pub async fn first(&self, entity: &str) -> Result<Option<Arc<Record>>> {
        Ok(self
            .find(entity, &Selector::First, &QueryOptions::default())
            .await?
            .into_one())
    }

    /// Last record in load order.
    ///
    /// # Errors
    ///
    /// As for [`CacheRegistry::find`].
    pub async fn last(&self, entity: &str) -> Result<Option<Arc<Record>>> {
        Ok(self
            .find(entity, &Selector::Last, &QueryOptions::default())
            .await?
            .into_one())
    }

    /// Record with primary key `key`.
    ///
    /// `key` must be a single key; lists go through [`CacheRegistry::find_many`].
    ///
    /// # Errors
    ///
    /// [`Error::RecordNotFound`] if there is no such record or `key` is null,
    /// [`Error::Other`] if `key` is a list.
    pub async fn find_one(&self, entity: &str, key: impl Into<Value>) -> Result<Arc<Record>> {
        let key = key.into();
        if matches!(key, Value::List(_)) {
            return Err(Error::Other(format!(
                "find_one on {entity} takes a single key, got {key}"
            )));
        }
        self.find(entity, &Selector::Id(key), &QueryOptions::default())
            .await?
            .into_one()
            .ok_or_else(|| Error::not_found_without_id(entity))
    }

    /// Records with the given primary keys, in request order.
    ///
    /// # Errors
    ///
    /// [`Error::RecordNotFound`] if any key is missing.
    pub async fn find_many<I, T>(&self, entity: &str, keys: I) -> Result<Vec<Arc<Record>>>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Ok(self
            .find(entity, &Selector::ids(keys), &QueryOptions::default())
            .await?
            .into_many())
    }

    /// Resolve `record`'s foreign key `field` to the referenced `entity`
    /// record through the cache. A null or missing foreign key gives `None`.
    ///
    /// # Errors
    ///
    /// As for [`CacheRegistry::find`]; a dangling foreign key is
    /// [`Error::RecordNotFound`].
    pub async fn belongs_to(
        &self,
        entity: &str,
        record: &Record,
        field: &str,
    ) -> Result<Option<Arc<Record>>> {
        match record.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(key) => self.find_one(entity, key.clone()).await.map(Some),
        }
    }

    /// Whether `name` is a named accessor of `entity`.
    ///
    /// Unregistered entities and entities without a name field have none.
    ///
    /// # Errors
    ///
    /// Propagates a failed load.
    pub async fn has_named_accessor(&self, entity: &str, name: &str) -> Result<bool> {
        match self.cache(entity) {
            Ok(cache) => cache.has_accessor(self.inner.store.as_ref(), name).await,
            Err(_) => Ok(false),
        }
    }

    /// Record bound to accessor `name` of `entity`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownAccessor`] if `entity` derives no such accessor
    /// (including when it is not registered), or a load error.
    pub async fn invoke_named_accessor(&self, entity: &str, name: &str) -> Result<Arc<Record>> {
        let cache = self.cache(entity).map_err(|_| Error::UnknownAccessor {
            entity: entity.to_string(),
            name: name.to_string(),
        })?;
        cache.invoke(self.inner.store.as_ref(), name).await
    }

    /// Accessor names of `entity`, in record order.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownEntity`] or a load error.
    pub async fn accessor_names(&self, entity: &str) -> Result<Vec<String>> {
        self.cache(entity)?
            .accessor_names(self.inner.store.as_ref())
            .await
    }

    /// End the current epoch of `entity`. A no-op if nothing is cached.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownEntity`] for unregistered entities.
    pub fn reset(&self, entity: &str) -> Result<()> {
        self.cache(entity)?.reset();
        Ok(())
    }

    /// Reset every registered entity.
    pub fn reset_all(&self) {
        self.inner.reset_all();
    }

    /// Callback that resets every entity, for bulk-data collaborators.
    ///
    /// The hook holds a weak reference and does nothing once the registry
    /// is gone.
    #[must_use]
    pub fn reset_hook(&self) -> ResetHook {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Arc::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.reset_all();
            }
        })
    }

    /// Whether `entity` currently holds a snapshot.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownEntity`] for unregistered entities.
    pub fn is_loaded(&self, entity: &str) -> Result<bool> {
        Ok(self.cache(entity)?.is_loaded())
    }

    /// Counters for `entity`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownEntity`] for unregistered entities.
    pub fn stats(&self, entity: &str) -> Result<CacheStatsSummary> {
        Ok(self.cache(entity)?.stats().summary())
    }
}
