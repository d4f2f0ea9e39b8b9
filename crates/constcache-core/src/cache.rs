//! Per-entity cache state and the load-once lifecycle.
//!
//! Each registered entity owns an [`EntityCache`] that is either unloaded or
//! holds one [`Snapshot`]. The first plain request populates it with a single
//! full-table fetch; concurrent first requests wait on the same population.
//! [`EntityCache::reset`] bumps the epoch and drops the snapshot; a load that
//! started under an older epoch is discarded when it finishes and the fetch
//! is retried, so a reset always wins over an in-flight load.

use crate::snapshot::Snapshot;
use crate::{EntityDescriptor, Error, Found, Record, Result, Selector, Store};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// Statistics tracking for one entity cache.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    bypasses: AtomicU64,
    loads: AtomicU64,
    discarded_loads: AtomicU64,
    resets: AtomicU64,
}

impl CacheStats {
    pub(crate) fn record_bypass(&self) {
        self.bypasses.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn summary(&self) -> CacheStatsSummary {
        CacheStatsSummary {
            hits: self.hits.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            discarded_loads: self.discarded_loads.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }
}

/// Summary of cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSummary {
    /// Requests answered from a snapshot.
    pub hits: u64,
    /// Requests forwarded to the store.
    pub bypasses: u64,
    /// Full-table fetches performed.
    pub loads: u64,
    /// Fetches thrown away because a reset happened mid-load.
    pub discarded_loads: u64,
    /// Resets applied.
    pub resets: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    epoch: u64,
    snapshot: Option<Arc<Snapshot>>,
}

/// Cache for a single entity.
#[derive(Debug)]
pub struct EntityCache {
    descriptor: EntityDescriptor,
    state: RwLock<CacheState>,
    populate: Mutex<()>,
    stats: CacheStats,
}

impl EntityCache {
    /// Unloaded cache for `descriptor`.
    pub fn new(descriptor: EntityDescriptor) -> Self {
        Self {
            descriptor,
            state: RwLock::new(CacheState::default()),
            populate: Mutex::new(()),
            stats: CacheStats::default(),
        }
    }

    /// The entity this cache serves.
    pub const fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    /// Current snapshot without triggering a load.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.state.read().snapshot.clone()
    }

    /// Whether a snapshot is held.
    pub fn is_loaded(&self) -> bool {
        self.state.read().snapshot.is_some()
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.state.read().epoch
    }

    /// Counters for this entity.
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Return the snapshot, loading it from `store` if necessary.
    ///
    /// At most one load runs at a time per entity. A failed fetch leaves the
    /// cache unloaded, so the next request tries again.
    ///
    /// # Errors
    ///
    /// Propagates the store error, or [`Error::Index`] if the fetched rows
    /// cannot be indexed.
    #[tracing::instrument(skip(self, store), fields(entity = self.descriptor.name()))]
    pub async fn snapshot(&self, store: &dyn Store) -> Result<Arc<Snapshot>> {
        // Fast path: already populated
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }

        let _populating = self.populate.lock().await;
        loop {
            // Double-check in case another task loaded it while we were waiting
            let epoch = {
                let state = self.state.read();
                if let Some(snapshot) = &state.snapshot {
                    debug!("snapshot loaded by another task");
                    return Ok(Arc::clone(snapshot));
                }
                state.epoch
            };

            debug!(epoch, "cache miss, loading");
            let snapshot = Arc::new(Snapshot::load(store, &self.descriptor, epoch).await?);
            self.stats.loads.fetch_add(1, Ordering::Relaxed);

            let published = {
                let mut state = self.state.write();
                if state.epoch == epoch {
                    state.snapshot = Some(Arc::clone(&snapshot));
                    true
                } else {
                    false
                }
            };
            if published {
                debug!(epoch, records = snapshot.len(), "snapshot published");
                return Ok(snapshot);
            }

            self.stats.discarded_loads.fetch_add(1, Ordering::Relaxed);
            debug!(epoch, "reset during load, discarding result");
        }
    }

    /// Answer a plain request from the snapshot.
    ///
    /// # Errors
    ///
    /// Load errors as for [`EntityCache::snapshot`]; not-found errors from the
    /// lookup itself.
    pub async fn lookup(&self, store: &dyn Store, selector: &Selector) -> Result<Found> {
        let snapshot = self.snapshot(store).await?;
        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        snapshot.resolve(selector)
    }

    /// Whether `name` is a named accessor of this entity.
    ///
    /// Entities without a name field answer `false` without loading.
    ///
    /// # Errors
    ///
    /// Load errors as for [`EntityCache::snapshot`].
    pub async fn has_accessor(&self, store: &dyn Store, name: &str) -> Result<bool> {
        if self.descriptor.entity_options().name_field.is_none() {
            return Ok(false);
        }
        let snapshot = self.snapshot(store).await?;
        Ok(snapshot
            .accessors(self.descriptor.entity_options())
            .contains(name))
    }

    /// Record reachable under accessor `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAccessor`] if no such accessor exists, or a load
    /// error as for [`EntityCache::snapshot`].
    pub async fn invoke(&self, store: &dyn Store, name: &str) -> Result<Arc<Record>> {
        let unknown = || Error::UnknownAccessor {
            entity: self.descriptor.name().to_string(),
            name: name.to_string(),
        };
        if self.descriptor.entity_options().name_field.is_none() {
            return Err(unknown());
        }
        let snapshot = self.snapshot(store).await?;
        let record = snapshot
            .accessors(self.descriptor.entity_options())
            .get(name)
            .cloned()
            .ok_or_else(unknown)?;
        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        Ok(record)
    }

    /// All accessor names for the current epoch, in record order.
    ///
    /// # Errors
    ///
    /// Load errors as for [`EntityCache::snapshot`].
    pub async fn accessor_names(&self, store: &dyn Store) -> Result<Vec<String>> {
        if self.descriptor.entity_options().name_field.is_none() {
            return Ok(Vec::new());
        }
        let snapshot = self.snapshot(store).await?;
        Ok(snapshot
            .accessors(self.descriptor.entity_options())
            .names()
            .to_vec())
    }

    /// Discard the snapshot and start a new epoch.
    ///
    /// Safe to call at any time, including while a load is in flight.
    pub fn reset(&self) {
        let (epoch, dropped) = {
            let mut state = self.state.write();
            state.epoch = state.epoch.wrapping_add(1);
            (state.epoch, state.snapshot.take().is_some())
        };
        self.stats.resets.fetch_add(1, Ordering::Relaxed);
        debug!(entity = self.descriptor.name(), epoch, dropped, "cache reset");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::{EntityOptions, QueryOptions, Value};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Store that counts fetches and can hold the first one open.
    #[derive(Default)]
    struct CountingStore {
        fetches: AtomicUsize,
        fail: std::sync::atomic::AtomicBool,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    impl CountingStore {
        fn gated() -> (Self, Arc<Notify>, Arc<Notify>) {
            let started = Arc::new(Notify::new());
            let release = Arc::new(Notify::new());
            let store = Self {
                gate: Some((Arc::clone(&started), Arc::clone(&release))),
                ..Self::default()
            };
            (store, started, release)
        }
    }

    #[async_trait]
    impl Store for CountingStore {
        async fn fetch_all(&self, _entity: &EntityDescriptor) -> Result<Vec<Record>> {
            let call = self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Store("connection refused".into()));
            }
            if call == 0 {
                if let Some((started, release)) = &self.gate {
                    started.notify_one();
                    release.notified().await;
                }
            }
            Ok(vec![
                Record::new("pies").with("id", 1).with("filling", "Tasty beef steak"),
                Record::new("pies")
                    .with("id", 2)
                    .with("filling", format!("Mince {call}")),
            ])
        }

        async fn execute(
            &self,
            _entity: &EntityDescriptor,
            _selector: &Selector,
            _options: &QueryOptions,
        ) -> Result<Found> {
            panic!("cache never executes directly");
        }
    }

    fn named_cache() -> EntityCache {
        EntityCache::new(EntityDescriptor::new("Pie").options(EntityOptions::named("filling")))
    }

    #[tokio::test]
    async fn test_loads_once_and_reuses_snapshot() {
        let store = CountingStore::default();
        let cache = named_cache();

        let first = cache.snapshot(&store).await.unwrap();
        let second = cache.snapshot(&store).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().summary().loads, 1);
    }

    #[tokio::test]
    async fn test_reset_forces_reload() {
        let store = CountingStore::default();
        let cache = named_cache();

        let before = cache.snapshot(&store).await.unwrap();
        cache.reset();
        assert!(!cache.is_loaded());
        let after = cache.snapshot(&store).await.unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(after.epoch(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let store = CountingStore::default();
        store.fail.store(true, Ordering::SeqCst);
        let cache = named_cache();

        let err = cache.lookup(&store, &Selector::All).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(!cache.is_loaded());

        store.fail.store(false, Ordering::SeqCst);
        let found = cache.lookup(&store, &Selector::All).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reset_during_load_discards_stale_result() {
        // Given: A load that is held open inside the store
        let (store, started, release) = CountingStore::gated();
        let store = Arc::new(store);
        let cache = Arc::new(named_cache());

        let loader = {
            let (store, cache) = (Arc::clone(&store), Arc::clone(&cache));
            tokio::spawn(async move { cache.snapshot(store.as_ref()).await })
        };
        started.notified().await;

        // When: A reset lands before the fetch completes
        cache.reset();
        release.notify_one();
        let snapshot = loader.await.unwrap().unwrap();

        // Then: The stale fetch is discarded and the published data is fresh
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(snapshot.epoch(), 1);
        let last = snapshot.resolve(&Selector::Last).unwrap().into_one().unwrap();
        assert_eq!(last.get("filling"), Some(&Value::from("Mince 1")));
        assert_eq!(cache.stats().summary().discarded_loads, 1);
    }

    #[tokio::test]
    async fn test_accessors_without_name_field_do_not_load() {
        let store = CountingStore::default();
        let cache = EntityCache::new(EntityDescriptor::new("Pie"));

        assert!(!cache.has_accessor(&store, "mince_0").await.unwrap());
        let err = cache.invoke(&store, "mince_0").await.unwrap_err();

        assert!(matches!(err, Error::UnknownAccessor { .. }));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_accessor_lookup() {
        let store = CountingStore::default();
        let cache = named_cache();

        assert!(cache.has_accessor(&store, "mince_0").await.unwrap());
        assert!(!cache.has_accessor(&store, "apple").await.unwrap());

        let record = cache.invoke(&store, "tasty_beef_steak").await.unwrap();
        assert_eq!(record.get("id"), Some(&Value::Int(1)));
        assert_eq!(
            cache.accessor_names(&store).await.unwrap(),
            ["tasty_beef_steak", "mince_0"]
        );
    }
}
