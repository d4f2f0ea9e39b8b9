//! Shared setup for integration tests: the pies/ingredients fixtures and a
//! registry with the usual cached entities over them.
#![allow(dead_code, clippy::unwrap_used)]

use constcache_core::{
    CacheRegistry, EntityDescriptor, EntityOptions, FixtureSet, Found, MemoryStore, QueryOptions,
    Record, Selector, Store,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Path of the fixture file shared by the integration tests.
pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/pies.toml")
}

pub fn fixtures() -> FixtureSet {
    FixtureSet::load(&fixture_path()).unwrap()
}

/// Store loaded with fixtures plus a registry holding:
/// - `ConstantPie`: pies, no name field
/// - `ConstantNamedPie`: pies, accessors from `filling`
/// - `ConstantLongNamedPie`: pies, accessors with `a_` / `_pie`
///
/// The registry's reset hook is subscribed to the store.
pub fn setup() -> (Arc<MemoryStore>, CacheRegistry) {
    let store = Arc::new(MemoryStore::from_fixtures(&fixtures()));
    let registry = CacheRegistry::new(store.clone());

    registry
        .register(EntityDescriptor::new("ConstantPie").table("pies"))
        .unwrap();
    registry
        .register(
            EntityDescriptor::new("ConstantNamedPie")
                .table("pies")
                .options(EntityOptions::named("filling")),
        )
        .unwrap();
    registry
        .register(
            EntityDescriptor::new("ConstantLongNamedPie")
                .table("pies")
                .options(
                    EntityOptions::named("filling")
                        .with_prefix("a_")
                        .with_suffix("_pie"),
                ),
        )
        .unwrap();
    store.subscribe(registry.reset_hook());

    (store, registry)
}

/// Uncached lookup straight against the store, the reference result.
pub async fn uncached(store: &MemoryStore, selector: &Selector) -> Found {
    let pies = EntityDescriptor::new("StandardPie").table("pies");
    store
        .execute(&pies, selector, &QueryOptions::default())
        .await
        .unwrap()
}

/// Attribute view of a result for field-for-field comparison.
pub fn attributes(found: Found) -> Vec<Record> {
    found.into_many().iter().map(|r| r.thawed()).collect()
}

/// Run `f` and return how many queries the store saw meanwhile.
pub async fn count_queries<F, T>(store: &MemoryStore, f: F) -> (usize, T)
where
    F: std::future::Future<Output = T>,
{
    let before = store.query_count();
    let out = f.await;
    (store.query_count() - before, out)
}
