//! Reset, concurrent population, load failures, the fixture hook and
//! association lookups.
#![allow(clippy::unwrap_used)]

mod common;

use common::{count_queries, fixtures, setup};
use constcache_core::{
    EntityDescriptor, Error, FixtureSet, Record, Selector, Store, Value,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_reset_triggers_exactly_one_new_fetch_with_fresh_data() {
    let (store, registry) = setup();
    assert_eq!(registry.all("ConstantPie").await.unwrap().len(), 3);

    // Given: A row added behind the cache's back
    store.insert("pies", Record::new("pies").with("id", 4).with("filling", "Apple"));
    assert_eq!(registry.all("ConstantPie").await.unwrap().len(), 3);

    // When: The entity is reset
    registry.reset("ConstantPie").unwrap();
    let (queries, pies) = count_queries(&store, async {
        let pies = registry.all("ConstantPie").await.unwrap();
        registry.find_one("ConstantPie", 4).await.unwrap();
        pies
    })
    .await;

    // Then: One fetch, and the new row is visible
    assert_eq!(queries, 1);
    assert_eq!(pies.len(), 4);
    assert_eq!(registry.stats("ConstantPie").unwrap().resets, 1);
}

#[tokio::test]
async fn test_reset_is_per_entity() {
    let (store, registry) = setup();
    registry.all("ConstantPie").await.unwrap();
    registry.all("ConstantNamedPie").await.unwrap();

    registry.reset("ConstantPie").unwrap();

    assert!(!registry.is_loaded("ConstantPie").unwrap());
    assert!(registry.is_loaded("ConstantNamedPie").unwrap());
    let (queries, _) = count_queries(&store, registry.all("ConstantNamedPie")).await;
    assert_eq!(queries, 0);
}

#[tokio::test]
async fn test_reset_all_and_idempotence() {
    let (store, registry) = setup();
    registry.all("ConstantPie").await.unwrap();
    registry.all("ConstantNamedPie").await.unwrap();

    registry.reset_all();
    registry.reset_all();

    for entity in registry.entities() {
        assert!(!registry.is_loaded(&entity).unwrap());
    }
    let (queries, _) = count_queries(&store, registry.all("ConstantPie")).await;
    assert_eq!(queries, 1);
}

#[tokio::test]
async fn test_fixture_load_resets_every_cache() {
    let (store, registry) = setup();
    registry.all("ConstantPie").await.unwrap();
    assert!(registry.has_named_accessor("ConstantNamedPie", "mince").await.unwrap());

    // When: The fixture collaborator bulk-loads new data
    let replacement = FixtureSet::new().table(
        "pies",
        "id",
        vec![Record::new("pies").with("id", 7).with("filling", "Cherry")],
    );
    store.load_fixtures(&replacement);

    // Then: No stale state survives
    assert!(!registry.is_loaded("ConstantPie").unwrap());
    assert!(!registry.is_loaded("ConstantNamedPie").unwrap());
    let pies = registry.all("ConstantPie").await.unwrap();
    assert_eq!(pies.len(), 1);
    assert!(registry.has_named_accessor("ConstantNamedPie", "cherry").await.unwrap());
    assert!(!registry.has_named_accessor("ConstantNamedPie", "mince").await.unwrap());

    // And: Reloading the original fixtures restores them
    store.load_fixtures(&fixtures());
    assert_eq!(registry.all("ConstantPie").await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_truncate_resets_caches() {
    let (store, registry) = setup();
    registry.all("ConstantPie").await.unwrap();

    store.truncate("pies");

    assert!(registry.all("ConstantPie").await.unwrap().is_empty());
    assert!(registry.first("ConstantPie").await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_lookups_share_one_fetch() {
    let (store, registry) = setup();
    store.set_fetch_delay(Some(Duration::from_millis(50)));

    // Given: N tasks racing on a cold entity
    let tasks = (0..16).map(|i| {
        let registry = registry.clone();
        tokio::spawn(async move {
            if i % 2 == 0 {
                registry.all("ConstantPie").await.unwrap()
            } else {
                registry.find_many("ConstantPie", [1, 2, 3]).await.unwrap()
            }
        })
    });
    let results = join_all(tasks).await;

    // Then: Exactly one fetch, and every task saw the same records
    assert_eq!(store.query_count(), 1);
    let first = results[0].as_ref().unwrap();
    for result in &results {
        let pies = result.as_ref().unwrap();
        assert_eq!(pies.len(), 3);
        for (a, b) in pies.iter().zip(first) {
            assert!(Arc::ptr_eq(a, b));
        }
    }
    assert_eq!(registry.stats("ConstantPie").unwrap().loads, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reset_racing_a_load_never_publishes_stale_data() {
    let (store, registry) = setup();
    store.set_fetch_delay(Some(Duration::from_millis(50)));

    // Given: A load in flight
    let loader = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.all("ConstantPie").await.unwrap() })
    };
    while store.query_count() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    // When: Data changes and a reset lands before the fetch completes
    store.insert("pies", Record::new("pies").with("id", 4).with("filling", "Apple"));
    registry.reset("ConstantPie").unwrap();
    let pies = loader.await.unwrap();

    // Then: The in-flight result was discarded and the reload sees the change
    assert_eq!(pies.len(), 4);
    assert_eq!(store.query_count(), 2);
    assert_eq!(registry.stats("ConstantPie").unwrap().discarded_loads, 1);
}

#[tokio::test]
async fn test_load_failure_propagates_and_is_retried() {
    let (store, registry) = setup();
    store.fail_next_fetches(1);

    let err = registry.all("ConstantPie").await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert!(err.is_recoverable());
    assert!(!registry.is_loaded("ConstantPie").unwrap());

    // The next access starts over
    assert_eq!(registry.all("ConstantPie").await.unwrap().len(), 3);
    assert_eq!(store.query_count(), 2);
}

#[tokio::test]
async fn test_missing_table_is_a_load_failure() {
    let (_store, registry) = setup();
    registry
        .register(EntityDescriptor::new("Cake").table("cakes"))
        .unwrap();

    let err = registry.all("Cake").await.unwrap_err();
    assert!(matches!(err, Error::Store(ref msg) if msg.contains("cakes")));
}

#[tokio::test]
async fn test_belongs_to_resolves_through_the_cache() {
    let (store, registry) = setup();
    let ingredients = store
        .fetch_all(&EntityDescriptor::new("ingredients"))
        .await
        .unwrap();
    let standard: Vec<Value> = vec![Value::Int(1), Value::Int(2), Value::Int(1)];

    // Three ingredients, one fetch
    let (queries, pies) = count_queries(&store, async {
        let mut pies = Vec::new();
        for ingredient in &ingredients {
            pies.push(
                registry
                    .belongs_to("ConstantPie", ingredient, "pie_id")
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }
        pies
    })
    .await;
    assert_eq!(queries, 1);
    let ids: Vec<Value> = pies.iter().filter_map(|p| p.get("id").cloned()).collect();
    assert_eq!(ids, standard);

    // And none once cached
    let (queries, _) = count_queries(
        &store,
        registry.belongs_to("ConstantPie", &ingredients[0], "pie_id"),
    )
    .await;
    assert_eq!(queries, 0);
}

#[tokio::test]
async fn test_dangling_foreign_key_is_not_found() {
    let (_store, registry) = setup();
    let orphan = Record::new("ingredients").with("id", 9).with("pie_id", 99);

    let err = registry
        .belongs_to("ConstantPie", &orphan, "pie_id")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Couldn't find ConstantPie with ID=99");
    assert!(
        registry
            .find("ConstantPie", &Selector::id(99), &constcache_core::QueryOptions::default())
            .await
            .is_err()
    );
}
