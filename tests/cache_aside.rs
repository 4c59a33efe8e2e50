//! Cache-aside semantics of the lookup orchestrator: hits short-circuit the
//! remote client, forced-fresh lookups overwrite, a broken store degrades to
//! live lookups, and a missing place rejects without polluting the cache.

mod helpers;

use gazetteer::places::PlacesService;
use gazetteer::places::cache::{KeyValueStore, ResponseCache};
use gazetteer::places::models::{AutocompleteRequest, FieldMask};
use helpers::{FailingStore, StubClient, TTL, coffee_search, service_over, wait_for_payload};
use std::sync::Arc;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn repeat_lookup_is_served_from_cache() {
    let client = StubClient::new();
    let (service, store) = service_over(client.clone());
    let req = coffee_search();

    let first = service.search(&req, false).await.unwrap();
    wait_for_payload(&store, "coffee-1").await;
    let second = service.search(&req, false).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(client.search_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn forced_fresh_always_hits_upstream_and_overwrites() {
    let client = StubClient::new();
    let (service, store) = service_over(client.clone());
    let req = coffee_search();

    let first = service.search(&req, false).await.unwrap();
    assert_eq!(first[0].id, "coffee-1");
    wait_for_payload(&store, "coffee-1").await;

    let fresh = service.search(&req, true).await.unwrap();
    assert_eq!(fresh[0].id, "coffee-2");
    assert_eq!(client.search_calls.load(Ordering::SeqCst), 2);

    // The overwritten entry serves subsequent reads.
    wait_for_payload(&store, "coffee-2").await;
    let cached = service.search(&req, false).await.unwrap();
    assert_eq!(cached[0].id, "coffee-2");
    assert_eq!(client.search_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn broken_store_degrades_to_live_lookups() {
    let client = StubClient::new();
    let cache = ResponseCache::new(Arc::new(FailingStore), TTL);
    let service = PlacesService::new(client.clone(), cache);
    let req = coffee_search();

    // Every call succeeds; the dead store just costs a remote call each time.
    let first = service.search(&req, false).await.unwrap();
    assert_eq!(first[0].id, "coffee-1");
    let second = service.search(&req, false).await.unwrap();
    assert_eq!(second[0].id, "coffee-2");
    assert_eq!(client.search_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_place_rejects_without_writing_cache() {
    let client = StubClient::new();
    client.details_missing.store(true, Ordering::SeqCst);
    let (service, store) = service_over(client.clone());

    let err = service
        .get_details("abc", &FieldMask::default(), false)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(store.keys("places:*").await.unwrap().is_empty());

    // The key is clear for a retry once the place exists upstream.
    client.details_missing.store(false, Ordering::SeqCst);
    let details = service
        .get_details("abc", &FieldMask::default(), false)
        .await
        .unwrap();
    assert_eq!(details.id, "abc");
    assert_eq!(client.details_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn details_keys_include_the_field_mask() {
    let client = StubClient::new();
    let (service, store) = service_over(client.clone());

    service
        .get_details("abc", &FieldMask::new(["id", "rating"]), false)
        .await
        .unwrap();
    wait_for_payload(&store, "\"id\":\"abc\"").await;
    // Same field set, different construction order and a duplicate: same key.
    service
        .get_details("abc", &FieldMask::new(["rating", "id", "rating"]), false)
        .await
        .unwrap();
    assert_eq!(client.details_calls.load(Ordering::SeqCst), 1);

    // A narrower mask is a different key, not a stale broad answer.
    service
        .get_details("abc", &FieldMask::new(["id"]), false)
        .await
        .unwrap();
    assert_eq!(client.details_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn photos_and_autocomplete_cache_independently() {
    let client = StubClient::new();
    let (service, store) = service_over(client.clone());

    let photos = service.get_photos("abc", 5, false).await.unwrap();
    assert_eq!(photos.len(), 1);
    wait_for_payload(&store, "photos/1").await;
    service.get_photos("abc", 5, false).await.unwrap();
    assert_eq!(client.photos_calls.load(Ordering::SeqCst), 1);

    // A different limit is a different key.
    service.get_photos("abc", 3, false).await.unwrap();
    assert_eq!(client.photos_calls.load(Ordering::SeqCst), 2);

    let req = AutocompleteRequest {
        input: "blue bot".into(),
        location_bias: None,
    };
    service.autocomplete(&req, false).await.unwrap();
    wait_for_payload(&store, "blue bot-1").await;
    service.autocomplete(&req, false).await.unwrap();
    assert_eq!(client.autocomplete_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn purge_forces_the_next_lookup_live() {
    let client = StubClient::new();
    let (service, store) = service_over(client.clone());
    let req = coffee_search();

    service.search(&req, false).await.unwrap();
    wait_for_payload(&store, "coffee-1").await;
    assert_eq!(service.purge("search").await, 1);

    let after = service.search(&req, false).await.unwrap();
    assert_eq!(after[0].id, "coffee-2");
    assert_eq!(client.search_calls.load(Ordering::SeqCst), 2);
}
