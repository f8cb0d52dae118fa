//! End-to-end scenarios across cache, storage, retry and connectivity

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use bazaarcache::{
    classify, run_with_retry, AlwaysOnline, ApiError, CacheKey, CacheManager, CachedFetcher,
    CartItem, CartStore, ManualConnectivity, RetryPolicy, Store,
};

fn open_store() -> (Arc<Store>, TempDir) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open_at(dir.path()).unwrap());
    (store, dir)
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(5), 2.0)
}

/// Admin list cached under ("sellers", PENDING, page=1): a read inside the
/// TTL returns the cached payload with no network call; a read past the TTL
/// is a miss forcing a live call whose response overwrites the same key.
#[tokio::test]
async fn admin_list_ttl_window() {
    let (store, _dir) = open_store();
    let cache = CacheManager::new(store, "admin-1", "admin_registrations");
    let fetcher = CachedFetcher::new(cache, fast_policy(), Arc::new(AlwaysOnline));

    let key = CacheKey::resource("sellers")
        .with_filter(&[("status", "PENDING")])
        .with_page(1);
    // Stand-in for the 5-minute production TTL
    let ttl = Duration::from_millis(300);
    let calls = AtomicU32::new(0);

    let calls = &calls;
    let fetch = |payload: &'static str| {
        fetcher.fetch(&key, ttl, move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(payload.to_string()) }
        })
    };

    assert_eq!(fetch("v1").await.unwrap(), "v1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Within the TTL: cached, no network call
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fetch("v2").await.unwrap(), "v1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Past the TTL: live call, same key overwritten
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(fetch("v2").await.unwrap(), "v2");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(fetch("v3").await.unwrap(), "v2");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Expired entries are removed as a side effect of the read, verified by a
/// direct storage probe underneath the cache.
#[tokio::test]
async fn expiry_deletes_row() {
    let (store, _dir) = open_store();
    let cache = CacheManager::new(store.clone(), "buyer-1", "registrations");
    let key = CacheKey::resource("registrations").with_id("reg-7");

    cache.cache_response(&key, "payload", Duration::ZERO).await;
    assert_eq!(cache.get_cached(&key).await, None);
    assert!(store
        .get("buyer-1", &cache.storage_key(&key))
        .unwrap()
        .is_none());
}

/// Writing past capacity keeps exactly the capacity's worth of entries, and
/// they are the most recently written ones.
#[tokio::test]
async fn capacity_keeps_newest() {
    let (store, _dir) = open_store();
    let capacity = 20;
    let cache = CacheManager::with_capacity(store, "buyer-1", "registrations", capacity);

    let total = 27u32;
    for i in 0..total {
        let key = CacheKey::resource("registrations").with_id(&format!("reg-{:03}", i));
        cache
            .cache_response(&key, &format!("p{}", i), Duration::from_secs(60))
            .await;
    }

    assert_eq!(cache.entry_count().await, capacity);
    for i in 0..total {
        let key = CacheKey::resource("registrations").with_id(&format!("reg-{:03}", i));
        let hit = cache.get_cached(&key).await;
        if (i as usize) < total as usize - capacity {
            assert_eq!(hit, None, "reg-{:03} should have been evicted", i);
        } else {
            assert!(hit.is_some(), "reg-{:03} should remain", i);
        }
    }

    // Idempotence: nothing further to prune
    assert_eq!(cache.prune_if_over_capacity().await, 0);
    assert_eq!(cache.prune_if_over_capacity().await, 0);
}

/// Approving a pending registration invalidates every cached list page under
/// the filter, while unrelated detail caches survive untouched.
#[tokio::test]
async fn approval_invalidates_list_pages_not_details() {
    let (store, _dir) = open_store();
    let lists = CacheManager::new(store.clone(), "admin-1", "admin_registrations");
    let details = CacheManager::new(store, "admin-1", "registrations");

    let pending = |page| {
        CacheKey::resource("sellers")
            .with_filter(&[("status", "PENDING")])
            .with_page(page)
    };
    let detail = |id: &str| CacheKey::resource("registrations").with_id(id);

    for page in 1..=3 {
        lists
            .cache_response(&pending(page), "list", Duration::from_secs(60))
            .await;
    }
    details
        .cache_response(&detail("reg-approved"), "detail", Duration::from_secs(60))
        .await;
    details
        .cache_response(&detail("reg-other"), "detail", Duration::from_secs(60))
        .await;

    // Approve reg-approved: prefix-invalidate the filtered lists, key-invalidate
    // the one detail record
    lists.invalidate_prefix(&pending(1).filter_prefix()).await;
    details.invalidate(&detail("reg-approved")).await;

    for page in 1..=3 {
        assert_eq!(lists.get_cached(&pending(page)).await, None);
    }
    assert_eq!(details.get_cached(&detail("reg-approved")).await, None);
    assert_eq!(
        details.get_cached(&detail("reg-other")).await,
        Some("detail".to_string())
    );
}

/// Owner partitions never leak across accounts sharing a device.
#[tokio::test]
async fn owner_partitions_isolated() {
    let (store, _dir) = open_store();
    let cart = CartStore::new(store.clone());

    cart.add(
        "buyer-a",
        CartItem {
            product_id: "sku-1".into(),
            title: "Teapot".into(),
            unit_price_cents: 2500,
            quantity: 1,
        },
    )
    .await
    .unwrap();

    assert!(cart.list("buyer-b").await.unwrap().is_empty());
    assert_eq!(cart.list("buyer-a").await.unwrap().len(), 1);
}

/// Logout preserves the outgoing owner's cart; login rehydrates it.
#[tokio::test]
async fn cart_survives_logout_login() {
    let dir = TempDir::new().unwrap();
    let item = CartItem {
        product_id: "sku-9".into(),
        title: "Kettle".into(),
        unit_price_cents: 8000,
        quantity: 2,
    };

    // Session 1: add, then "logout" by dropping everything
    {
        let store = Arc::new(Store::open_at(dir.path()).unwrap());
        CartStore::new(store).add("buyer-a", item.clone()).await.unwrap();
    }

    // Session 2: fresh process, same owner logs back in
    let store = Arc::new(Store::open_at(dir.path()).unwrap());
    let items = CartStore::new(store).list("buyer-a").await.unwrap();
    assert_eq!(items, vec![item]);
}

/// ServerError twice then success resolves in exactly three invocations;
/// BadRequest is never retried.
#[tokio::test]
async fn retry_respects_taxonomy() {
    let calls = AtomicU32::new(0);
    let result = run_with_retry(&fast_policy(), |_| {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n <= 2 {
                Err(classify(503, r#"{"message":"overloaded"}"#))
            } else {
                Ok("registration-created")
            }
        }
    })
    .await;
    assert_eq!(result, Ok("registration-created"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let calls = AtomicU32::new(0);
    let result: Result<(), _> = run_with_retry(&fast_policy(), |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(classify(400, r#"{"errors":{"title":"required"}}"#)) }
    })
    .await;
    assert_eq!(result, Err(ApiError::BadRequest("required".into())));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Classifier flags drive the UI branches: 401 forces re-auth, 404 stops
/// retrying, 503 invites another attempt.
#[test]
fn classifier_flags() {
    assert!(classify(401, "{}").requires_reauth());
    assert!(!classify(404, "{}").is_retryable());
    assert!(classify(503, "{}").is_retryable());
}

/// Going offline redirects reads to the cache; reconnecting resumes live
/// fetches.
#[tokio::test]
async fn offline_reads_come_from_cache() {
    let (store, _dir) = open_store();
    let cache = CacheManager::new(store, "buyer-1", "registrations");
    let conn = Arc::new(ManualConnectivity::new(true));
    let fetcher = CachedFetcher::new(cache, fast_policy(), conn.clone());

    let cached_key = CacheKey::resource("registrations").with_id("reg-1");
    let uncached_key = CacheKey::resource("registrations").with_id("reg-2");

    fetcher
        .fetch(&cached_key, Duration::from_secs(60), |_| async {
            Ok("warm".to_string())
        })
        .await
        .unwrap();

    conn.set_online(false);

    // Cached resource still served
    let hit = fetcher
        .fetch(&cached_key, Duration::from_secs(60), |_| async {
            panic!("no network while offline")
        })
        .await
        .unwrap();
    assert_eq!(hit, "warm");

    // Uncached resource fails without touching the network
    let miss = fetcher
        .fetch(&uncached_key, Duration::from_secs(60), |_| async {
            panic!("no network while offline")
        })
        .await;
    assert!(matches!(miss, Err(ApiError::Network(_))));

    // Back online: live fetch works again
    conn.set_online(true);
    let fresh = fetcher
        .fetch(&uncached_key, Duration::from_secs(60), |_| async {
            Ok("live".to_string())
        })
        .await
        .unwrap();
    assert_eq!(fresh, "live");
}

/// Identical behavior on the flat-file backend: the storage contract is
/// backend independent.
#[tokio::test]
async fn flatfile_backend_same_semantics() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open_flatfile_at(dir.path()).unwrap());
    let cache = CacheManager::with_capacity(store.clone(), "buyer-1", "registrations", 3);

    for i in 0..5u32 {
        let key = CacheKey::resource("registrations").with_id(&format!("reg-{}", i));
        cache
            .cache_response(&key, &format!("p{}", i), Duration::from_secs(60))
            .await;
    }
    assert_eq!(cache.entry_count().await, 3);

    let newest = CacheKey::resource("registrations").with_id("reg-4");
    assert_eq!(cache.get_cached(&newest).await, Some("p4".to_string()));

    let cart = CartStore::new(store);
    cart.add(
        "buyer-1",
        CartItem {
            product_id: "sku-1".into(),
            title: "Bowl".into(),
            unit_price_cents: 900,
            quantity: 1,
        },
    )
    .await
    .unwrap();
    assert!(cart.list("buyer-2").await.unwrap().is_empty());
}
