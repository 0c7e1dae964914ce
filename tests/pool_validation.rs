//! Idle reuse, expiry-not-refreshed, and validate-on-return scenarios.

mod support;

use std::time::Duration;

use respool::{AcquireOptions, Pool, PoolConfig};
use support::TestFactory;

#[tokio::test]
async fn idle_reuse_updates_idle_at_then_reaps_after_timeout() {
    support::init_tracing();
    let factory = TestFactory::default();
    let config = PoolConfig {
        min: 1,
        max: 4,
        idle_timeout: Duration::from_millis(150),
        idle_check_interval: Duration::from_millis(20),
        maintenance_interval: Duration::from_millis(20),
        maintenance_latency: Duration::from_millis(10),
        acquire_timeout: Some(Duration::from_secs(2)),
        ..Default::default()
    };
    let pool = Pool::new(factory.clone(), config).unwrap();

    let first = pool.acquire(AcquireOptions::default()).await.unwrap();
    pool.release(first);
    tokio::time::sleep(Duration::from_millis(60)).await;

    let second = pool.acquire(AcquireOptions::default()).await.unwrap();
    assert_eq!(first, second);
    pool.release(second);

    // Let it sit idle past `idle_timeout` with no release refreshing it.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(factory.destroyed_count() >= 1);

    let third = pool.acquire(AcquireOptions::default()).await.unwrap();
    assert_ne!(third, second);
    pool.release(third);
}

#[tokio::test]
async fn expiry_is_not_refreshed_by_reuse() {
    support::init_tracing();
    let factory = TestFactory::default();
    let config = PoolConfig {
        min: 1,
        max: 4,
        expire_timeout: Duration::from_millis(200),
        expire_check_interval: Duration::from_millis(20),
        maintenance_interval: Duration::from_millis(20),
        maintenance_latency: Duration::from_millis(10),
        acquire_timeout: Some(Duration::from_secs(2)),
        ..Default::default()
    };
    let pool = Pool::new(factory, config).unwrap();

    let value = pool.acquire(AcquireOptions::default()).await.unwrap();
    pool.release(value);

    // Repeated quick acquire/release cycles must keep returning the same
    // value: reuse must not push the absolute expiry back.
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let v = pool.acquire(AcquireOptions::default()).await.unwrap();
        assert_eq!(v, value);
        pool.release(v);
    }

    // Once the original `expire_timeout` has elapsed from the resource's
    // first creation, it must be reaped and a new one created instead.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let next = pool.acquire(AcquireOptions::default()).await.unwrap();
    assert_ne!(next, value);
    pool.release(next);
}

#[tokio::test]
async fn invalid_resource_is_destroyed_instead_of_reused() {
    support::init_tracing();
    let factory = TestFactory::default();
    let config = PoolConfig {
        min: 0,
        max: 4,
        acquire_timeout: Some(Duration::from_secs(2)),
        ..Default::default()
    };
    let pool = Pool::new(factory.clone(), config).unwrap();

    let value = pool.acquire(AcquireOptions::default()).await.unwrap();
    factory.set_always_invalid(true);
    pool.release(value);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(factory.destroyed_count(), 1);

    factory.set_always_invalid(false);
    let next = pool.acquire(AcquireOptions::default()).await.unwrap();
    assert_ne!(next, value);
    pool.release(next);
}

#[tokio::test]
async fn acquire_sync_destroys_invalid_free_resources_without_leaking() {
    support::init_tracing();
    let factory = TestFactory::default();
    let config = PoolConfig {
        min: 0,
        max: 4,
        acquire_timeout: Some(Duration::from_secs(2)),
        ..Default::default()
    };
    let pool = Pool::new(factory.clone(), config).unwrap();

    // Release while still valid, so the value actually lands in `free`.
    let value = pool.acquire(AcquireOptions::default()).await.unwrap();
    pool.release(value);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.stats().free, 1);

    // Now invalidate it and let `acquire_sync` discover that on its own
    // `take_free_for_serve` call; it must find nothing to serve, but still
    // hand the invalidated record off for destruction instead of dropping
    // it (which would leak it as a permanently-uncounted `destroying`).
    factory.set_always_invalid(true);
    assert!(pool.acquire_sync(AcquireOptions::default()).is_none());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(factory.destroyed_count(), 1);
    assert_eq!(pool.stats().total(), 0);

    factory.set_always_invalid(false);
    let next = pool.acquire(AcquireOptions::default()).await.unwrap();
    assert_ne!(next, value);
    pool.release(next);
}
