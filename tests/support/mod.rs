//! Shared test factory used across the integration tests.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use respool::Factory;

/// Install a tracing subscriber for the duration of the test process, so
/// the pool's `tracing::debug!` calls are visible under `RUST_LOG`.
/// Safe to call from every test; only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

#[derive(Debug, thiserror::Error)]
#[error("create failed")]
pub struct CreateError;

/// A resource factory whose behavior (creation delay, failure count,
/// validity) is configurable at runtime through shared atomics, so a
/// single instance can model every scenario in the spec's concrete
/// scenario list.
#[derive(Clone)]
pub struct TestFactory {
    next_value: Arc<AtomicU64>,
    create_delay: Arc<parking_lot::Mutex<Duration>>,
    fail_next_creates: Arc<AtomicU64>,
    always_invalid: Arc<std::sync::atomic::AtomicBool>,
    created: Arc<AtomicU64>,
    destroyed: Arc<AtomicU64>,
}

impl Default for TestFactory {
    fn default() -> Self {
        Self {
            next_value: Arc::new(AtomicU64::new(1)),
            create_delay: Arc::new(parking_lot::Mutex::new(Duration::ZERO)),
            fail_next_creates: Arc::new(AtomicU64::new(0)),
            always_invalid: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            created: Arc::new(AtomicU64::new(0)),
            destroyed: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl TestFactory {
    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock() = delay;
    }

    pub fn fail_next(&self, n: u64) {
        self.fail_next_creates.store(n, Ordering::SeqCst);
    }

    pub fn set_always_invalid(&self, invalid: bool) {
        self.always_invalid.store(invalid, Ordering::SeqCst);
    }

    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed_count(&self) -> u64 {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl Factory for TestFactory {
    type Value = u64;
    type Error = CreateError;

    fn create(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send {
        let delay = *self.create_delay.lock();
        let fail_next_creates = Arc::clone(&self.fail_next_creates);
        let next_value = Arc::clone(&self.next_value);
        let created = Arc::clone(&self.created);
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let remaining = fail_next_creates.load(Ordering::SeqCst);
            if remaining > 0 {
                fail_next_creates.store(remaining - 1, Ordering::SeqCst);
                return Err(CreateError);
            }
            created.fetch_add(1, Ordering::SeqCst);
            Ok(next_value.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn destroy(&self, _value: u64) -> impl Future<Output = ()> + Send {
        let destroyed = Arc::clone(&self.destroyed);
        async move {
            destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn validate(&self, _value: &u64) -> bool {
        !self.always_invalid.load(Ordering::SeqCst)
    }

    fn compare(&self, a: &u64, b: &u64) -> bool {
        a == b
    }
}

/// A factory whose `create` never resolves, used to exercise acquire
/// timeouts without any creation ever completing.
#[derive(Clone, Default)]
pub struct NeverFactory;

impl Factory for NeverFactory {
    type Value = u64;
    type Error = CreateError;

    fn create(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send {
        std::future::pending()
    }

    fn destroy(&self, _value: u64) -> impl Future<Output = ()> + Send {
        std::future::ready(())
    }

    fn compare(&self, a: &u64, b: &u64) -> bool {
        a == b
    }
}
