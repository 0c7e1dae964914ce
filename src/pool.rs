//! The pool itself: wires the request queue, registry, factory driver,
//! reaper and drain controller together behind one mutex (§5).
//!
//! Grounded on the teacher's `PoolInner::new_arc` convention (construct
//! the shared state behind an `Arc`, then spawn its maintenance tasks)
//! from `musqlite/src/pool/inner.rs`, adapted from semaphore/atomic-based
//! accounting to the single-mutex actor model this pool's contract
//! requires.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::config::{AcquireOptions, PoolConfig};
use crate::error::{AcquireError, ErrorCode, PoolError, PoolResult};
use crate::events::{EventBus, PoolEvent};
use crate::factory::Factory;
use crate::request::Request;
use crate::state::{run_maintenance, storage_check, MaintenanceOutcome, PoolState};

struct Shared<F: Factory> {
    factory: F,
    config: PoolConfig,
    state: Mutex<PoolState<F::Value>>,
    events: EventBus,
    maintenance_interval_ms: AtomicU32,
}

/// A bounded, async resource pool over resources produced by `F`.
///
/// Cloning a `Pool` is cheap and shares the same underlying state, the
/// way cloning the teacher's connection pool handle does.
pub struct Pool<F: Factory> {
    shared: Arc<Shared<F>>,
}

/// A point-in-time snapshot of the pool's registry accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub free: usize,
    pub lent: usize,
    pub creating: usize,
    pub destroying: usize,
    pub queued: usize,
    pub draining: bool,
}

impl PoolStats {
    /// `free + lent + creating + destroying` (§3 invariant 1).
    pub fn total(&self) -> usize {
        self.free + self.lent + self.creating + self.destroying
    }
}

impl<F: Factory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F: Factory> Pool<F> {
    /// Construct a pool and start its periodic maintenance task.
    pub fn new(factory: F, config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        let now = Instant::now();
        let shared = Arc::new(Shared {
            factory,
            maintenance_interval_ms: AtomicU32::new(
                config.maintenance_interval.as_millis().min(u32::MAX as u128) as u32,
            ),
            config,
            state: Mutex::new(PoolState::new(now)),
            events: EventBus::default(),
        });
        spawn_periodic_maintenance(Arc::clone(&shared));
        let pool = Self { shared };
        pool.trigger_maintenance();
        Ok(pool)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PoolEvent> {
        self.shared.events.subscribe()
    }

    /// A snapshot of the registry's accounting (§3 "Pool state"), for
    /// introspection and tests. Stale the instant it's read, like any
    /// snapshot of concurrently-mutated state.
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            free: state.registry.free.len(),
            lent: state.registry.lent.len(),
            creating: state.registry.creating,
            destroying: state.registry.destroying,
            queued: state.queue.len(),
            draining: state.draining,
        }
    }

    /// Change the periodic maintenance cadence (§6 "Pool API").
    pub fn set_maintenance_interval(&self, interval: Duration) {
        let millis = interval.as_millis().min(u32::MAX as u128) as u32;
        self.shared
            .maintenance_interval_ms
            .store(millis.max(1), Ordering::Relaxed);
    }

    /// Enqueue an acquire request and wait for it to be served or fail
    /// (§4.1). `options` may override the pool's default timeout.
    pub fn acquire(
        &self,
        options: AcquireOptions,
    ) -> impl Future<Output = PoolResult<F::Value>> + 'static {
        let shared = Arc::clone(&self.shared);
        async move {
            let (tx, rx) = oneshot::channel();
            let outcome = {
                let mut state = shared.state.lock();
                if state.draining {
                    return Err(PoolError::Acquire(AcquireError::new(
                        ErrorCode::AcquireDuringDraining,
                        options.origin,
                    )));
                }
                if let Some(max_requests) = shared.config.max_requests {
                    if state.queue.len() >= max_requests {
                        return Err(PoolError::Acquire(AcquireError::new(
                            ErrorCode::MaxRequestsLimit,
                            options.origin,
                        )));
                    }
                }

                let now = Instant::now();
                let id = state.queue.next_id();
                let deadline = options
                    .timeout
                    .unwrap_or(shared.config.acquire_timeout)
                    .map(|timeout| now + timeout);
                let request = Request::new(id, now, deadline, options.origin, tx);

                shared.events.emit(PoolEvent::EnqueueRequest { request_id: id });
                match deadline {
                    Some(_) => state.queue.push_aging(request),
                    None => state.queue.push_ageless(request),
                }
                run_maintenance(&mut state, &shared.config, &shared.factory, now)
            };
            apply_outcome(&shared, outcome);

            match rx.await {
                Ok(result) => result.map_err(PoolError::Acquire),
                Err(_) => Err(PoolError::Acquire(AcquireError::new(
                    ErrorCode::AbortedByDrain,
                    None,
                ))),
            }
        }
    }

    /// Non-blocking fast path (§4.1): synthesizes a request and serves it
    /// through the normal maintenance path so accounting and events stay
    /// identical to the async route, without waiting on a channel.
    pub fn acquire_sync(&self, options: AcquireOptions) -> Option<F::Value> {
        let now = Instant::now();
        let (tx, rx) = oneshot::channel();
        let (outcome, destroys) = {
            let mut state = self.shared.state.lock();
            let id = state.queue.next_id();
            if state.draining {
                let request = Request::new(id, now, None, options.origin, tx);
                request.fail(ErrorCode::AbortedByDrain);
                (None, Vec::new())
            } else {
                let (value, invalid) = state.registry.take_free_for_serve(&self.shared.factory, id);
                state.registry.destroying += invalid.len();
                for _ in &invalid {
                    self.shared.events.emit(PoolEvent::Destroy);
                }
                match value {
                    Some(value) => {
                        self.shared.events.emit(PoolEvent::ServeSuccess { request_id: id });
                        let request = Request::new(id, now, None, options.origin, tx);
                        request.complete(Ok(value));
                        let outcome =
                            run_maintenance(&mut state, &self.shared.config, &self.shared.factory, now);
                        (outcome, invalid)
                    }
                    None => (None, invalid),
                }
            }
        };
        self.spawn_destroys(destroys);
        apply_outcome(&self.shared, outcome);
        rx.try_recv().ok().and_then(|result| result.ok())
    }

    /// Return a resource to the pool (§4.2 "Release").
    pub fn release(&self, value: F::Value) {
        let now = Instant::now();
        let outcome = {
            let mut state = self.shared.state.lock();
            let Some(lent) = state.registry.take_lent(&self.shared.factory, &value) else {
                return;
            };
            self.shared.events.emit(PoolEvent::Release);
            let record = lent.into_free(now);
            let to_destroy = storage_check(
                &mut state,
                &self.shared.factory,
                record.value,
                record.created_at,
                record.expires_at,
                now,
            );
            let mut destroys = Vec::new();
            if let Some(value) = to_destroy {
                self.shared.events.emit(PoolEvent::Destroy);
                destroys.push(value);
            }
            let outcome = run_maintenance(&mut state, &self.shared.config, &self.shared.factory, now);
            (outcome, destroys)
        };
        let (outcome, destroys) = outcome;
        self.spawn_destroys(destroys);
        apply_outcome(&self.shared, outcome);
    }

    /// Permanently remove a resource from the pool (§4.2 "Destroy"),
    /// whether it is currently lent or sitting free. Idempotent: destroying
    /// an unknown value is a silent no-op.
    pub fn destroy(&self, value: F::Value) {
        let (destroy, outcome) = {
            let mut state = self.shared.state.lock();
            let found = state
                .registry
                .take_lent(&self.shared.factory, &value)
                .map(|lent| lent.value)
                .or_else(|| {
                    state
                        .registry
                        .take_free_matching(&self.shared.factory, &value)
                        .map(|record| record.value)
                });
            let Some(value) = found else {
                return;
            };
            state.registry.destroying += 1;
            let now = Instant::now();
            let outcome = run_maintenance(&mut state, &self.shared.config, &self.shared.factory, now);
            (value, outcome)
        };
        self.shared.events.emit(PoolEvent::Destroy);
        self.spawn_destroys(vec![destroy]);
        apply_outcome(&self.shared, outcome);
    }

    /// Drain the pool (§4.6): cancel queued requests, destroy free
    /// resources, then wait for every resource to finish its lifecycle.
    /// Idempotent by effect — safe to call more than once, or
    /// concurrently; every caller's future resolves once the pool is
    /// fully drained.
    pub fn drain(&self) -> impl Future<Output = ()> + 'static {
        let shared = Arc::clone(&self.shared);
        async move {
            let now = Instant::now();
            let (outcome, total) = {
                let mut state = shared.state.lock();
                state.draining = true;
                let outcome = run_maintenance(&mut state, &shared.config, &shared.factory, now);
                (outcome, state.total())
            };
            apply_outcome(&shared, outcome);

            let mut remaining = total;
            if remaining > 0 {
                let mut ticker = tokio::time::interval(shared.config.maintenance_latency);
                loop {
                    ticker.tick().await;
                    remaining = shared.state.lock().total();
                    if remaining == 0 {
                        break;
                    }
                }
            }
            shared.events.emit(PoolEvent::Drain);
        }
    }

    fn trigger_maintenance(&self) {
        let now = Instant::now();
        let outcome = {
            let mut state = self.shared.state.lock();
            run_maintenance(&mut state, &self.shared.config, &self.shared.factory, now)
        };
        apply_outcome(&self.shared, outcome);
    }

    fn spawn_destroys(&self, values: Vec<F::Value>) {
        spawn_destroys(&self.shared, values);
    }
}

/// Apply the side effects a maintenance pass decided on: fire request
/// completions, emit events, then spawn the async create/destroy work.
/// None of this runs under the state lock.
fn apply_outcome<F: Factory>(shared: &Arc<Shared<F>>, outcome: Option<MaintenanceOutcome<F::Value>>) {
    let Some(outcome) = outcome else {
        return;
    };
    for event in &outcome.events {
        if let PoolEvent::ServeError { request_id, message } = event {
            tracing::warn!(request_id, %message, "serve failed");
        }
    }
    for event in outcome.events {
        shared.events.emit(event);
    }
    for (request, result) in outcome.completions {
        request.complete(result);
    }
    if outcome.to_create > 0 {
        spawn_creates(shared, outcome.to_create);
    }
    spawn_destroys(shared, outcome.to_destroy);
}

fn spawn_creates<F: Factory>(shared: &Arc<Shared<F>>, count: usize) {
    for _ in 0..count {
        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            let started_at = Instant::now();
            match shared.factory.create().await {
                Ok(value) => {
                    tracing::debug!("resource created");
                    shared.events.emit(PoolEvent::CreateSuccess);
                    let expires_at = if shared.config.expire_timeout.is_zero() {
                        None
                    } else {
                        Some(started_at + shared.config.expire_timeout)
                    };
                    let now = Instant::now();
                    let outcome = {
                        let mut state = shared.state.lock();
                        state.registry.creating = state.registry.creating.saturating_sub(1);
                        let to_destroy = storage_check(
                            &mut state,
                            &shared.factory,
                            value,
                            started_at,
                            expires_at,
                            now,
                        );
                        let mut destroys = Vec::new();
                        if let Some(value) = to_destroy {
                            shared.events.emit(PoolEvent::Destroy);
                            destroys.push(value);
                        }
                        let outcome =
                            run_maintenance(&mut state, &shared.config, &shared.factory, now);
                        (outcome, destroys)
                    };
                    let (outcome, destroys) = outcome;
                    spawn_destroys(&shared, destroys);
                    apply_outcome(&shared, outcome);
                }
                Err(error) => {
                    tracing::warn!(%error, "resource creation failed");
                    shared.events.emit(PoolEvent::CreateError {
                        message: error.to_string(),
                    });
                    if let Some(delay) = shared.factory.backoff(1) {
                        // Keep the creating slot reserved for `delay`: the
                        // backoff *is* the rate limit (§9 "Backoff
                        // semantics"), not merely a pause before retrying.
                        tokio::time::sleep(delay).await;
                    }
                    let now = Instant::now();
                    let outcome = {
                        let mut state = shared.state.lock();
                        state.registry.creating = state.registry.creating.saturating_sub(1);
                        run_maintenance(&mut state, &shared.config, &shared.factory, now)
                    };
                    apply_outcome(&shared, outcome);
                }
            }
        });
    }
}

fn spawn_destroys<F: Factory>(shared: &Arc<Shared<F>>, values: Vec<F::Value>) {
    for value in values {
        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            shared.factory.destroy(value).await;
            let now = Instant::now();
            let outcome = {
                let mut state = shared.state.lock();
                state.registry.destroying = state.registry.destroying.saturating_sub(1);
                run_maintenance(&mut state, &shared.config, &shared.factory, now)
            };
            apply_outcome(&shared, outcome);
        });
    }
}

fn spawn_periodic_maintenance<F: Factory>(shared: Arc<Shared<F>>) {
    tokio::spawn(async move {
        loop {
            let millis = shared.maintenance_interval_ms.load(Ordering::Relaxed).max(1);
            tokio::time::sleep(Duration::from_millis(millis as u64)).await;
            if shared.state.lock().draining {
                break;
            }
            let now = Instant::now();
            let outcome = {
                let mut state = shared.state.lock();
                run_maintenance(&mut state, &shared.config, &shared.factory, now)
            };
            apply_outcome(&shared, outcome);
        }
    });
}
