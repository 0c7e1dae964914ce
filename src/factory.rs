//! The caller-supplied resource factory contract (§6 "Factory contract").
//!
//! `Factory` plays the role the teacher's `Resource` trait plays for a
//! connection pool, generalized away from any particular transport: the
//! pool core only ever calls `create`, `destroy`, `validate`, `compare`
//! and `backoff` through this trait.

use std::future::Future;
use std::time::Duration;

/// A caller-supplied factory for one kind of pooled resource.
///
/// Implementations should be cheap to clone/share; the pool holds one
/// instance for its entire lifetime and calls its methods concurrently
/// from spawned tasks.
pub trait Factory: Send + Sync + 'static {
    /// The opaque handle type lent out to callers.
    ///
    /// Required to be `Clone`: the registry keeps one copy for its own
    /// bookkeeping (so `release`/`destroy` can locate the record again
    /// via [`compare`](Factory::compare)) while handing the caller their
    /// own copy to use. Cheap handles (an `Arc<_>`-wrapped connection, an
    /// id, a pooled worker handle) are the expected shape, mirroring how
    /// the teacher's own `Resource::Instance` is a plain owned value.
    type Value: Clone + Send + 'static;
    /// The error type `create` can fail with. Never surfaced to acquire
    /// callers directly — only as a `createError` event (§7).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a new instance. Must eventually resolve exactly once.
    fn create(&self) -> impl Future<Output = Result<Self::Value, Self::Error>> + Send;

    /// Permanently destroy an instance. Must eventually resolve; errors
    /// are swallowed by convention (§6 "Factory contract").
    fn destroy(&self, value: Self::Value) -> impl Future<Output = ()> + Send;

    /// Check whether `value` is still usable. Called before serving a
    /// free resource and before storing a returning one. Pure, and
    /// synchronous by design: it runs inside the pool's single critical
    /// section (§5), so it must never block or perform I/O. Defaults to
    /// always-valid.
    fn validate(&self, _value: &Self::Value) -> bool {
        true
    }

    /// Equivalence relation over resource values, used to locate a
    /// record by the value a caller passed back to `release`/`destroy`.
    /// Default: identity via `PartialEq`-like byte/pointer comparison is
    /// not derivable generically, so implementations of resources that
    /// are plain handles typically compare by the handle's own `Eq` impl.
    fn compare(&self, a: &Self::Value, b: &Self::Value) -> bool;

    /// Delay to wait before retrying after a failed `create`, which also
    /// keeps the creation slot reserved for that long (§4.3, §9 "Backoff
    /// semantics"). `None` means decrement the creating slot immediately.
    fn backoff(&self, _attempt: u32) -> Option<Duration> {
        None
    }
}
