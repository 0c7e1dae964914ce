//! Observability events (§6 "Events").
//!
//! Delivery is fire-and-forget, the way the closest example repo's
//! `EventBus` (`nebula_resource::events`) delivers lifecycle events over a
//! `tokio::sync::broadcast` channel: producers never block on a slow or
//! absent subscriber.

use tokio::sync::broadcast;

use crate::error::AcquireError;

/// Default capacity of the broadcast channel backing [`EventBus`].
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Events emitted during pool operation. Every variant is named after an
/// operation in §6; subscribers receive cloned copies.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// A request was enqueued (aging or ageless).
    EnqueueRequest { request_id: u64 },
    /// A queued request failed (timeout, drain, or admission rejection).
    ServeError { request_id: u64, message: String },
    /// A queued request was served with a resource.
    ServeSuccess { request_id: u64 },
    /// A new resource instance was created successfully.
    CreateSuccess,
    /// A resource creation attempt failed.
    CreateError { message: String },
    /// A resource was released back toward the free list.
    Release,
    /// A resource was permanently destroyed.
    Destroy,
    /// The pool finished draining.
    Drain,
}

impl PoolEvent {
    pub(crate) fn serve_error(request_id: u64, error: &AcquireError) -> Self {
        PoolEvent::ServeError {
            request_id,
            message: error.to_string(),
        }
    }
}

/// Thin wrapper around a `broadcast::Sender` that never errors on send —
/// "no receivers" and "receiver lagged" are both acceptable outcomes for
/// a fire-and-forget observability channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PoolEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: PoolEvent) {
        // A `SendError` here just means there are currently no
        // subscribers; that is not a failure worth propagating.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
