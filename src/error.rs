//! Error types for pool operations.

use std::fmt;
use thiserror::Error;

/// Result type for pool operations.
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Stable error codes for acquire failures (§6 "Error codes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// `acquire` was called while the pool was draining.
    AcquireDuringDraining,
    /// A queued request's deadline passed before a resource became free.
    AcquireTimeout,
    /// A queued request was cancelled because `drain` was called.
    AbortedByDrain,
    /// `acquire` was rejected because `max_requests` was already reached.
    MaxRequestsLimit,
}

impl ErrorCode {
    /// The stable string form of this code, as referenced in §6.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::AcquireDuringDraining => "ACQUIRE_DURING_DRAINING",
            ErrorCode::AcquireTimeout => "ACQUIRE_TIMEOUT_ERROR",
            ErrorCode::AbortedByDrain => "ACQUIRE_ABORTED_BY_DRAIN",
            ErrorCode::MaxRequestsLimit => "MAX_REQUESTS_LIMIT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured acquire failure: stable code, message, and the captured
/// call-site origin of the acquire that failed (§7 "Propagation policy").
#[derive(Debug, Clone)]
pub struct AcquireError {
    /// The stable error code.
    pub code: ErrorCode,
    /// A human-readable message.
    pub message: String,
    /// The `origin` captured when the request was enqueued, if any.
    pub origin: Option<String>,
}

impl AcquireError {
    pub(crate) fn new(code: ErrorCode, origin: Option<String>) -> Self {
        let message = match code {
            ErrorCode::AcquireDuringDraining => "acquire called while pool is draining",
            ErrorCode::AcquireTimeout => "acquire timed out waiting for a resource",
            ErrorCode::AbortedByDrain => "acquire aborted because the pool started draining",
            ErrorCode::MaxRequestsLimit => "the pool's max_requests limit was reached",
        }
        .to_string();
        Self {
            code,
            message,
            origin,
        }
    }
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "{} ({}) [origin: {origin}]", self.message, self.code),
            None => write!(f, "{} ({})", self.message, self.code),
        }
    }
}

impl std::error::Error for AcquireError {}

/// Top-level error type for the pool crate.
#[derive(Error, Debug)]
pub enum PoolError {
    /// A queued acquire failed; see [`AcquireError`] for the stable code.
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    /// The supplied [`PoolConfig`](crate::config::PoolConfig) is invalid.
    #[error("invalid pool configuration: {0}")]
    Configuration(String),
}

impl PoolError {
    /// Borrow the [`ErrorCode`] if this is an [`PoolError::Acquire`].
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            PoolError::Acquire(e) => Some(e.code),
            PoolError::Configuration(_) => None,
        }
    }
}
