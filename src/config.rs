//! Pool configuration.

use std::time::Duration;

use crate::error::PoolError;

/// Configuration for a [`Pool`](crate::pool::Pool).
///
/// Mirrors the data model of §3 "Pool state": sizing bounds, queueing
/// bounds, and the cadences the reaper and maintainer run on. Constructed
/// once and treated as immutable for the lifetime of the pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum population the maintainer tries to keep warm
    /// (`free + lent + creating`) when the pool is idle.
    pub min: usize,
    /// Hard cap on `free + lent + creating + destroying`.
    pub max: usize,
    /// Burst cap on concurrent pending creations. `None` = unlimited.
    pub max_creating: Option<usize>,
    /// Cap on `|aging| + |ageless|`. `None` = unlimited.
    pub max_requests: Option<usize>,
    /// Default acquire timeout applied when a request doesn't override it.
    /// `None` means the request is ageless (no deadline).
    pub acquire_timeout: Option<Duration>,
    /// Idle lifetime after which a free resource is reaped. Zero disables
    /// the idle sweep.
    pub idle_timeout: Duration,
    /// Cadence of the idle sweep.
    pub idle_check_interval: Duration,
    /// Absolute lifetime after which a resource is reaped regardless of
    /// use. Zero disables the expiry sweep.
    pub expire_timeout: Duration,
    /// Cadence of the expiry sweep.
    pub expire_check_interval: Duration,
    /// Cadence of periodic (as opposed to on-demand) maintenance passes.
    pub maintenance_interval: Duration,
    /// Maximum delay before an on-demand maintenance request is honored.
    pub maintenance_latency: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let idle_check_interval = Duration::from_millis(1000);
        let expire_check_interval = Duration::from_millis(1000);
        Self {
            min: 0,
            max: 1024,
            max_creating: None,
            max_requests: None,
            acquire_timeout: None,
            idle_timeout: Duration::ZERO,
            idle_check_interval,
            expire_timeout: Duration::ZERO,
            expire_check_interval,
            maintenance_interval: idle_check_interval.min(expire_check_interval),
            maintenance_latency: Duration::from_millis(50),
        }
    }
}

impl PoolConfig {
    /// Validate this configuration, following the teacher's
    /// `PoolConfig::validate` convention.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max == 0 {
            return Err(PoolError::Configuration(
                "max must be greater than 0".into(),
            ));
        }
        if self.min > self.max {
            return Err(PoolError::Configuration(format!(
                "min ({}) must not exceed max ({})",
                self.min, self.max
            )));
        }
        if let Some(max_creating) = self.max_creating {
            if max_creating == 0 {
                return Err(PoolError::Configuration(
                    "max_creating must be greater than 0 when set".into(),
                ));
            }
        }
        if let Some(max_requests) = self.max_requests {
            if max_requests == 0 {
                return Err(PoolError::Configuration(
                    "max_requests must be greater than 0 when set".into(),
                ));
            }
        }
        if self.maintenance_interval.is_zero() {
            return Err(PoolError::Configuration(
                "maintenance_interval must be greater than 0".into(),
            ));
        }
        if self.maintenance_latency.is_zero() {
            return Err(PoolError::Configuration(
                "maintenance_latency must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Per-call overrides accepted by [`Pool::acquire`](crate::pool::Pool::acquire).
#[derive(Debug, Clone, Default)]
pub struct AcquireOptions {
    /// Overrides the pool's default `acquire_timeout`. `Some(None)` makes
    /// this specific request ageless even if the pool has a default
    /// timeout; `None` (the field's own default) inherits the pool's
    /// default.
    pub timeout: Option<Option<Duration>>,
    /// Caller-supplied call-site diagnostic, attached to any resulting
    /// error (§3 "Request record").
    pub origin: Option<String>,
}
