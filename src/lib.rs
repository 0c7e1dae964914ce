//! A generic, bounded async resource pool.
//!
//! The pool amortizes the cost of creating expensive, reusable resources
//! (database connections, file handles, sockets, workers) by maintaining
//! a bounded population of them, matching requests to free instances,
//! and governing their creation, reuse, expiry and destruction. Callers
//! supply a [`Factory`] describing how to create, destroy, validate and
//! compare their resource; the pool supplies the queueing, accounting,
//! reaping and draining around it.
//!
//! ```no_run
//! use respool::{Factory, Pool, PoolConfig, AcquireOptions};
//! use std::future::Future;
//!
//! struct Widgets;
//!
//! impl Factory for Widgets {
//!     type Value = u64;
//!     type Error = std::io::Error;
//!
//!     fn create(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send {
//!         async { Ok(42) }
//!     }
//!
//!     fn destroy(&self, _value: u64) -> impl Future<Output = ()> + Send {
//!         async {}
//!     }
//!
//!     fn compare(&self, a: &u64, b: &u64) -> bool {
//!         a == b
//!     }
//! }
//!
//! # async fn run() -> respool::PoolResult<()> {
//! let pool = Pool::new(Widgets, PoolConfig::default())?;
//! let value = pool.acquire(AcquireOptions::default()).await?;
//! pool.release(value);
//! pool.drain().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod events;
mod factory;
mod pool;
mod record;
mod registry;
mod request;
mod state;

pub use config::{AcquireOptions, PoolConfig};
pub use error::{AcquireError, ErrorCode, PoolError, PoolResult};
pub use events::PoolEvent;
pub use factory::Factory;
pub use pool::{Pool, PoolStats};

/// Convenience re-export of the pieces most callers need.
pub mod prelude {
    pub use crate::{AcquireError, AcquireOptions, ErrorCode, Factory, Pool, PoolConfig, PoolError};
}
