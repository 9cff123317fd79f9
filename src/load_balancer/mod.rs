//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Router receives a request
//!     → pool.rs (ordered backends)
//!     → Apply selection policy:
//!         - round_robin.rs (rotate through live backends)
//!         - least_conn.rs (pick live backend with fewest connections)
//!     → tracker.rs (count the request against the chosen backend)
//!     → backend.rs (forward and stream the response)
//!     → tracker.rs guard dropped, count released
//! ```
//!
//! # Design Decisions
//! - Policies hold only their own state (the round-robin cursor)
//! - Connection counts live in one shared tracker, not in backends
//! - Liveness is probed per decision; nothing is cached
//! - An all-dead pool is an explicit `NoBackendAvailable`, never a spin

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Algorithm;

pub mod backend;
pub mod least_conn;
pub mod pool;
pub mod round_robin;
pub mod tracker;

pub use backend::{Backend, ForwardError, HttpBackend};
pub use least_conn::LeastConnections;
pub use pool::ServerPool;
pub use round_robin::RoundRobin;
pub use tracker::{ConnectionGuard, ConnectionTracker};

/// Every backend in the pool failed its liveness probe (or the pool is empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no backend available: none of {pool_size} backends is alive")]
pub struct NoBackendAvailable {
    pub pool_size: usize,
}

/// Picks one backend per request.
#[async_trait]
pub trait SelectionPolicy: Send + Sync + fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Choose a live backend from `pool`.
    async fn select(
        &self,
        pool: &ServerPool,
        tracker: &ConnectionTracker,
    ) -> Result<Arc<dyn Backend>, NoBackendAvailable>;
}

/// Build the policy for a configured algorithm.
pub fn policy_for(algorithm: Algorithm) -> Arc<dyn SelectionPolicy> {
    match algorithm {
        Algorithm::RoundRobin => Arc::new(RoundRobin::new()),
        Algorithm::LeastConnections => Arc::new(LeastConnections::new()),
    }
}
