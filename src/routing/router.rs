//! Request orchestration.
//!
//! # Responsibilities
//! - Hold the current pool and selection policy (swappable on reload)
//! - Per request: select → track → forward → release
//! - Keep the connection count held until the response body is finished
//!
//! # Design Decisions
//! - The tracker outlives reloads so in-flight requests release correctly
//! - The round-robin cursor survives a reload unless the algorithm changes
//! - A failed reload leaves the running state untouched

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::StreamExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::validation::validate_config;
use crate::config::{Algorithm, ConfigError, ConfigSnapshot};
use crate::load_balancer::{
    policy_for, Backend, ConnectionGuard, ConnectionTracker, ForwardError, NoBackendAvailable,
    SelectionPolicy, ServerPool,
};
use crate::observability::metrics;

/// Why a request could not be served by a backend.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    NoBackendAvailable(#[from] NoBackendAvailable),

    #[error(transparent)]
    Forward(#[from] ForwardError),
}

/// Address and in-flight count of one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendStatus {
    pub address: String,
    pub active_connections: usize,
}

struct RouterState {
    pool: ServerPool,
    algorithm: Algorithm,
    policy: Arc<dyn SelectionPolicy>,
}

/// Routes each inbound request to one backend.
pub struct Router {
    state: ArcSwap<RouterState>,
    tracker: Arc<ConnectionTracker>,
    client: Client<HttpConnector, Body>,
}

impl Router {
    /// Create a router over an existing pool.
    pub fn new(pool: ServerPool, algorithm: Algorithm) -> Self {
        Self::with_client(pool, algorithm, http_client())
    }

    fn with_client(
        pool: ServerPool,
        algorithm: Algorithm,
        client: Client<HttpConnector, Body>,
    ) -> Self {
        let tracker = Arc::new(ConnectionTracker::new(pool.addresses()));
        Self {
            state: ArcSwap::from_pointee(RouterState {
                pool,
                algorithm,
                policy: policy_for(algorithm),
            }),
            tracker,
            client,
        }
    }

    /// Validate a snapshot and build HTTP backends for it.
    pub fn from_config(config: &ConfigSnapshot) -> Result<Self, ConfigError> {
        validate_config(config)?;
        let client = http_client();
        let pool = ServerPool::from_config(config, &client)?;
        Ok(Self::with_client(pool, config.algorithm, client))
    }

    /// Replace the backend pool with the one described by `config`.
    pub fn reload(&self, config: &ConfigSnapshot) -> Result<(), ConfigError> {
        validate_config(config)?;
        let pool = ServerPool::from_config(config, &self.client)?;

        let current = self.state.load_full();
        let policy = if current.algorithm == config.algorithm {
            Arc::clone(&current.policy)
        } else {
            policy_for(config.algorithm)
        };

        let next = Arc::new(RouterState {
            pool,
            algorithm: config.algorithm,
            policy,
        });
        // Publish first: requests selecting after this see only new members,
        // and late guards for removed ones are dropped by the tracker.
        self.state.store(Arc::clone(&next));
        self.tracker.retain(next.pool.addresses());

        tracing::info!(
            backends = next.pool.len(),
            policy = next.policy.name(),
            "Backend pool reloaded"
        );
        Ok(())
    }

    /// Active selection algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.state.load().algorithm
    }

    /// Shared connection accounting.
    pub fn tracker(&self) -> &Arc<ConnectionTracker> {
        &self.tracker
    }

    /// Backends in pool order with their current counts.
    pub fn backends(&self) -> Vec<BackendStatus> {
        let state = self.state.load();
        let counts = self.tracker.snapshot();
        state
            .pool
            .addresses()
            .map(|address| BackendStatus {
                address: address.to_string(),
                active_connections: counts.get(address).copied().unwrap_or(0),
            })
            .collect()
    }

    /// Pick a backend for one request without forwarding anything.
    pub async fn select(&self) -> Result<Arc<dyn Backend>, NoBackendAvailable> {
        let state = self.state.load_full();
        state.policy.select(&state.pool, &self.tracker).await
    }

    /// Forward one request to a selected backend.
    pub async fn route(&self, request: Request<Body>) -> Result<Response<Body>, RouteError> {
        let start = Instant::now();
        let method = request.method().to_string();

        let backend = match self.select().await {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!(error = %e, "No backend available");
                let err = RouteError::from(e);
                metrics::record_request(&method, err.status_code().as_u16(), "none", start);
                return Err(err);
            }
        };

        let guard = self.tracker.track(backend.address());
        tracing::info!(backend = %backend.address(), "Forwarding request");

        let address = backend.address();
        match backend.forward(request).await {
            Ok(response) => {
                metrics::record_request(&method, response.status().as_u16(), address, start);
                Ok(response.map(|body| release_on_drop(body, guard)))
            }
            Err(e) => {
                tracing::error!(backend = %address, error = %e, "Upstream error");
                let err = RouteError::from(e);
                metrics::record_request(&method, err.status_code().as_u16(), address, start);
                Err(err)
            }
        }
    }
}

fn http_client() -> Client<HttpConnector, Body> {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// Tie the connection count to the response body so it covers streaming.
fn release_on_drop(body: Body, guard: ConnectionGuard) -> Body {
    let stream = body.into_data_stream().map(move |chunk| {
        let _held = &guard;
        chunk
    });
    Body::from_stream(stream)
}
