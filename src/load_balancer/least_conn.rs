//! Least Connections load balancing strategy.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;

use crate::load_balancer::backend::Backend;
use crate::load_balancer::pool::ServerPool;
use crate::load_balancer::tracker::ConnectionTracker;
use crate::load_balancer::{NoBackendAvailable, SelectionPolicy};

/// Least connections selector.
/// Selects the live backend with the minimum number of in-flight requests.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

/// Index of the live backend with the fewest connections.
/// In case of tie, the first one in pool order wins.
fn least_loaded<'a>(
    addresses: impl Iterator<Item = &'a str>,
    alive: &[bool],
    counts: &HashMap<String, usize>,
) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, address) in addresses.enumerate() {
        if !alive.get(index).copied().unwrap_or(false) {
            continue;
        }
        let count = counts.get(address).copied().unwrap_or(0);
        match best {
            Some((_, best_count)) if best_count <= count => {}
            _ => best = Some((index, count)),
        }
    }
    best.map(|(index, _)| index)
}

#[async_trait]
impl SelectionPolicy for LeastConnections {
    fn name(&self) -> &'static str {
        "least-connections"
    }

    async fn select(
        &self,
        pool: &ServerPool,
        tracker: &ConnectionTracker,
    ) -> Result<Arc<dyn Backend>, NoBackendAvailable> {
        let no_backend = NoBackendAvailable { pool_size: pool.len() };

        // Probe outside the lock, then decide on one consistent snapshot.
        let alive = join_all(pool.iter().map(|b| b.is_alive())).await;
        let counts = tracker.snapshot();

        let index = least_loaded(pool.addresses(), &alive, &counts).ok_or(no_backend)?;
        pool.get(index).cloned().ok_or(no_backend)
    }
}
