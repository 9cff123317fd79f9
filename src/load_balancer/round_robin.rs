//! Round-robin load balancing strategy.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::load_balancer::backend::Backend;
use crate::load_balancer::pool::ServerPool;
use crate::load_balancer::tracker::ConnectionTracker;
use crate::load_balancer::{NoBackendAvailable, SelectionPolicy};

/// Round-robin selector.
///
/// Keeps a shared cursor. Each selection claims the slot under the cursor,
/// then probes forward (wrapping) at most once around the pool. When the live
/// backend was found `k` slots past the claimed one, the cursor ends up
/// `k + 1` slots further than before.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: Mutex<usize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an arbitrary cursor value.
    pub fn starting_at(cursor: usize) -> Self {
        Self {
            cursor: Mutex::new(cursor),
        }
    }

    /// Current cursor value.
    pub fn cursor(&self) -> usize {
        *self.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn advance(&self, by: usize) -> usize {
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let claimed = *cursor;
        *cursor = cursor.wrapping_add(by);
        claimed
    }
}

#[async_trait]
impl SelectionPolicy for RoundRobin {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    async fn select(
        &self,
        pool: &ServerPool,
        _tracker: &ConnectionTracker,
    ) -> Result<Arc<dyn Backend>, NoBackendAvailable> {
        let len = pool.len();
        if len == 0 {
            return Err(NoBackendAvailable { pool_size: 0 });
        }

        let start = self.advance(1) % len;

        for offset in 0..len {
            let Some(backend) = pool.get((start + offset) % len) else {
                continue;
            };
            if backend.is_alive().await {
                if offset > 0 {
                    self.advance(offset);
                }
                return Ok(Arc::clone(backend));
            }
            tracing::debug!(
                backend = %backend.address(),
                "Skipping backend that failed liveness probe"
            );
        }

        Err(NoBackendAvailable { pool_size: len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::mock::MockBackend;
    use std::sync::atomic::Ordering;

    fn pool(backends: &[Arc<MockBackend>]) -> ServerPool {
        ServerPool::new(backends.iter().map(|b| b.clone() as Arc<dyn Backend>).collect())
    }

    async fn pick(lb: &RoundRobin, pool: &ServerPool, tracker: &ConnectionTracker) -> String {
        lb.select(pool, tracker).await.unwrap().address().to_string()
    }

    #[tokio::test]
    async fn test_round_robin() {
        let lb = RoundRobin::new();
        let backends = [MockBackend::new("a", true), MockBackend::new("b", true)];
        let pool = pool(&backends);
        let tracker = ConnectionTracker::default();

        assert_eq!(pick(&lb, &pool, &tracker).await, "a");
        assert_eq!(pick(&lb, &pool, &tracker).await, "b");
        assert_eq!(pick(&lb, &pool, &tracker).await, "a");
    }

    #[tokio::test]
    async fn every_window_visits_each_backend_once() {
        let backends = [
            MockBackend::new("a", true),
            MockBackend::new("b", true),
            MockBackend::new("c", true),
        ];
        let pool = pool(&backends);
        let tracker = ConnectionTracker::default();

        for start in [0, 1, 2, 7, 1000] {
            let lb = RoundRobin::starting_at(start);
            let mut picks = Vec::new();
            for _ in 0..9 {
                picks.push(pick(&lb, &pool, &tracker).await);
            }
            for window in picks.windows(3) {
                let mut sorted = window.to_vec();
                sorted.sort();
                assert_eq!(sorted, ["a", "b", "c"], "start {start}: {picks:?}");
            }
            // Consecutive picks follow pool order.
            for pair in picks.windows(2) {
                let next = match pair[0].as_str() {
                    "a" => "b",
                    "b" => "c",
                    _ => "a",
                };
                assert_eq!(pair[1], next);
            }
        }
    }

    #[tokio::test]
    async fn cycles_live_subset_in_order() {
        let backends = [
            MockBackend::new("a", true),
            MockBackend::new("b", false),
            MockBackend::new("c", true),
            MockBackend::new("d", false),
        ];
        let pool = pool(&backends);
        let tracker = ConnectionTracker::default();
        let lb = RoundRobin::new();

        let mut picks = Vec::new();
        for _ in 0..6 {
            picks.push(pick(&lb, &pool, &tracker).await);
        }
        assert_eq!(picks, ["a", "c", "a", "c", "a", "c"]);
    }

    #[tokio::test]
    async fn skipping_advances_past_found_backend() {
        let backends = [
            MockBackend::new("a", false),
            MockBackend::new("b", false),
            MockBackend::new("c", true),
        ];
        let pool = pool(&backends);
        let lb = RoundRobin::new();

        let picked = lb.select(&pool, &ConnectionTracker::default()).await.unwrap();
        assert_eq!(picked.address(), "c");
        assert_eq!(lb.cursor(), 3);
    }

    #[tokio::test]
    async fn recovered_backend_rejoins_rotation() {
        let backends = [MockBackend::new("a", true), MockBackend::new("b", false)];
        let pool = pool(&backends);
        let tracker = ConnectionTracker::default();
        let lb = RoundRobin::new();

        assert_eq!(pick(&lb, &pool, &tracker).await, "a");
        assert_eq!(pick(&lb, &pool, &tracker).await, "a");

        backends[1].set_alive(true);
        assert_eq!(pick(&lb, &pool, &tracker).await, "b");
        assert_eq!(pick(&lb, &pool, &tracker).await, "a");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_selects_stay_fair() {
        let backends = [
            MockBackend::new("a", true),
            MockBackend::new("b", true),
            MockBackend::new("c", true),
            MockBackend::new("d", true),
        ];
        let pool = Arc::new(pool(&backends));
        let tracker = Arc::new(ConnectionTracker::default());
        let lb = Arc::new(RoundRobin::new());

        let tasks: Vec<_> = (0..400)
            .map(|_| {
                let (lb, pool, tracker) = (lb.clone(), pool.clone(), tracker.clone());
                tokio::spawn(async move { pick(&lb, &pool, &tracker).await })
            })
            .collect();

        let mut hits = std::collections::HashMap::new();
        for task in tasks {
            *hits.entry(task.await.unwrap()).or_insert(0) += 1;
        }

        assert_eq!(lb.cursor(), 400);
        for address in ["a", "b", "c", "d"] {
            assert_eq!(hits[address], 100, "{hits:?}");
        }
    }

    #[tokio::test]
    async fn all_dead_is_bounded() {
        let backends = [MockBackend::new("a", false), MockBackend::new("b", false)];
        let pool = pool(&backends);
        let lb = RoundRobin::new();

        let err = lb.select(&pool, &ConnectionTracker::default()).await.unwrap_err();
        assert_eq!(err.pool_size, 2);
        // Each backend probed exactly once.
        assert_eq!(backends[0].probes.load(Ordering::SeqCst), 1);
        assert_eq!(backends[1].probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_pool_has_no_backend() {
        let lb = RoundRobin::new();
        let err = lb
            .select(&ServerPool::new(Vec::new()), &ConnectionTracker::default())
            .await
            .unwrap_err();
        assert_eq!(err.pool_size, 0);
    }
}
