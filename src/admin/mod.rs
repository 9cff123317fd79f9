//! Read-only admin endpoint.
//!
//! Served on its own address so that every path on the proxy listener
//! still reaches a backend.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};

use self::handlers::*;
use crate::routing::Router as ProxyRouter;

pub fn setup_admin_router(router: Arc<ProxyRouter>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/backends", get(get_backends))
        .with_state(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Algorithm;
    use crate::load_balancer::backend::mock::MockBackend;
    use crate::load_balancer::{Backend, ServerPool};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn lists_backends_with_counts() {
        let a = MockBackend::new("http://a.local", true);
        let pool = ServerPool::new(vec![a as Arc<dyn Backend>]);
        let router = Arc::new(ProxyRouter::new(pool, Algorithm::LeastConnections));
        let _busy = router.tracker().track("http://a.local");

        let response = setup_admin_router(router)
            .oneshot(Request::get("/admin/backends").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let backends: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            backends,
            serde_json::json!([{ "address": "http://a.local", "active_connections": 1 }])
        );
    }

    #[tokio::test]
    async fn status_sums_active_connections() {
        let pool = ServerPool::new(vec![
            MockBackend::new("http://a.local", true) as Arc<dyn Backend>,
            MockBackend::new("http://b.local", true) as Arc<dyn Backend>,
        ]);
        let router = Arc::new(ProxyRouter::new(pool, Algorithm::RoundRobin));
        let _a = router.tracker().track("http://a.local");
        let _b = router.tracker().track("http://b.local");

        let response = setup_admin_router(router)
            .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let status: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(status["algorithm"], "round-robin");
        assert_eq!(status["backends"], 2);
        assert_eq!(status["active_connections"], 2);
    }
}
