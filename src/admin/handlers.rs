use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::routing::{BackendStatus, Router as ProxyRouter};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub algorithm: String,
    pub backends: usize,
    pub active_connections: usize,
}

pub async fn get_status(State(router): State<Arc<ProxyRouter>>) -> Json<SystemStatus> {
    let backends = router.backends();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        algorithm: router.algorithm().to_string(),
        backends: backends.len(),
        active_connections: backends.iter().map(|b| b.active_connections).sum(),
    })
}

/// Backends in pool order. Liveness is not probed here.
pub async fn get_backends(State(router): State<Arc<ProxyRouter>>) -> Json<Vec<BackendStatus>> {
    Json(router.backends())
}
