//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router that sends every request to the proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Serve on a listener until shutdown
//! - Apply configuration updates to the routing core

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ConfigSnapshot;
use crate::http::request::{append_forwarded_for, MakeRequestUuid, X_REQUEST_ID};
use crate::routing::Router as ProxyRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ProxyRouter>,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    app: Router,
    config: ConfigSnapshot,
    router: Arc<ProxyRouter>,
}

impl HttpServer {
    /// Create a new HTTP server around a routing core.
    pub fn new(router: Arc<ProxyRouter>, config: ConfigSnapshot) -> Self {
        let state = AppState {
            router: router.clone(),
        };
        Self {
            app: Self::build_router(state),
            config,
            router,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Snapshots received on `config_updates` are applied with
    /// [`ProxyRouter::reload`]. The server drains and stops when `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ConfigSnapshot>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            algorithm = %self.router.algorithm(),
            backends = self.router.backends().len(),
            "Proxying requests"
        );

        let router = self.router.clone();
        let port = self.config.port.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if config.port != port {
                    tracing::warn!(
                        current = %port,
                        requested = %config.port,
                        "Listen port changes require a restart"
                    );
                }
                if let Err(e) = router.reload(&config) {
                    tracing::error!(
                        error = %e,
                        "Configuration update rejected, keeping current backends"
                    );
                }
            }
        });

        let app = self.app.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Selects a backend and forwards the request to it.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        client = %client,
        "Proxying request"
    );

    append_forwarded_for(request.headers_mut(), client.ip());

    match state.router.route(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                status = %e.status_code(),
                error = %e,
                "Request failed"
            );
            e.into_response()
        }
    }
}
