//! Startup orchestration.
//!
//! # Order
//! 1. Build the routing core from the validated snapshot (fatal on error)
//! 2. Start metrics, config watcher, signal handling, admin endpoint
//! 3. Bind the proxy listener last, so traffic only arrives when ready

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::admin::setup_admin_router;
use crate::config::watcher::ConfigWatcher;
use crate::config::{ConfigError, ConfigSnapshot};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::routing::Router;

/// Failure that prevents the proxy from serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address).await.map_err(|source| StartupError::Bind {
        address: address.to_string(),
        source,
    })
}

/// Start every subsystem and serve until shutdown.
pub async fn run(config: ConfigSnapshot, config_path: PathBuf) -> Result<(), StartupError> {
    let router = Arc::new(Router::from_config(&config)?);
    tracing::info!(
        backends = config.servers.len(),
        algorithm = %config.algorithm,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let (update_tx, update_rx) = mpsc::unbounded_channel();

    // Dropping the watcher stops it, so keep it for the life of the server.
    let _watcher = if config.watch {
        Some(ConfigWatcher::new(&config_path, update_tx.clone()).run()?)
    } else {
        None
    };

    {
        let shutdown = shutdown.clone();
        let path = config_path.clone();
        let updates = update_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = signals::handle_signals(shutdown.clone(), path, updates).await {
                tracing::error!(error = %e, "Signal handling failed, shutting down");
                shutdown.trigger();
            }
        });
    }

    if config.admin.enabled {
        let listener = bind(&config.admin.bind_address).await?;
        let app = setup_admin_router(router.clone());
        let stopped = shutdown.wait();
        tracing::info!(address = %config.admin.bind_address, "Admin endpoint listening");
        tokio::spawn(async move {
            let served = axum::serve(listener, app).with_graceful_shutdown(stopped).await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin endpoint failed");
            }
        });
    }

    let listener = bind(&config.listen_address()).await?;
    let server = HttpServer::new(router, config);
    server
        .run(listener, update_rx, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}
