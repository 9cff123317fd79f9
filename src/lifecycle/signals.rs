//! OS signal handling.
//!
//! - SIGINT / SIGTERM: graceful shutdown
//! - SIGHUP: re-read the configuration file and apply it

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::config::{load_config, ConfigSnapshot};
use crate::lifecycle::Shutdown;

/// Wait for signals until a shutdown signal arrives.
pub async fn handle_signals(
    shutdown: Shutdown,
    config_path: PathBuf,
    updates: mpsc::UnboundedSender<ConfigSnapshot>,
) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        let mut hangup = signal(SignalKind::hangup())?;

        loop {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    res?;
                    tracing::info!("SIGINT received");
                    break;
                }
                _ = terminate.recv() => {
                    tracing::info!("SIGTERM received");
                    break;
                }
                _ = hangup.recv() => {
                    tracing::info!(path = ?config_path, "SIGHUP received, reloading configuration");
                    reload_from(&config_path, &updates);
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = (&config_path, &updates);
        tokio::signal::ctrl_c().await?;
        tracing::info!("Ctrl+C received");
    }

    shutdown.trigger();
    Ok(())
}

/// Load `path` and publish it, logging instead of failing on a bad file.
pub fn reload_from(path: &Path, updates: &mpsc::UnboundedSender<ConfigSnapshot>) {
    match load_config(path) {
        Ok(config) => {
            if updates.send(config).is_err() {
                tracing::warn!("Configuration update dropped: server is not running");
            }
        }
        Err(e) => {
            tracing::error!(
                path = ?path,
                error = %e,
                "Failed to reload config, keeping current configuration"
            );
        }
    }
}
