//! yalb - yet another load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http::server ──▶ routing::Router
//!                                           │
//!                                           ▼
//!                                   SelectionPolicy.select
//!                              (round-robin | least-connections)
//!                                           │  Backend::is_alive (probe)
//!                                           ▼
//!                                 ConnectionTracker.track
//!                                           │
//!                                           ▼
//!     Client Response              Backend::forward ──────────▶ Backend
//!     ◀─────────────── streamed body (count released at end) ◀─ Server
//! ```

use std::path::PathBuf;

use clap::Parser;

use yalb::config::{load_config, ObservabilityConfig};
use yalb::lifecycle::startup;
use yalb::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "yalb")]
#[command(
    about = "HTTP load balancer with round-robin and least-connections policies",
    long_about = None
)]
struct Cli {
    /// Configuration file (TOML, or YAML for .yaml/.yml)
    #[arg(short, long, env = "YALB_CONFIG", default_value = "yalb.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            let _ = init_logging(&ObservabilityConfig::default());
            tracing::error!(path = ?cli.config, error = %e, "Refusing to start");
            return Err(e.into());
        }
    };

    init_logging(&config.observability)?;
    tracing::info!("yalb v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config, cli.config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
