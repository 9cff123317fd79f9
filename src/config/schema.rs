//! Configuration schema definitions.
//!
//! The three top-level keys `servers`, `algorithm` and `port` describe the
//! balancer itself. Every other section is optional and falls back to defaults.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Parsed configuration handed to the core at startup and on reload.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    /// Backend URLs, in pool order (e.g. "http://127.0.0.1:3000").
    pub servers: Vec<String>,

    /// Backend selection policy.
    pub algorithm: Algorithm,

    /// Listen port.
    pub port: String,

    /// Listen host.
    pub host: String,

    /// Re-apply the configuration when the file changes.
    pub watch: bool,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoint settings.
    pub admin: AdminConfig,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            algorithm: Algorithm::default(),
            port: "8080".to_string(),
            host: "0.0.0.0".to_string(),
            watch: false,
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl ConfigSnapshot {
    /// Address the proxy listener binds to.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Backend selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    #[default]
    RoundRobin,
    LeastConnections,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::RoundRobin => f.write_str("round-robin"),
            Algorithm::LeastConnections => f.write_str("least-connections"),
        }
    }
}

/// Timeouts for backend I/O.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Liveness probe timeout in seconds.
    pub probe_secs: u64,

    /// Time allowed for a backend to return response headers, in seconds.
    pub forward_secs: u64,
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn forward(&self) -> Duration {
        Duration::from_secs(self.forward_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_secs: 5,
            forward_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin endpoint.
    pub enabled: bool,

    /// Admin bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
