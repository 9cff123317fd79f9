//! Configuration validation.
//!
//! Serde only checks shape. This module checks meaning: the backend list is
//! non-empty, every entry is an absolute `http` URL with a host, and the port
//! is a valid TCP port. All problems are reported, not just the first.

use thiserror::Error;
use url::Url;

use crate::config::schema::ConfigSnapshot;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no backend servers configured")]
    NoServers,

    #[error("invalid server address {address:?}: {reason}")]
    InvalidServerAddress { address: String, reason: String },

    #[error("unsupported scheme {scheme:?} for server {address:?} (only http is supported)")]
    UnsupportedScheme { address: String, scheme: String },

    #[error("invalid listen port {0:?}")]
    InvalidPort(String),
}

/// Check a configuration snapshot.
pub fn validate_config(config: &ConfigSnapshot) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }

    for address in &config.servers {
        if let Err(e) = parse_server_address(address) {
            errors.push(e);
        }
    }

    if config.port.parse::<u16>().is_err() {
        errors.push(ValidationError::InvalidPort(config.port.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse one backend address into a URL usable by the HTTP backend.
pub fn parse_server_address(address: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(address).map_err(|e| ValidationError::InvalidServerAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" {
        return Err(ValidationError::UnsupportedScheme {
            address: address.to_string(),
            scheme: url.scheme().to_string(),
        });
    }

    if url.host_str().is_none() {
        return Err(ValidationError::InvalidServerAddress {
            address: address.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}
