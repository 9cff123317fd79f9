//! Backend pool.
//!
//! An ordered, immutable list of backends built once from configuration.
//! Order matters: round-robin walks it and least-connections breaks ties by it.

use std::sync::Arc;

use axum::body::Body;
use hyper_util::client::legacy::{connect::HttpConnector, Client};

use crate::config::validation::parse_server_address;
use crate::config::{ConfigError, ConfigSnapshot, ValidationError};
use crate::load_balancer::backend::{Backend, HttpBackend};

/// Ordered collection of backends.
#[derive(Debug, Clone)]
pub struct ServerPool {
    backends: Vec<Arc<dyn Backend>>,
}

impl ServerPool {
    /// Create a pool from backends, keeping their order.
    pub fn new(backends: Vec<Arc<dyn Backend>>) -> Self {
        Self { backends }
    }

    /// Build HTTP backends for every configured server.
    pub fn from_config(
        config: &ConfigSnapshot,
        client: &Client<HttpConnector, Body>,
    ) -> Result<Self, ConfigError> {
        let mut backends: Vec<Arc<dyn Backend>> = Vec::with_capacity(config.servers.len());
        let mut errors = Vec::new();

        for address in &config.servers {
            let backend = parse_server_address(address).and_then(|url| {
                HttpBackend::new(address.as_str(), url, client.clone(), &config.timeouts).map_err(
                    |e| ValidationError::InvalidServerAddress {
                        address: address.clone(),
                        reason: e.to_string(),
                    },
                )
            });
            match backend {
                Ok(backend) => backends.push(Arc::new(backend)),
                Err(e) => errors.push(e),
            }
        }

        if backends.is_empty() && errors.is_empty() {
            errors.push(ValidationError::NoServers);
        }
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        Ok(Self::new(backends))
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn Backend>> {
        self.backends.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Backend>> {
        self.backends.iter()
    }

    /// Backend addresses in pool order.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.backends.iter().map(|b| b.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper_util::rt::TokioExecutor;

    fn client() -> Client<HttpConnector, Body> {
        Client::builder(TokioExecutor::new()).build(HttpConnector::new())
    }

    #[test]
    fn keeps_configured_order() {
        let config = ConfigSnapshot {
            servers: vec![
                "http://127.0.0.1:5003".into(),
                "http://127.0.0.1:5001".into(),
                "http://127.0.0.1:5002".into(),
            ],
            ..ConfigSnapshot::default()
        };

        let pool = ServerPool::from_config(&config, &client()).unwrap();
        let addresses: Vec<&str> = pool.addresses().collect();
        assert_eq!(
            addresses,
            ["http://127.0.0.1:5003", "http://127.0.0.1:5001", "http://127.0.0.1:5002"]
        );
    }

    #[test]
    fn rejects_empty_and_invalid_lists() {
        let empty = ConfigSnapshot::default();
        assert!(matches!(
            ServerPool::from_config(&empty, &client()),
            Err(ConfigError::Validation(ref e)) if e == &[ValidationError::NoServers]
        ));

        let invalid = ConfigSnapshot {
            servers: vec!["ftp://files.local".into()],
            ..ConfigSnapshot::default()
        };
        assert!(ServerPool::from_config(&invalid, &client()).is_err());
    }
}
