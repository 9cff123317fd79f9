//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server by its address
//! - Probe liveness on demand (no cached health state)
//! - Forward a request and stream back the response

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use thiserror::Error;
use tokio::time;
use url::Url;

use crate::config::TimeoutConfig;
use crate::health::HealthProbe;
use crate::http::request::{probe_uri, strip_hop_by_hop, upstream_uri};

/// Failure while proxying a request to a backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connection refused/reset or protocol error.
    #[error("upstream request to {address} failed: {source}")]
    Request {
        address: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    /// No response headers within the forwarding timeout.
    #[error("upstream {address} did not respond within {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    /// The inbound URI could not be mapped onto the backend.
    #[error("cannot build upstream URI for {address}: {source}")]
    InvalidUri {
        address: String,
        #[source]
        source: axum::http::Error,
    },
}

/// A single upstream server.
///
/// Selection policies only rely on this trait, so new transports can be added
/// without touching them.
#[async_trait]
pub trait Backend: Send + Sync + fmt::Debug {
    /// Identity of this backend, as configured.
    fn address(&self) -> &str;

    /// Probe the backend. True iff it answers 200 right now.
    async fn is_alive(&self) -> bool;

    /// Proxy `request` and return the backend's response.
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError>;
}

/// Backend reached over plain HTTP/1.1.
#[derive(Debug)]
pub struct HttpBackend {
    address: String,
    base_url: Url,
    probe_uri: Uri,
    probe: HealthProbe,
    client: Client<HttpConnector, Body>,
    forward_timeout: Duration,
}

impl HttpBackend {
    /// Create a backend for an already validated `http` URL.
    pub fn new(
        address: impl Into<String>,
        base_url: Url,
        client: Client<HttpConnector, Body>,
        timeouts: &TimeoutConfig,
    ) -> Result<Self, axum::http::Error> {
        Ok(Self {
            address: address.into(),
            probe_uri: probe_uri(&base_url)?,
            base_url,
            probe: HealthProbe::new(client.clone(), timeouts.probe()),
            client,
            forward_timeout: timeouts.forward(),
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn address(&self) -> &str {
        &self.address
    }

    async fn is_alive(&self) -> bool {
        self.probe.check(&self.probe_uri).await
    }

    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        parts.uri =
            upstream_uri(&self.base_url, &parts.uri).map_err(|source| ForwardError::InvalidUri {
                address: self.address.clone(),
                source,
            })?;
        strip_hop_by_hop(&mut parts.headers);

        let request = Request::from_parts(parts, body);
        let pending = self.client.request(request);
        let response = match time::timeout(self.forward_timeout, pending).await {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => {
                return Err(ForwardError::Request {
                    address: self.address.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(ForwardError::Timeout {
                    address: self.address.clone(),
                    timeout: self.forward_timeout,
                })
            }
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
