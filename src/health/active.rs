//! On-demand liveness probing.
//!
//! # Responsibilities
//! - Issue a GET to a backend's address
//! - Report alive only for an exact 200 OK within the probe timeout
//!
//! Nothing is cached: the balancer probes every candidate it considers.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use tokio::time;

const PROBE_USER_AGENT: &str = "yalb-health-check";

/// Probes a single URI with a shared HTTP client.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl HealthProbe {
    pub fn new(client: Client<HttpConnector, Body>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Return true iff `uri` answers 200 before the timeout elapses.
    pub async fn check(&self, uri: &Uri) -> bool {
        let request = match Request::builder()
            .method(Method::GET)
            .uri(uri.clone())
            .header(header::USER_AGENT, PROBE_USER_AGENT)
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(uri = %uri, error = %e, "Failed to build health check request");
                return false;
            }
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let status = response.status();
                if status != StatusCode::OK {
                    tracing::debug!(
                        uri = %uri,
                        status = %status,
                        "Health check failed: status is not 200"
                    );
                }
                status == StatusCode::OK
            }
            Ok(Err(e)) => {
                tracing::debug!(uri = %uri, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(uri = %uri, timeout = ?self.timeout, "Health check failed: timeout");
                false
            }
        }
    }
}
