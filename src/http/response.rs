//! Response handling.
//!
//! # Responsibilities
//! - Map routing failures to status codes
//!
//! # Design Decisions
//! - No live backend → 503 Service Unavailable
//! - Backend timeout → 504 Gateway Timeout
//! - Any other forwarding failure → 502 Bad Gateway

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::load_balancer::ForwardError;
use crate::routing::RouteError;

impl RouteError {
    /// Status returned to the caller for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RouteError::NoBackendAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RouteError::Forward(ForwardError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            RouteError::Forward(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let message = match &self {
            RouteError::NoBackendAvailable(_) => "No backend available",
            RouteError::Forward(ForwardError::Timeout { .. }) => "Upstream timed out",
            RouteError::Forward(_) => "Upstream request failed",
        };
        (self.status_code(), message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::NoBackendAvailable;
    use std::time::Duration;

    #[test]
    fn maps_errors_to_status() {
        let unavailable = RouteError::from(NoBackendAvailable { pool_size: 2 });
        assert_eq!(unavailable.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        let timeout = RouteError::from(ForwardError::Timeout {
            address: "http://127.0.0.1:1".into(),
            timeout: Duration::from_secs(1),
        });
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }
}
