//! Request preparation for forwarding.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Rewrite the inbound URI onto a backend base URL
//! - Strip hop-by-hop headers and record the client in `X-Forwarded-For`
//!
//! # Design Decisions
//! - The `Host` header passes through untouched
//! - Path joining keeps exactly one slash between base and inbound path
//! - Queries from the base URL and the inbound request are both kept

use std::net::IpAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Uri};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers meaningful only for a single transport hop.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Generates v4 UUID request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Append the client IP to `X-Forwarded-For`.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.is_empty() => format!("{}, {}", prior, client),
        _ => client.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Authority (`host[:port]`) of a backend URL.
pub fn authority(base: &Url) -> String {
    let host = base.host_str().unwrap_or_default();
    match base.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// URI that a liveness probe for `base` targets.
pub fn probe_uri(base: &Url) -> Result<Uri, axum::http::Error> {
    let path_and_query = match base.query() {
        Some(query) => format!("{}?{}", base.path(), query),
        None => base.path().to_string(),
    };
    Uri::builder()
        .scheme(base.scheme())
        .authority(authority(base).as_str())
        .path_and_query(path_and_query.as_str())
        .build()
}

/// Map an inbound URI onto a backend base URL.
pub fn upstream_uri(base: &Url, original: &Uri) -> Result<Uri, axum::http::Error> {
    let path = join_paths(base.path(), original.path());
    let query = match (base.query(), original.query()) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => Some(format!("{}&{}", a, b)),
        (Some(a), _) if !a.is_empty() => Some(a.to_string()),
        (_, Some(b)) if !b.is_empty() => Some(b.to_string()),
        _ => None,
    };
    let path_and_query = match query {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };

    Uri::builder()
        .scheme(base.scheme())
        .authority(authority(base).as_str())
        .path_and_query(path_and_query.as_str())
        .build()
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
