//! yalb: an HTTP load balancer.
//!
//! Inbound requests are forwarded to one backend from a fixed pool, chosen by
//! round-robin or least-connections among the backends that pass a liveness
//! probe at selection time.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod routing;

pub use config::ConfigSnapshot;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::Router;
