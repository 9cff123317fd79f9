//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace layer)
//!     → request.rs (X-Forwarded-For, later URI rewrite and hop-by-hop removal)
//!     → routing::Router picks a backend and forwards
//!     → response.rs (routing failures → 502/503/504)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
