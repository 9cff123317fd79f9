//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Router → background tasks → listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → servers drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful shutdown
//!     SIGHUP → config reload
//! ```
//!
//! # Design Decisions
//! - Fail fast: configuration errors never reach the serving stage
//! - Per-request failures are handled per request and never stop the process

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
