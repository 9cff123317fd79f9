//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/YAML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ConfigSnapshot (validated, immutable)
//!     → handed to routing::Router once at startup
//!
//! On reload (file change or SIGHUP):
//!     watcher.rs / lifecycle::signals detect it
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → Router::reload swaps the backend pool
//! ```
//!
//! # Design Decisions
//! - The routing core never reads files; it only sees snapshots
//! - All fields except `servers` have defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{AdminConfig, Algorithm, ConfigSnapshot, ObservabilityConfig, TimeoutConfig};
pub use validation::ValidationError;
