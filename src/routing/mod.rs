//! Request routing subsystem.
//!
//! Every inbound request, whatever its method or path, takes the same route:
//! one backend chosen by the configured policy. There is no path or host
//! matching.

pub mod router;

pub use router::{BackendStatus, RouteError, Router};
