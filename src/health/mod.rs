//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! SelectionPolicy considers a backend
//!     → Backend::is_alive()
//!     → active.rs probes the backend address (GET, expect 200)
//!     → true/false for this decision only
//! ```
//!
//! # Design Decisions
//! - No health state machine: liveness is a point-in-time judgement
//! - Probe cost scales with request volume; every selection re-probes
//! - Probes run outside every lock and may overlap for one backend

pub mod active;

pub use active::HealthProbe;
