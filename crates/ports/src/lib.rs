//! # fritzbox-ports
//!
//! Port traits for the FRITZ!Box collector.
//!
//! This crate defines the interfaces between the collectors and the outside
//! world: the device service catalog, the metric sink, logging and telemetry.
//! It depends only on `domain` and `shared`.

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod catalog;
pub mod logger;
pub mod sink;
pub mod telemetry;

pub use catalog::*;
pub use logger::*;
pub use sink::*;
pub use telemetry::*;

// Re-export domain types used in port signatures, so adapter crates can
// implement ports without directly depending on `fritzbox-domain`.
pub use fritzbox_domain::{MeasurementRecord, ScalarValue};
