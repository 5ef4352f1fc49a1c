//! # fritzbox-domain
//!
//! Domain model for declarative FRITZ!Box metric collection.
//!
//! - **Values** - `ScalarValue`, the typed form of a single action result entry
//! - **Metrics** - `SimpleMetricSpec`, `ComplexMetricSpec`, `MetricTable`
//! - **Services** - `ServiceInstanceId` (`prefix:index`, 1-based)
//! - **Measurements** - `MeasurementRecord` handed to metric sinks
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - Pure data and formatting, no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use fritzbox_shared::shared_crate_version;

pub mod error;
pub mod measurement;
pub mod metric;
pub mod service;
pub mod value;

pub use error::DomainError;
pub use measurement::{MeasurementRecord, MetricFields, MetricTags};
pub use metric::{
    ComplexMetricSpec, DEFAULT_HOST, DEFAULT_PORT, HOST_TAG, MetricTable, SERVICE_TAG,
    SIMPLE_MEASUREMENT, SimpleMetricSpec,
};
pub use service::ServiceInstanceId;
pub use value::ScalarValue;

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
