//! # fritzbox-adapters
//!
//! Adapter implementations for ports: the snapshot catalog loader, the
//! line-protocol and NDJSON metric sinks, and the logging/telemetry backends.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod line_protocol;
pub mod log_sink;
pub mod logger;
pub mod ndjson;
pub mod snapshot;
pub mod telemetry;
pub mod tracing_logger;

pub use line_protocol::{LineProtocolSink, encode_record};
pub use log_sink::{LogSink, MemoryLogSink, StderrLogSink};
pub use logger::JsonLogger;
pub use ndjson::NdjsonSink;
pub use snapshot::{SnapshotCatalog, SnapshotCatalogLoader, SnapshotError};
pub use telemetry::{JsonTelemetry, TaggedTelemetry};
pub use tracing_logger::TracingLogger;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
