//! Adapter construction from the validated config.

use crate::{InfraError, InfraResult, Observability};
use fritzbox_adapters::{LineProtocolSink, NdjsonSink, SnapshotCatalogLoader};
use fritzbox_app::{GatherDeps, GatherInput};
use fritzbox_config::{OutputFormat, ValidatedFritzboxConfig};
use fritzbox_domain::MetricTable;
use fritzbox_ports::{CatalogLoaderPort, MetricSinkPort};
use fritzbox_shared::ErrorCode;
use std::io::Write;
use std::sync::Arc;

/// Error code reported when no catalog source is configured.
pub const MISSING_CATALOG_SOURCE: &str = "missing_catalog_source";

/// Build the catalog loader named by `catalog.snapshotPath`.
pub fn build_catalog_loader(
    config: &ValidatedFritzboxConfig,
) -> InfraResult<Arc<dyn CatalogLoaderPort>> {
    let Some(path) = config.catalog.snapshot_path.as_ref() else {
        return Err(InfraError::expected(
            ErrorCode::new("config", MISSING_CATALOG_SOURCE),
            "no catalog source configured: set catalog.snapshotPath or FRITZBOX_CATALOG_SNAPSHOT",
        ));
    };
    tracing::debug!(path = %path.display(), "using catalog snapshot");
    Ok(Arc::new(SnapshotCatalogLoader::new(path.clone())))
}

/// Build the record sink for `format` over `writer`.
pub fn build_sink<W>(format: OutputFormat, writer: W) -> Arc<dyn MetricSinkPort>
where
    W: Write + Send + 'static,
{
    match format {
        OutputFormat::LineProtocol => Arc::new(LineProtocolSink::new(writer)),
        OutputFormat::Ndjson => Arc::new(NdjsonSink::new(writer)),
    }
}

/// Connection settings for one poll.
#[must_use]
pub fn gather_input_from_config(config: &ValidatedFritzboxConfig) -> GatherInput {
    GatherInput {
        host: config.device.host.clone(),
        port: config.device.port,
        username: config.device.username.clone(),
        password: config.device.password.clone(),
    }
}

/// Assemble the poll dependencies around an already-built sink.
pub fn build_gather_deps(
    config: &ValidatedFritzboxConfig,
    sink: Arc<dyn MetricSinkPort>,
    observability: &Observability,
) -> InfraResult<GatherDeps> {
    let scoped = observability.scoped(&config.device.host);
    Ok(GatherDeps {
        catalog_loader: build_catalog_loader(config)?,
        sink,
        table: Arc::new(MetricTable::fritzbox_default()),
        logger: scoped.logger,
        telemetry: scoped.telemetry,
    })
}
