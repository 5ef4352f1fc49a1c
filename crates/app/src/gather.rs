//! One poll: load the catalog, run both collectors, hand records to the sink.

use crate::{CollectContext, CollectStats, collect_complex, collect_simple};
use fritzbox_domain::{DEFAULT_HOST, DEFAULT_PORT, MetricTable};
use fritzbox_ports::{
    CatalogLoaderPort, DeviceTarget, LogFields, LoggerPort, MetricSinkPort, TelemetryPort,
};
use fritzbox_shared::{ErrorCode, ErrorEnvelope, Result, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Error code reported when the catalog cannot be loaded.
pub const CATALOG_UNAVAILABLE: &str = "catalog_unavailable";

/// Input payload for one poll.
#[derive(Debug, Clone, Default)]
pub struct GatherInput {
    /// Device host (empty means the default host).
    pub host: String,
    /// Device port (0 means the default port).
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: SecretString,
}

/// Dependencies required by gather.
#[derive(Clone)]
pub struct GatherDeps {
    /// Catalog loader (device discovery).
    pub catalog_loader: Arc<dyn CatalogLoaderPort>,
    /// Destination for emitted records.
    pub sink: Arc<dyn MetricSinkPort>,
    /// Metric definitions.
    pub table: Arc<MetricTable>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
    /// Optional telemetry sink.
    pub telemetry: Option<Arc<dyn TelemetryPort>>,
}

/// Summary of one successful poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatherReport {
    /// Records handed to the sink.
    pub records_emitted: u64,
    /// Fields across all records.
    pub fields_collected: u64,
    /// Remote invocations issued.
    pub calls_issued: u64,
    /// Definitions served from a call cache.
    pub cache_hits: u64,
    /// Units skipped after a recoverable failure.
    pub skipped: u64,
    /// Wall time of the poll.
    pub duration_ms: u64,
}

impl GatherReport {
    fn from_stats(stats: CollectStats, duration_ms: u64) -> Self {
        Self {
            records_emitted: stats.records_emitted,
            fields_collected: stats.fields_collected,
            calls_issued: stats.calls_issued,
            cache_hits: stats.cache_hits,
            skipped: stats.skipped,
            duration_ms,
        }
    }
}

/// Apply connection defaults: empty host means `fritz.box`, port 0 means 49000.
pub fn resolve_target(input: &GatherInput) -> DeviceTarget {
    let host = input.host.trim();
    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    let port = if input.port == 0 {
        DEFAULT_PORT
    } else {
        input.port
    };
    DeviceTarget::new(host, port).with_credentials(input.username.clone(), input.password.clone())
}

/// Run one poll.
///
/// A catalog failure is fatal and emits nothing. Every failure past that
/// point is logged and skips only the affected definition, instance or
/// element; the poll still returns `Ok`.
#[tracing::instrument(
    name = "fritzbox.gather",
    skip_all,
    fields(host = tracing::field::Empty, port = tracing::field::Empty)
)]
pub fn gather(deps: &GatherDeps, input: &GatherInput) -> Result<GatherReport> {
    let started_at = Instant::now();
    let total_timer = deps
        .telemetry
        .as_ref()
        .map(|telemetry| telemetry.start_timer("fritzbox.gather.total", None));
    let target = resolve_target(input);
    let span = tracing::Span::current();
    span.record("host", target.host.as_str());
    span.record("port", target.port);

    if let Some(logger) = deps.logger.as_ref() {
        logger.info(
            "fritzbox.gather.start",
            "Gather started",
            Some(log_fields_target(&target)),
        );
    }

    let result =
        run(deps, &target).map(|stats| GatherReport::from_stats(stats, duration_ms(started_at)));

    if let Some(timer) = total_timer.as_ref() {
        timer.stop();
    }

    match result {
        Ok(report) => {
            if let Some(telemetry) = deps.telemetry.as_ref() {
                telemetry.increment_counter("fritzbox.gather.executed", 1, None);
            }
            if let Some(logger) = deps.logger.as_ref() {
                logger.info(
                    "fritzbox.gather.completed",
                    "Gather completed",
                    Some(log_fields_completed(&target, &report)),
                );
            }
            Ok(report)
        },
        Err(error) => {
            if let Some(telemetry) = deps.telemetry.as_ref() {
                telemetry.increment_counter("fritzbox.gather.failed", 1, None);
            }
            if let Some(logger) = deps.logger.as_ref() {
                logger.error(
                    "fritzbox.gather.failed",
                    "Gather failed",
                    Some(log_fields_error(&target, duration_ms(started_at), &error)),
                );
            }
            Err(error)
        },
    }
}

fn run(deps: &GatherDeps, target: &DeviceTarget) -> Result<CollectStats> {
    let catalog = deps
        .catalog_loader
        .load(target)
        .map_err(|cause| catalog_unavailable(target, &cause))?;

    let ctx = CollectContext {
        catalog: catalog.as_ref(),
        host: &target.host,
        logger: deps.logger.as_deref(),
        telemetry: deps.telemetry.as_deref(),
    };
    let mut stats = CollectStats::default();

    let record = collect_simple(&ctx, &deps.table.simple, &mut stats);
    stats.records_emitted += 1;
    deps.sink.add_fields(record)?;

    collect_complex(&ctx, &deps.table.complex, &mut stats, &mut |record| {
        deps.sink.add_fields(record)
    })?;

    deps.sink.flush()?;
    Ok(stats)
}

fn catalog_unavailable(target: &DeviceTarget, cause: &ErrorEnvelope) -> ErrorEnvelope {
    ErrorEnvelope::wrapping(
        ErrorCode::new("gather", CATALOG_UNAVAILABLE),
        format!("fritzbox: unable to load services: {}", cause.message),
        cause,
    )
    .with_metadata("host", target.host.clone())
    .with_metadata("port", target.port.to_string())
}

fn duration_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn log_fields_target(target: &DeviceTarget) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert("host".into(), Value::String(target.host.clone()));
    fields.insert("port".into(), Value::from(target.port));
    fields
}

fn log_fields_completed(target: &DeviceTarget, report: &GatherReport) -> LogFields {
    let mut fields = log_fields_target(target);
    if let Ok(Value::Object(map)) = serde_json::to_value(report) {
        fields.extend(map.into_iter().map(|(key, value)| (key.into_boxed_str(), value)));
    }
    fields
}

fn log_fields_error(target: &DeviceTarget, duration_ms: u64, error: &ErrorEnvelope) -> LogFields {
    let mut fields = log_fields_target(target);
    fields.insert("durationMs".into(), Value::from(duration_ms));
    fields.insert("errorCode".into(), Value::String(error.code.to_string()));
    fields.insert("error".into(), Value::String(error.message.clone()));
    fields
}
