//! Shared collector context: catalog, host tag, logging and counters.

use fritzbox_ports::{LogFields, LoggerPort, ServiceCatalog, TelemetryPort};
use serde::Serialize;
use serde_json::Value;

/// Everything a collector needs for one poll.
#[derive(Clone, Copy)]
pub struct CollectContext<'a> {
    /// Catalog loaded for this poll.
    pub catalog: &'a dyn ServiceCatalog,
    /// Device host, written to the host tag of every record.
    pub host: &'a str,
    /// Optional logger.
    pub logger: Option<&'a dyn LoggerPort>,
    /// Optional telemetry sink.
    pub telemetry: Option<&'a dyn TelemetryPort>,
}

impl<'a> CollectContext<'a> {
    /// Context without logging or telemetry.
    pub fn new(catalog: &'a dyn ServiceCatalog, host: &'a str) -> Self {
        Self {
            catalog,
            host,
            logger: None,
            telemetry: None,
        }
    }

    pub(crate) fn debug(&self, event: &str, message: &str, fields: LogFields) {
        if let Some(logger) = self.logger {
            logger.debug(event, message, Some(fields));
        }
    }

    pub(crate) fn warn(&self, event: &str, message: &str, fields: LogFields) {
        if let Some(logger) = self.logger {
            logger.warn(event, message, Some(fields));
        }
    }

    pub(crate) fn error(&self, event: &str, message: &str, fields: LogFields) {
        if let Some(logger) = self.logger {
            logger.error(event, message, Some(fields));
        }
    }

    fn count(&self, name: &str) {
        if let Some(telemetry) = self.telemetry {
            telemetry.increment_counter(name, 1, None);
        }
    }
}

/// Running totals for one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectStats {
    /// Remote invocations issued.
    pub calls_issued: u64,
    /// Definitions served from the call cache.
    pub cache_hits: u64,
    /// Units skipped after a recoverable failure.
    pub skipped: u64,
    /// Fields written across all records.
    pub fields_collected: u64,
    /// Records handed to the sink.
    pub records_emitted: u64,
}

impl CollectStats {
    pub(crate) fn call_issued(&mut self, ctx: &CollectContext<'_>) {
        self.calls_issued += 1;
        ctx.count("fritzbox.call.issued");
    }

    pub(crate) fn cache_hit(&mut self, ctx: &CollectContext<'_>) {
        self.cache_hits += 1;
        ctx.count("fritzbox.call.cacheHit");
    }

    pub(crate) fn skip(&mut self, ctx: &CollectContext<'_>) {
        self.skipped += 1;
        ctx.count("fritzbox.metric.skipped");
    }
}

/// Build log fields from string pairs.
pub(crate) fn fields<'k>(pairs: impl IntoIterator<Item = (&'k str, String)>) -> LogFields {
    pairs
        .into_iter()
        .map(|(key, value)| (Box::from(key), Value::String(value)))
        .collect()
}
