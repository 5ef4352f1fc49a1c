//! Logger and telemetry selection for the CLI surfaces.

use fritzbox_adapters::{JsonLogger, JsonTelemetry, StderrLogSink, TaggedTelemetry, TracingLogger};
use fritzbox_ports::{LogFields, LogLevel, LoggerPort, TelemetryPort, TelemetryTags};
use serde_json::Value;
use std::sync::Arc;

/// How diagnostics are written to stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines through the `tracing` subscriber.
    #[default]
    Text,
    /// One JSON object per event, plus JSON telemetry lines.
    Json,
}

impl LogFormat {
    /// Parse a CLI value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Stable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Logger and telemetry handed to the use cases.
#[derive(Clone, Default)]
pub struct Observability {
    /// Structured logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
    /// Counters and timers.
    pub telemetry: Option<Arc<dyn TelemetryPort>>,
}

impl Observability {
    /// No logging, no telemetry.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build the stderr backends for `format`.
    ///
    /// Text output relies on the `tracing` subscriber for level filtering and
    /// carries no telemetry.
    #[must_use]
    pub fn for_format(format: LogFormat, min_level: LogLevel) -> Self {
        match format {
            LogFormat::Text => Self {
                logger: Some(Arc::new(TracingLogger::new())),
                telemetry: None,
            },
            LogFormat::Json => {
                let sink = Arc::new(StderrLogSink);
                let logger = JsonLogger::new(sink.clone()).with_min_level(min_level);
                Self {
                    logger: Some(Arc::new(logger)),
                    telemetry: Some(Arc::new(JsonTelemetry::new(sink))),
                }
            },
        }
    }

    /// Attach the device host to every log event and metric.
    #[must_use]
    pub fn scoped(&self, host: &str) -> Self {
        let logger = self.logger.as_ref().map(|logger| {
            let mut fields = LogFields::new();
            fields.insert("host".into(), Value::String(host.to_string()));
            Arc::from(logger.child(fields))
        });
        let telemetry = self.telemetry.as_ref().map(|telemetry| {
            let mut tags = TelemetryTags::new();
            tags.insert("host".into(), host.into());
            Arc::new(TaggedTelemetry::new(Arc::clone(telemetry), tags)) as Arc<dyn TelemetryPort>
        });
        Self { logger, telemetry }
    }
}
