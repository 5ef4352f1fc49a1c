//! JSON telemetry adapter (counters and timers).
//!
//! Metric lines share the diagnostic stream with [`crate::JsonLogger`] and
//! are told apart by `"type": "metric"`.

use crate::log_sink::LogSink;
use crate::logger::now_epoch_ms;
use fritzbox_ports::{TelemetryPort, TelemetryTags, TelemetryTimer};
use fritzbox_shared::redaction::{REDACTED, is_secret_key};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

const SERIALIZE_FAILED_LINE: &str = "{\"type\":\"metric\",\"metricType\":\"counter\",\"name\":\"fritzbox.telemetry.serializeFailed\",\"value\":1}\n";

/// Telemetry adapter that emits JSON lines.
#[derive(Clone)]
pub struct JsonTelemetry {
    sink: Arc<dyn LogSink>,
    base_tags: TelemetryTags,
}

impl JsonTelemetry {
    /// Create a telemetry adapter backed by the provided sink.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            base_tags: TelemetryTags::new(),
        }
    }

    /// Set base tags applied to every metric.
    #[must_use]
    pub fn with_base_tags(mut self, tags: TelemetryTags) -> Self {
        self.base_tags = tags;
        self
    }
}

impl TelemetryPort for JsonTelemetry {
    fn increment_counter(&self, name: &str, value: u64, tags: Option<&TelemetryTags>) {
        let tags = merge_tags(&self.base_tags, tags);
        self.sink
            .write_line(&MetricLine::new(MetricKind::Counter, name, value, &tags).encode());
    }

    fn record_timer_ms(&self, name: &str, duration_ms: u64, tags: Option<&TelemetryTags>) {
        let tags = merge_tags(&self.base_tags, tags);
        self.sink
            .write_line(&MetricLine::new(MetricKind::Timer, name, duration_ms, &tags).encode());
    }

    fn start_timer(&self, name: &str, tags: Option<&TelemetryTags>) -> Box<dyn TelemetryTimer> {
        Box::new(JsonTelemetryTimer {
            sink: Arc::clone(&self.sink),
            name: name.into(),
            tags: merge_tags(&self.base_tags, tags),
            started_at: Instant::now(),
            stopped: AtomicBool::new(false),
        })
    }
}

/// Telemetry adapter that applies base tags to an inner telemetry sink.
#[derive(Clone)]
pub struct TaggedTelemetry {
    inner: Arc<dyn TelemetryPort>,
    tags: TelemetryTags,
}

impl TaggedTelemetry {
    /// Wrap a telemetry sink with base tags.
    #[must_use]
    pub fn new(inner: Arc<dyn TelemetryPort>, tags: TelemetryTags) -> Self {
        Self { inner, tags }
    }
}

impl TelemetryPort for TaggedTelemetry {
    fn increment_counter(&self, name: &str, value: u64, tags: Option<&TelemetryTags>) {
        let merged = merge_tags(&self.tags, tags);
        self.inner.increment_counter(name, value, Some(&merged));
    }

    fn record_timer_ms(&self, name: &str, duration_ms: u64, tags: Option<&TelemetryTags>) {
        let merged = merge_tags(&self.tags, tags);
        self.inner.record_timer_ms(name, duration_ms, Some(&merged));
    }

    fn start_timer(&self, name: &str, tags: Option<&TelemetryTags>) -> Box<dyn TelemetryTimer> {
        let merged = merge_tags(&self.tags, tags);
        self.inner.start_timer(name, Some(&merged))
    }
}

struct JsonTelemetryTimer {
    sink: Arc<dyn LogSink>,
    name: Box<str>,
    tags: TelemetryTags,
    started_at: Instant,
    stopped: AtomicBool,
}

impl TelemetryTimer for JsonTelemetryTimer {
    fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let duration_ms = u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or_default();
        self.sink
            .write_line(&MetricLine::new(MetricKind::Timer, &self.name, duration_ms, &self.tags).encode());
    }
}

#[derive(Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum MetricKind {
    Counter,
    Timer,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricLine<'a> {
    #[serde(rename = "type")]
    line_type: &'static str,
    timestamp_ms: u64,
    metric_type: MetricKind,
    name: &'a str,
    value: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a TelemetryTags>,
}

impl<'a> MetricLine<'a> {
    fn new(metric_type: MetricKind, name: &'a str, value: u64, tags: &'a TelemetryTags) -> Self {
        Self {
            line_type: "metric",
            timestamp_ms: now_epoch_ms(),
            metric_type,
            name,
            value,
            unit: matches!(metric_type, MetricKind::Timer).then_some("ms"),
            tags: (!tags.is_empty()).then_some(tags),
        }
    }

    fn encode(&self) -> String {
        serde_json::to_string(self).map_or_else(
            |_| SERIALIZE_FAILED_LINE.to_string(),
            |mut encoded| {
                encoded.push('\n');
                encoded
            },
        )
    }
}

fn merge_tags(base: &TelemetryTags, extra: Option<&TelemetryTags>) -> TelemetryTags {
    let mut merged = base.clone();
    if let Some(extra) = extra {
        merged.extend(extra.iter().map(|(key, value)| (key.clone(), value.clone())));
    }
    for (key, value) in &mut merged {
        if is_secret_key(key) {
            *value = REDACTED.into();
        }
    }
    merged
}
