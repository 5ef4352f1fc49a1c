//! Structured JSON logger adapter.
//!
//! Each event becomes one JSON line on the configured [`LogSink`]. Fields
//! whose key looks like a credential are replaced with `[REDACTED]`, both at
//! the top level and inside nested error payloads.

use crate::log_sink::LogSink;
use fritzbox_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use fritzbox_shared::redaction::{REDACTED, is_secret_key};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const SERIALIZE_FAILED_LINE: &str = "{\"timestampMs\":0,\"level\":\"error\",\"event\":\"fritzbox.logger.serializeFailed\",\"message\":\"log serialization failed\"}\n";

/// JSON logger emitting one line per event.
#[derive(Clone)]
pub struct JsonLogger {
    sink: Arc<dyn LogSink>,
    base_fields: LogFields,
    min_level: LogLevel,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogLine<'a> {
    timestamp_ms: u64,
    level: &'static str,
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a LogFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a Value>,
}

impl JsonLogger {
    /// Logger writing to `sink`, passing `info` and above.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            base_fields: LogFields::new(),
            min_level: LogLevel::Info,
        }
    }

    /// Fields merged into every event (event fields win on conflict).
    #[must_use]
    pub fn with_base_fields(mut self, fields: LogFields) -> Self {
        self.base_fields = fields;
        self
    }

    /// Drop events below `level`.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    fn encode(&self, event: LogEvent) -> String {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());
        for (key, value) in &mut fields {
            redact_entry(key, value);
        }
        let error = event.error.map(|mut value| {
            redact_nested(&mut value);
            value
        });

        let line = LogLine {
            timestamp_ms: now_epoch_ms(),
            level: event.level.as_str(),
            event: &event.event,
            message: &event.message,
            fields: (!fields.is_empty()).then_some(&fields),
            error: error.as_ref(),
        };
        serde_json::to_string(&line).map_or_else(
            |_| SERIALIZE_FAILED_LINE.to_string(),
            |mut encoded| {
                encoded.push('\n');
                encoded
            },
        )
    }
}

impl LoggerPort for JsonLogger {
    fn log(&self, event: LogEvent) {
        if event.level >= self.min_level {
            self.sink.write_line(&self.encode(event));
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut logger = self.clone();
        logger.base_fields.extend(fields);
        Box::new(logger)
    }
}

fn redact_entry(key: &str, value: &mut Value) {
    if is_secret_key(key) {
        *value = Value::String(REDACTED.to_string());
    } else {
        redact_nested(value);
    }
}

fn redact_nested(value: &mut Value) {
    match value {
        Value::Object(map) => map
            .iter_mut()
            .for_each(|(key, nested)| redact_entry(key, nested)),
        Value::Array(items) => items.iter_mut().for_each(redact_nested),
        _ => {},
    }
}

pub(crate) fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| u64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}
