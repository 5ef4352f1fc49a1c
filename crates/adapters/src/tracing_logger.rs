//! Logger adapter that forwards events to `tracing`.

use fritzbox_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use fritzbox_shared::redaction::{REDACTED, is_secret_key};
use serde_json::Value;

/// Forwards [`LogEvent`]s to the installed `tracing` subscriber.
///
/// Structured fields are rendered as one JSON object in the `fields` field.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    base_fields: LogFields,
}

impl TracingLogger {
    /// Logger without base fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoggerPort for TracingLogger {
    fn log(&self, event: LogEvent) {
        let mut fields = self.base_fields.clone();
        if let Some(extra) = event.fields {
            fields.extend(extra);
        }
        let rendered = render_fields(&fields);
        let error = event.error.map(|error| error.to_string()).unwrap_or_default();
        let name = event.event.as_ref();
        let message = event.message.as_ref();

        match event.level {
            LogLevel::Debug => {
                tracing::debug!(event = name, fields = %rendered, error = %error, "{message}");
            },
            LogLevel::Info => {
                tracing::info!(event = name, fields = %rendered, error = %error, "{message}");
            },
            LogLevel::Warn => {
                tracing::warn!(event = name, fields = %rendered, error = %error, "{message}");
            },
            LogLevel::Error => {
                tracing::error!(event = name, fields = %rendered, error = %error, "{message}");
            },
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut base_fields = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self { base_fields })
    }
}

fn render_fields(fields: &LogFields) -> String {
    let map: serde_json::Map<String, Value> = fields
        .iter()
        .map(|(key, value)| {
            let value = if is_secret_key(key) {
                Value::String(REDACTED.to_string())
            } else {
                value.clone()
            };
            (key.to_string(), value)
        })
        .collect();
    Value::Object(map).to_string()
}
