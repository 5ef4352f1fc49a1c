//! No-op and recording logger/telemetry implementations.

use fritzbox_ports::{LogEvent, LogFields, LoggerPort, TelemetryPort, TelemetryTags, TelemetryTimer};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// A no-op telemetry timer.
#[derive(Debug, Default)]
pub struct NoopTimer;

impl TelemetryTimer for NoopTimer {
    fn stop(&self) {}
}

/// A no-op telemetry implementation.
#[derive(Debug, Default)]
pub struct NoopTelemetry;

impl TelemetryPort for NoopTelemetry {
    fn increment_counter(&self, _name: &str, _value: u64, _tags: Option<&TelemetryTags>) {}

    fn record_timer_ms(&self, _name: &str, _duration_ms: u64, _tags: Option<&TelemetryTags>) {}

    fn start_timer(&self, _name: &str, _tags: Option<&TelemetryTags>) -> Box<dyn TelemetryTimer> {
        Box::new(NoopTimer)
    }
}

/// Logger that keeps every event; children share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
    base: LogFields,
}

impl RecordingLogger {
    /// Every event logged so far.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events with the given name.
    pub fn events_named(&self, name: &str) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.event.as_ref() == name)
            .collect()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, mut event: LogEvent) {
        if !self.base.is_empty() {
            let mut merged = self.base.clone();
            merged.extend(event.fields.take().unwrap_or_default());
            event.fields = Some(merged);
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut base = self.base.clone();
        base.extend(fields);
        Box::new(Self {
            events: Arc::clone(&self.events),
            base,
        })
    }
}

#[derive(Debug, Default)]
struct TelemetryState {
    counters: BTreeMap<String, u64>,
    timers: Vec<String>,
}

/// Telemetry that sums counters and lists recorded timers.
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    state: Arc<Mutex<TelemetryState>>,
}

impl RecordingTelemetry {
    /// Current value of a counter (0 when never incremented).
    pub fn counter(&self, name: &str) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .counters
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Names of recorded timers, in order.
    pub fn timers(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .timers
            .clone()
    }
}

struct RecordingTimer {
    name: String,
    state: Arc<Mutex<TelemetryState>>,
}

impl TelemetryTimer for RecordingTimer {
    fn stop(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .timers
            .push(self.name.clone());
    }
}

impl TelemetryPort for RecordingTelemetry {
    fn increment_counter(&self, name: &str, value: u64, _tags: Option<&TelemetryTags>) {
        *self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .counters
            .entry(name.to_string())
            .or_default() += value;
    }

    fn record_timer_ms(&self, name: &str, _duration_ms: u64, _tags: Option<&TelemetryTags>) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .timers
            .push(name.to_string());
    }

    fn start_timer(&self, name: &str, _tags: Option<&TelemetryTags>) -> Box<dyn TelemetryTimer> {
        Box::new(RecordingTimer {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        })
    }
}
