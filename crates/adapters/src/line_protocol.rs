//! Influx line-protocol encoding and a writer-backed metric sink.
//!
//! `measurement[,tag=value...] field=value[,field=value...] [timestamp]`
//!
//! Measurements escape commas, spaces and backslashes; tag keys, tag values
//! and field keys additionally escape `=`. String field values are
//! double-quoted with `"` and `\` escaped. Line breaks never reach the
//! output: a line feed or carriage return is written as a backslash followed
//! by `n` or `r`. Unsigned integers carry a `u` suffix, signed integers an `i`
//! suffix.

use fritzbox_domain::{MeasurementRecord, ScalarValue};
use fritzbox_ports::MetricSinkPort;
use fritzbox_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use std::fmt::Write as _;
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Write a line break as an escape sequence; false for any other char.
fn push_line_break(out: &mut String, ch: char) -> bool {
    match ch {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        _ => return false,
    }
    true
}

fn escape_into(out: &mut String, raw: &str, extra: &[char]) {
    for ch in raw.chars() {
        if push_line_break(out, ch) {
            continue;
        }
        if ch == ',' || ch == ' ' || ch == '\\' || extra.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
}

fn push_field_value(out: &mut String, value: &ScalarValue) {
    match value {
        ScalarValue::Text(text) => {
            out.push('"');
            for ch in text.chars() {
                if push_line_break(out, ch) {
                    continue;
                }
                if ch == '"' || ch == '\\' {
                    out.push('\\');
                }
                out.push(ch);
            }
            out.push('"');
        },
        ScalarValue::Unsigned(number) => {
            let _ = write!(out, "{number}u");
        },
        ScalarValue::Signed(number) => {
            let _ = write!(out, "{number}i");
        },
        ScalarValue::Boolean(flag) => out.push_str(if *flag { "true" } else { "false" }),
        ScalarValue::Unknown(_) => {},
    }
}

/// Encode one record as a line (without trailing newline).
///
/// Returns `None` when the record has no encodable field. Tags with empty
/// values and fields of unknown type are left out.
pub fn encode_record(record: &MeasurementRecord, timestamp_ns: Option<u128>) -> Option<String> {
    let mut line = String::new();
    escape_into(&mut line, &record.measurement, &[]);

    for (key, value) in &record.tags {
        if value.is_empty() || key.is_empty() {
            continue;
        }
        line.push(',');
        escape_into(&mut line, key, &['=']);
        line.push('=');
        escape_into(&mut line, value, &['=']);
    }

    let mut wrote_field = false;
    for (key, value) in &record.fields {
        if matches!(value, ScalarValue::Unknown(_)) {
            continue;
        }
        line.push(if wrote_field { ',' } else { ' ' });
        escape_into(&mut line, key, &['=']);
        line.push('=');
        push_field_value(&mut line, value);
        wrote_field = true;
    }
    if !wrote_field {
        return None;
    }

    if let Some(timestamp) = timestamp_ns {
        let _ = write!(line, " {timestamp}");
    }
    Some(line)
}

pub(crate) fn now_epoch_ns() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or_default()
}

pub(crate) fn write_error(format: &str, error: &std::io::Error) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::io(),
        format!("failed to write {format} output: {error}"),
        ErrorClass::NonRetriable,
    )
}

/// Sink writing one line-protocol line per record.
pub struct LineProtocolSink<W: Write + Send> {
    writer: Mutex<W>,
    timestamps: bool,
}

impl<W: Write + Send> LineProtocolSink<W> {
    /// Sink stamping every line with the current time.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            timestamps: true,
        }
    }

    /// Leave timestamps out; the consumer assigns them on receipt.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> MetricSinkPort for LineProtocolSink<W> {
    fn add_fields(&self, record: MeasurementRecord) -> Result<()> {
        let timestamp = self.timestamps.then(now_epoch_ns);
        let Some(mut line) = encode_record(&record, timestamp) else {
            tracing::debug!(measurement = %record.measurement, "record without fields not written");
            return Ok(());
        };
        line.push('\n');
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer
            .write_all(line.as_bytes())
            .map_err(|error| write_error("line protocol", &error))
    }

    fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
            .map_err(|error| write_error("line protocol", &error))
    }
}
