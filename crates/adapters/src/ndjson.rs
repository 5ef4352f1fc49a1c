//! Newline-delimited JSON metric sink.

use crate::line_protocol::{now_epoch_ns, write_error};
use fritzbox_domain::MeasurementRecord;
use fritzbox_ports::MetricSinkPort;
use fritzbox_shared::{ErrorCode, ErrorEnvelope, Result};
use serde::Serialize;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NdjsonLine<'a> {
    #[serde(flatten)]
    record: &'a MeasurementRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp_ms: Option<u64>,
}

/// Sink writing each record as one JSON object per line.
///
/// Unlike the line-protocol sink, records without fields are written too.
pub struct NdjsonSink<W: Write + Send> {
    writer: Mutex<W>,
    timestamps: bool,
}

impl<W: Write + Send> NdjsonSink<W> {
    /// Sink stamping every record with the current time.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            timestamps: true,
        }
    }

    /// Leave timestamps out.
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

impl<W: Write + Send> MetricSinkPort for NdjsonSink<W> {
    fn add_fields(&self, record: MeasurementRecord) -> Result<()> {
        let timestamp_ms = self
            .timestamps
            .then(|| u64::try_from(now_epoch_ns() / 1_000_000).unwrap_or(u64::MAX));
        let mut line = serde_json::to_string(&NdjsonLine {
            record: &record,
            timestamp_ms,
        })
        .map_err(|error| {
            ErrorEnvelope::invariant(
                ErrorCode::internal(),
                format!("failed to encode record: {error}"),
            )
        })?;
        line.push('\n');
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_all(line.as_bytes())
            .map_err(|error| write_error("ndjson", &error))
    }

    fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
            .map_err(|error| write_error("ndjson", &error))
    }
}
