//! Recording metric sink.

use fritzbox_domain::MeasurementRecord;
use fritzbox_ports::MetricSinkPort;
use fritzbox_shared::{ErrorCode, ErrorEnvelope, Result};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
struct SinkState {
    records: Vec<MeasurementRecord>,
    flushes: usize,
}

/// Sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    state: Mutex<SinkState>,
    accept_limit: Option<usize>,
}

impl RecordingSink {
    /// Sink that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that fails once `limit` records were accepted.
    pub fn failing_after(limit: usize) -> Self {
        Self {
            state: Mutex::default(),
            accept_limit: Some(limit),
        }
    }

    /// Accepted records, in arrival order.
    pub fn records(&self) -> Vec<MeasurementRecord> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .clone()
    }

    /// Records with the given measurement name.
    pub fn records_named(&self, measurement: &str) -> Vec<MeasurementRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.measurement == measurement)
            .collect()
    }

    /// Number of `flush` calls.
    pub fn flushes(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flushes
    }
}

impl MetricSinkPort for RecordingSink {
    fn add_fields(&self, record: MeasurementRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if self
            .accept_limit
            .is_some_and(|limit| state.records.len() >= limit)
        {
            return Err(ErrorEnvelope::expected(ErrorCode::io(), "sink is closed"));
        }
        state.records.push(record);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flushes += 1;
        Ok(())
    }
}
