//! Flattened measurement records handed to metric sinks.

use crate::ScalarValue;
use serde::Serialize;
use std::collections::BTreeMap;

/// Tag set of a record.
pub type MetricTags = BTreeMap<String, String>;

/// Field set of a record.
pub type MetricFields = BTreeMap<String, ScalarValue>;

/// One emitted measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeasurementRecord {
    /// Measurement name (e.g. `fritzbox`, `fritzbox-wifi`).
    pub measurement: String,
    /// Tags identifying the series.
    pub tags: MetricTags,
    /// Collected values.
    pub fields: MetricFields,
}

impl MeasurementRecord {
    /// Create an empty record for `measurement`.
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: MetricTags::new(),
            fields: MetricFields::new(),
        }
    }

    /// Add or replace a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Set a field; a later write for the same name replaces the earlier one.
    pub fn set_field(&mut self, name: impl Into<String>, value: ScalarValue) {
        self.fields.insert(name.into(), value);
    }

    /// Returns true when no field was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
