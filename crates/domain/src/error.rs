//! Validation failures for domain values.

use fritzbox_shared::{ErrorCode, ErrorEnvelope};
use std::fmt;

/// Validation failures for service ids and metric definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Service instances are numbered from 1.
    ZeroServiceIndex {
        /// Service family prefix.
        prefix: String,
    },
    /// A service family prefix is empty after trimming.
    EmptyServicePrefix,
    /// A metric definition has an empty required attribute.
    EmptyMetricAttribute {
        /// Definition identifier (field or measurement name).
        definition: String,
        /// Attribute name (e.g. `action`).
        attribute: &'static str,
    },
    /// A complex definition declares zero service instances.
    NoServiceInstances {
        /// Measurement name of the definition.
        measurement: String,
    },
}

impl DomainError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::ZeroServiceIndex { .. } | Self::EmptyServicePrefix => {
                ErrorCode::new("domain", "invalid_service_id")
            },
            Self::EmptyMetricAttribute { .. } | Self::NoServiceInstances { .. } => {
                ErrorCode::new("domain", "invalid_metric_definition")
            },
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroServiceIndex { prefix } => {
                write!(formatter, "service instance index for {prefix} must be >= 1")
            },
            Self::EmptyServicePrefix => formatter.write_str("service prefix must be non-empty"),
            Self::EmptyMetricAttribute {
                definition,
                attribute,
            } => write!(
                formatter,
                "metric definition {definition} has an empty {attribute}"
            ),
            Self::NoServiceInstances { measurement } => write!(
                formatter,
                "complex metric {measurement} must declare at least one service instance"
            ),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<DomainError> for ErrorEnvelope {
    fn from(error: DomainError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            DomainError::ZeroServiceIndex { prefix } => envelope.with_metadata("prefix", prefix),
            DomainError::EmptyServicePrefix => envelope,
            DomainError::EmptyMetricAttribute {
                definition,
                attribute,
            } => envelope
                .with_metadata("definition", definition)
                .with_metadata("attribute", attribute),
            DomainError::NoServiceInstances { measurement } => {
                envelope.with_metadata("measurement", measurement)
            },
        }
    }
}
