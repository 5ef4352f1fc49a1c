//! Metric sink boundary contract.

use fritzbox_domain::MeasurementRecord;
use fritzbox_shared::Result;

/// Receives flattened records as the collectors produce them.
pub trait MetricSinkPort: Send + Sync {
    /// Accept one record.
    fn add_fields(&self, record: MeasurementRecord) -> Result<()>;

    /// Flush buffered output. The default does nothing.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
