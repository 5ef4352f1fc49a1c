//! Declarative metric definitions.
//!
//! A [`MetricTable`] is built once at startup and injected into the
//! collectors. Order within each list matters: consecutive definitions that
//! share a `(service, action)` pair reuse one call, and a later field name
//! overwrites an earlier one.

use crate::{DomainError, ServiceInstanceId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Default device host when none is configured.
pub const DEFAULT_HOST: &str = "fritz.box";
/// Default control port when none (or 0) is configured.
pub const DEFAULT_PORT: u16 = 49000;
/// Tag carrying the device host on every record.
pub const HOST_TAG: &str = "fritzbox";
/// Tag carrying the service instance number on complex records.
pub const SERVICE_TAG: &str = "service";
/// Measurement name of the flat per-poll record.
pub const SIMPLE_MEASUREMENT: &str = "fritzbox";

const WAN_COMMON: &str = "urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1";
const WAN_IP: &str = "urn:schemas-upnp-org:service:WANIPConnection:1";
const WLAN_CONFIGURATION: &str = "urn:dslforum-org:service:WLANConfiguration";

/// One scalar read from a parameterless action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleMetricSpec {
    /// Fully qualified service id.
    pub service: String,
    /// Action name on that service.
    pub action: String,
    /// Key looked up in the action result.
    pub result_key: String,
    /// Field name in the emitted record.
    pub field_name: String,
}

impl SimpleMetricSpec {
    /// Build a definition.
    pub fn new(
        service: impl Into<String>,
        action: impl Into<String>,
        result_key: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            action: action.into(),
            result_key: result_key.into(),
            field_name: field_name.into(),
        }
    }

    fn validate(&self) -> Result<(), DomainError> {
        let attributes = [
            ("service", &self.service),
            ("action", &self.action),
            ("resultKey", &self.result_key),
            ("fieldName", &self.field_name),
        ];
        for (attribute, value) in attributes {
            if value.trim().is_empty() {
                return Err(DomainError::EmptyMetricAttribute {
                    definition: self.field_name.clone(),
                    attribute,
                });
            }
        }
        Ok(())
    }
}

/// A metric that enumerates numbered service instances and emits one record
/// per element of a variable-length sub-collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexMetricSpec {
    /// Service family prefix; instances are `prefix:1 ..= prefix:instance_count`.
    pub service_prefix: String,
    /// Number of numbered instances to walk.
    pub instance_count: u32,
    /// Action returning the element count.
    pub count_action: String,
    /// Result key holding the element count.
    pub count_result_key: String,
    /// Action returning one element, called with an index parameter.
    pub per_element_action: String,
    /// Parameter name carrying the element index.
    pub element_index_param: String,
    /// Measurement name of the emitted records.
    pub measurement_name: String,
    /// Tag name to result key.
    pub tag_extract: BTreeMap<String, String>,
    /// Field name to result key.
    pub field_extract: BTreeMap<String, String>,
}

impl ComplexMetricSpec {
    /// Ids of every instance this definition walks, in order.
    pub fn instance_ids(&self) -> Result<Vec<ServiceInstanceId>, DomainError> {
        ServiceInstanceId::family(&self.service_prefix, self.instance_count)
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.instance_count == 0 {
            return Err(DomainError::NoServiceInstances {
                measurement: self.measurement_name.clone(),
            });
        }
        let attributes = [
            ("servicePrefix", &self.service_prefix),
            ("countAction", &self.count_action),
            ("countResultKey", &self.count_result_key),
            ("perElementAction", &self.per_element_action),
            ("elementIndexParam", &self.element_index_param),
            ("measurementName", &self.measurement_name),
        ];
        for (attribute, value) in attributes {
            if value.trim().is_empty() {
                return Err(DomainError::EmptyMetricAttribute {
                    definition: self.measurement_name.clone(),
                    attribute,
                });
            }
        }
        Ok(())
    }
}

/// Immutable set of metric definitions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MetricTable {
    /// Flat metrics merged into one record per poll.
    pub simple: Vec<SimpleMetricSpec>,
    /// Multi-instance, multi-record metrics.
    pub complex: Vec<ComplexMetricSpec>,
}

impl MetricTable {
    /// Build a table after checking every definition.
    pub fn new(
        simple: Vec<SimpleMetricSpec>,
        complex: Vec<ComplexMetricSpec>,
    ) -> Result<Self, DomainError> {
        simple.iter().try_for_each(SimpleMetricSpec::validate)?;
        complex.iter().try_for_each(ComplexMetricSpec::validate)?;
        Ok(Self { simple, complex })
    }

    /// The FRITZ!Box WAN counters and WLAN client table.
    #[must_use]
    pub fn fritzbox_default() -> Self {
        let simple = vec![
            SimpleMetricSpec::new(
                WAN_COMMON,
                "GetTotalPacketsReceived",
                "TotalPacketsReceived",
                "packets_received",
            ),
            SimpleMetricSpec::new(
                WAN_COMMON,
                "GetTotalPacketsSent",
                "TotalPacketsSent",
                "packets_sent",
            ),
            SimpleMetricSpec::new(
                WAN_COMMON,
                "GetAddonInfos",
                "TotalBytesReceived",
                "bytes_received",
            ),
            SimpleMetricSpec::new(WAN_COMMON, "GetAddonInfos", "TotalBytesSent", "bytes_sent"),
            SimpleMetricSpec::new(
                WAN_COMMON,
                "GetCommonLinkProperties",
                "PhysicalLinkStatus",
                "link_status",
            ),
            SimpleMetricSpec::new(
                WAN_IP,
                "GetStatusInfo",
                "ConnectionStatus",
                "connection_status",
            ),
            SimpleMetricSpec::new(WAN_IP, "GetStatusInfo", "Uptime", "uptime"),
        ];

        let complex = vec![ComplexMetricSpec {
            service_prefix: WLAN_CONFIGURATION.to_string(),
            instance_count: 3,
            count_action: "GetTotalAssociations".to_string(),
            count_result_key: "TotalAssociations".to_string(),
            per_element_action: "GetGenericAssociatedDeviceInfo".to_string(),
            element_index_param: "NewAssociatedDeviceIndex".to_string(),
            measurement_name: "fritzbox-wifi".to_string(),
            tag_extract: extract_map(&[
                ("wlan_device_mac", "AssociatedDeviceMACAddress"),
                ("wlan_device_ip", "AssociatedDeviceIPAddress"),
            ]),
            field_extract: extract_map(&[
                ("wlan_device_signal", "X_AVM-DE_SignalStrength"),
                ("wlan_device_speed", "X_AVM-DE_Speed"),
            ]),
        }];

        Self { simple, complex }
    }

    /// Number of definitions across both lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.simple.len() + self.complex.len()
    }

    /// Returns true when the table holds no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.simple.is_empty() && self.complex.is_empty()
    }
}

fn extract_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(name, key)| ((*name).to_string(), (*key).to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn default_table_validates() -> Result<(), Box<dyn Error>> {
        let table = MetricTable::fritzbox_default();
        let rebuilt = MetricTable::new(table.simple.clone(), table.complex.clone())?;
        assert_eq!(rebuilt, table);
        assert_eq!(table.simple.len(), 7);
        assert_eq!(table.complex.len(), 1);
        Ok(())
    }

    #[test]
    fn default_field_names_are_unique() {
        let table = MetricTable::fritzbox_default();
        let mut names: Vec<&str> = table.simple.iter().map(|s| s.field_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), table.simple.len());
    }

    #[test]
    fn default_wlan_instances_are_one_based() -> Result<(), Box<dyn Error>> {
        let table = MetricTable::fritzbox_default();
        let ids = table
            .complex
            .first()
            .map(ComplexMetricSpec::instance_ids)
            .transpose()?
            .unwrap_or_default();
        assert_eq!(
            ids.first().map(ToString::to_string).as_deref(),
            Some("urn:dslforum-org:service:WLANConfiguration:1")
        );
        assert_eq!(
            ids.last().map(ToString::to_string).as_deref(),
            Some("urn:dslforum-org:service:WLANConfiguration:3")
        );
        Ok(())
    }

    #[test]
    fn rejects_empty_attributes() {
        let spec = SimpleMetricSpec::new("svc", "", "Key", "field");
        let result = MetricTable::new(vec![spec], Vec::new());
        assert_eq!(
            result,
            Err(DomainError::EmptyMetricAttribute {
                definition: "field".to_string(),
                attribute: "action",
            })
        );
    }

    #[test]
    fn rejects_complex_without_instances() {
        let specs: Vec<ComplexMetricSpec> = MetricTable::fritzbox_default()
            .complex
            .into_iter()
            .map(|mut spec| {
                spec.instance_count = 0;
                spec
            })
            .collect();
        let result = MetricTable::new(Vec::new(), specs);
        assert_eq!(
            result,
            Err(DomainError::NoServiceInstances {
                measurement: "fritzbox-wifi".to_string(),
            })
        );
    }

    #[test]
    fn serializes_camel_case() -> Result<(), Box<dyn Error>> {
        let table = MetricTable::fritzbox_default();
        let value = serde_json::to_value(&table)?;
        assert_eq!(
            value["simple"][0]["fieldName"],
            serde_json::json!("packets_received")
        );
        assert_eq!(
            value["complex"][0]["elementIndexParam"],
            serde_json::json!("NewAssociatedDeviceIndex")
        );
        Ok(())
    }
}
