//! Service catalog backed by a JSON device snapshot.
//!
//! A snapshot records what a device answered for each service and action:
//!
//! ```json
//! {
//!   "device": "FRITZ!Box 7590",
//!   "services": {
//!     "urn:dslforum-org:service:WLANConfiguration:1": {
//!       "actions": {
//!         "GetTotalAssociations": { "result": { "TotalAssociations": { "type": "ui2", "value": "2" } } },
//!         "GetGenericAssociatedDeviceInfo": {
//!           "param": "NewAssociatedDeviceIndex",
//!           "responses": { "0": { "AssociatedDeviceMACAddress": "AA:BB:CC:00:00:01" } },
//!           "errors": { "1": "SpecifiedArrayIndexInvalid" }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Result values are plain JSON strings, integers and booleans, or typed
//! `{"type": "<upnp type>", "value": "<text>"}` pairs. A parameterless action
//! may carry `"error"` instead of `"result"` to script a fault.

use fritzbox_domain::ScalarValue;
use fritzbox_ports::{
    ActionHandle, ActionResult, CatalogLoaderPort, DeviceTarget, ServiceCatalog, ServiceHandle,
};
use fritzbox_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Snapshot load failures.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot file could not be read.
    #[error("failed to read catalog snapshot {path}: {source}")]
    Read {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The snapshot is not valid JSON or does not match the schema.
    #[error("invalid catalog snapshot: {0}")]
    Parse(#[from] serde_json::Error),
    /// A result value cannot be turned into a scalar.
    #[error("unsupported value for {service}/{action} key {key}: {reason}")]
    InvalidValue {
        /// Service id.
        service: String,
        /// Action name.
        action: String,
        /// Result key.
        key: String,
        /// Why the value was rejected.
        reason: &'static str,
    },
    /// A response index is not a non-negative integer.
    #[error("invalid response index {index:?} for {service}/{action}")]
    InvalidIndex {
        /// Service id.
        service: String,
        /// Action name.
        action: String,
        /// Offending index text.
        index: String,
    },
    /// An action mixes parameterless and parameterised entries.
    #[error("action {service}/{action} must define either result/error or param/responses")]
    AmbiguousAction {
        /// Service id.
        service: String,
        /// Action name.
        action: String,
    },
}

impl From<SnapshotError> for ErrorEnvelope {
    fn from(error: SnapshotError) -> Self {
        let message = error.to_string();
        match error {
            SnapshotError::Read { path, source } => {
                let path = path.display().to_string();
                match source.kind() {
                    std::io::ErrorKind::NotFound => Self::expected(
                        ErrorCode::new("catalog", "snapshot_not_found"),
                        message,
                    )
                    .with_metadata("path", path),
                    _ => Self::unexpected(
                        ErrorCode::new("catalog", "snapshot_io"),
                        message,
                        ErrorClass::Retriable,
                    )
                    .with_metadata("path", path),
                }
            },
            SnapshotError::Parse(_) => {
                Self::expected(ErrorCode::new("catalog", "invalid_snapshot"), message)
            },
            SnapshotError::InvalidValue {
                service,
                action,
                key,
                ..
            } => Self::expected(ErrorCode::new("catalog", "invalid_value"), message)
                .with_metadata("service", service)
                .with_metadata("action", action)
                .with_metadata("resultKey", key),
            SnapshotError::InvalidIndex {
                service, action, ..
            }
            | SnapshotError::AmbiguousAction { service, action } => {
                Self::expected(ErrorCode::new("catalog", "invalid_action"), message)
                    .with_metadata("service", service)
                    .with_metadata("action", action)
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSnapshot {
    #[serde(default)]
    device: Option<String>,
    services: BTreeMap<String, RawService>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawService {
    #[serde(default)]
    actions: BTreeMap<String, RawAction>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAction {
    #[serde(default)]
    result: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    param: Option<String>,
    #[serde(default)]
    responses: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypedValue {
    #[serde(rename = "type")]
    data_type: String,
    value: String,
}

type Canned = std::result::Result<ActionResult, String>;

#[derive(Debug, Clone)]
enum ActionKind {
    Plain(Canned),
    Indexed {
        param: String,
        responses: BTreeMap<u64, Canned>,
    },
}

#[derive(Debug, Clone)]
struct SnapshotAction {
    service: String,
    name: String,
    kind: ActionKind,
}

fn action_fault(service: &str, action: &str, message: &str) -> ErrorEnvelope {
    ErrorEnvelope::expected(
        ErrorCode::new("catalog", "action_fault"),
        format!("{service}/{action}: {message}"),
    )
    .with_metadata("service", service)
    .with_metadata("action", action)
}

impl ActionHandle for SnapshotAction {
    fn call(&self) -> Result<ActionResult> {
        match &self.kind {
            ActionKind::Plain(Ok(result)) => Ok(result.clone()),
            ActionKind::Plain(Err(message)) => Err(action_fault(&self.service, &self.name, message)),
            ActionKind::Indexed { param, .. } => Err(action_fault(
                &self.service,
                &self.name,
                &format!("missing argument {param}"),
            )),
        }
    }

    fn call_with_param(&self, name: &str, value: &ScalarValue) -> Result<ActionResult> {
        let ActionKind::Indexed { param, responses } = &self.kind else {
            return Err(action_fault(
                &self.service,
                &self.name,
                &format!("unexpected argument {name}"),
            ));
        };
        if param != name {
            return Err(action_fault(
                &self.service,
                &self.name,
                &format!("unexpected argument {name}, expected {param}"),
            ));
        }
        let Some(index) = value.as_unsigned() else {
            return Err(action_fault(
                &self.service,
                &self.name,
                &format!("argument {name} must be unsigned, got {}", value.type_name()),
            ));
        };
        match responses.get(&index) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(action_fault(&self.service, &self.name, message)),
            None => Err(action_fault(
                &self.service,
                &self.name,
                &format!("SpecifiedArrayIndexInvalid: {index}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SnapshotService {
    actions: BTreeMap<String, SnapshotAction>,
}

impl ServiceHandle for SnapshotService {
    fn action(&self, name: &str) -> Option<&dyn ActionHandle> {
        self.actions
            .get(name)
            .map(|action| action as &dyn ActionHandle)
    }
}

/// Catalog parsed from a snapshot document.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCatalog {
    device: Option<String>,
    services: BTreeMap<String, SnapshotService>,
}

impl SnapshotCatalog {
    /// Parse a snapshot document.
    pub fn from_json_str(raw: &str) -> std::result::Result<Self, SnapshotError> {
        let snapshot: RawSnapshot = serde_json::from_str(raw)?;
        let mut services = BTreeMap::new();
        for (service_id, raw_service) in snapshot.services {
            let mut actions = BTreeMap::new();
            for (name, raw_action) in raw_service.actions {
                let kind = action_kind(&service_id, &name, raw_action)?;
                actions.insert(
                    name.clone(),
                    SnapshotAction {
                        service: service_id.clone(),
                        name,
                        kind,
                    },
                );
            }
            services.insert(service_id, SnapshotService { actions });
        }
        Ok(Self {
            device: snapshot.device,
            services,
        })
    }

    /// Read and parse a snapshot file.
    pub fn from_path(path: &Path) -> std::result::Result<Self, SnapshotError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Device model name, when recorded.
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Action names of one service, sorted.
    pub fn action_names(&self, service: &str) -> Vec<String> {
        self.services
            .get(service)
            .map(|service| service.actions.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ServiceCatalog for SnapshotCatalog {
    fn service(&self, id: &str) -> Option<&dyn ServiceHandle> {
        self.services
            .get(id)
            .map(|service| service as &dyn ServiceHandle)
    }

    fn service_ids(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }
}

fn action_kind(
    service: &str,
    action: &str,
    raw: RawAction,
) -> std::result::Result<ActionKind, SnapshotError> {
    let plain = raw.result.is_some() || raw.error.is_some();
    let indexed = raw.param.is_some() || !raw.responses.is_empty() || !raw.errors.is_empty();
    let ambiguous = || SnapshotError::AmbiguousAction {
        service: service.to_string(),
        action: action.to_string(),
    };

    match (plain, indexed) {
        (true, true) => Err(ambiguous()),
        (_, false) => {
            if let Some(message) = raw.error {
                if raw.result.is_some() {
                    return Err(ambiguous());
                }
                return Ok(ActionKind::Plain(Err(message)));
            }
            let result = convert_result(service, action, raw.result.unwrap_or_default())?;
            Ok(ActionKind::Plain(Ok(result)))
        },
        (false, true) => {
            let Some(param) = raw.param else {
                return Err(ambiguous());
            };
            let mut responses = BTreeMap::new();
            for (index, result) in raw.responses {
                let index = parse_index(service, action, &index)?;
                responses.insert(index, Ok(convert_result(service, action, result)?));
            }
            for (index, message) in raw.errors {
                let index = parse_index(service, action, &index)?;
                responses.insert(index, Err(message));
            }
            Ok(ActionKind::Indexed { param, responses })
        },
    }
}

fn parse_index(service: &str, action: &str, index: &str) -> std::result::Result<u64, SnapshotError> {
    index.parse().map_err(|_| SnapshotError::InvalidIndex {
        service: service.to_string(),
        action: action.to_string(),
        index: index.to_string(),
    })
}

fn convert_result(
    service: &str,
    action: &str,
    raw: BTreeMap<String, Value>,
) -> std::result::Result<ActionResult, SnapshotError> {
    let mut result = ActionResult::new();
    for (key, value) in raw {
        match convert_value(value) {
            Ok(scalar) => {
                result.insert(key, scalar);
            },
            Err(reason) => {
                return Err(SnapshotError::InvalidValue {
                    service: service.to_string(),
                    action: action.to_string(),
                    key,
                    reason,
                });
            },
        }
    }
    Ok(result)
}

fn convert_value(value: Value) -> std::result::Result<ScalarValue, &'static str> {
    match value {
        Value::String(text) => Ok(ScalarValue::text(text)),
        Value::Bool(flag) => Ok(ScalarValue::Boolean(flag)),
        Value::Number(number) => number
            .as_u64()
            .map(ScalarValue::Unsigned)
            .or_else(|| number.as_i64().map(ScalarValue::Signed))
            .ok_or("floating point values are not supported"),
        Value::Object(_) => serde_json::from_value::<TypedValue>(value)
            .map(|typed| ScalarValue::from_typed(&typed.data_type, &typed.value))
            .map_err(|_| "objects must be {\"type\", \"value\"} pairs"),
        Value::Null => Err("null is not a value"),
        Value::Array(_) => Err("arrays are not supported"),
    }
}

/// Loader that re-reads a snapshot file on every poll.
#[derive(Debug, Clone)]
pub struct SnapshotCatalogLoader {
    path: PathBuf,
}

impl SnapshotCatalogLoader {
    /// Loader for the snapshot at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogLoaderPort for SnapshotCatalogLoader {
    fn load(&self, target: &DeviceTarget) -> Result<Box<dyn ServiceCatalog>> {
        let catalog = SnapshotCatalog::from_path(&self.path)?;
        tracing::debug!(
            target_host = %target.host,
            target_port = target.port,
            path = %self.path.display(),
            device = catalog.device().unwrap_or("unknown"),
            services = catalog.services.len(),
            "catalog snapshot loaded"
        );
        Ok(Box::new(catalog))
    }
}
