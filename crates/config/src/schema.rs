//! Collector configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (JSON or TOML).
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.
//! - Normalization fills the device defaults for an empty host or a zero port.

use fritzbox_domain::{DEFAULT_HOST, DEFAULT_PORT};
use fritzbox_shared::{ErrorCode, ErrorEnvelope, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Host;

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

const POLL_INTERVAL_MIN_SECS: u64 = 1;
const POLL_INTERVAL_MAX_SECS: u64 = 86_400;
const POLL_INTERVAL_DEFAULT_SECS: u64 = 10;
const CATALOG_RETRY_MIN_SECS: u64 = 1;
const CATALOG_RETRY_MAX_SECS: u64 = 3_600;
const CATALOG_RETRY_DEFAULT_SECS: u64 = 60;

/// On-disk representation of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON document.
    Json,
    /// TOML document.
    Toml,
}

/// Top-level collector configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct FritzboxConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Device connection settings.
    pub device: DeviceConfig,
    /// Poll loop timing.
    pub poll: PollConfig,
    /// Catalog source settings.
    pub catalog: CatalogConfig,
    /// Record output settings.
    pub output: OutputConfig,
}

impl Default for FritzboxConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            device: DeviceConfig::default(),
            poll: PollConfig::default(),
            catalog: CatalogConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl FritzboxConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(
        mut self,
    ) -> Result<ValidatedFritzboxConfig, ConfigSchemaError> {
        self.validate_version()?;
        self.device.normalize();
        self.device.validate()?;
        self.poll.validate()?;
        self.catalog.validate()?;
        Ok(ValidatedFritzboxConfig { raw: self })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }
}

/// Validated config wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFritzboxConfig {
    raw: FritzboxConfig,
}

impl ValidatedFritzboxConfig {
    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &FritzboxConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> FritzboxConfig {
        self.raw
    }
}

impl AsRef<FritzboxConfig> for ValidatedFritzboxConfig {
    fn as_ref(&self) -> &FritzboxConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedFritzboxConfig {
    type Target = FritzboxConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Parse a config from a JSON string, applying validation and normalization.
pub fn parse_config_json(input: &str) -> Result<ValidatedFritzboxConfig, ErrorEnvelope> {
    let config: FritzboxConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a config from a TOML string, applying validation and normalization.
pub fn parse_config_toml(input: &str) -> Result<ValidatedFritzboxConfig, ErrorEnvelope> {
    let config: FritzboxConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Device connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct DeviceConfig {
    /// Hostname or address of the device.
    pub host: String,
    /// Control port.
    pub port: u16,
    /// Login name (optional).
    pub username: String,
    /// Login password (optional, never printed).
    pub password: SecretString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: SecretString::default(),
        }
    }
}

impl DeviceConfig {
    fn normalize(&mut self) {
        let trimmed = self.host.trim();
        self.host = if trimmed.is_empty() {
            DEFAULT_HOST.to_string()
        } else {
            trimmed.to_string()
        };
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        self.username = self.username.trim().to_string();
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        Host::parse(&self.host).map_err(|error| ConfigSchemaError::InvalidHost {
            value: self.host.clone(),
            reason: error.to_string(),
        })?;
        Ok(())
    }
}

/// Poll loop timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct PollConfig {
    /// Seconds between successful polls.
    pub interval_secs: u64,
    /// Seconds to wait after a catalog load failure.
    pub catalog_retry_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: POLL_INTERVAL_DEFAULT_SECS,
            catalog_retry_secs: CATALOG_RETRY_DEFAULT_SECS,
        }
    }
}

impl PollConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_range(
            "intervalSecs",
            self.interval_secs,
            POLL_INTERVAL_MIN_SECS,
            POLL_INTERVAL_MAX_SECS,
        )?;
        validate_range(
            "catalogRetrySecs",
            self.catalog_retry_secs,
            CATALOG_RETRY_MIN_SECS,
            CATALOG_RETRY_MAX_SECS,
        )
    }
}

const fn validate_range(
    field: &'static str,
    value: u64,
    min: u64,
    max: u64,
) -> Result<(), ConfigSchemaError> {
    if value < min || value > max {
        return Err(ConfigSchemaError::LimitOutOfRange {
            section: "poll",
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Catalog source settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CatalogConfig {
    /// JSON catalog snapshot to load instead of a live device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

impl CatalogConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        if path.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(ConfigSchemaError::InvalidSnapshotPath {
                reason: "path must be non-empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Record output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct OutputConfig {
    /// Encoding of emitted records.
    pub format: OutputFormat,
}

/// Encoding of emitted records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    /// Influx line protocol.
    #[default]
    LineProtocol,
    /// One JSON object per line.
    Ndjson,
}

impl OutputFormat {
    /// Parse the camelCase name used in config files and env vars.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lineprotocol" | "line-protocol" | "line_protocol" | "influx" => {
                Some(Self::LineProtocol)
            },
            "ndjson" | "json" => Some(Self::Ndjson),
            _ => None,
        }
    }

    /// Stable config name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LineProtocol => "lineProtocol",
            Self::Ndjson => "ndjson",
        }
    }
}

/// Validation failures for the config schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// The device host is not a valid hostname or address.
    InvalidHost {
        /// Host as configured.
        value: String,
        /// Parser error.
        reason: String,
    },
    /// A numeric limit is out of bounds.
    LimitOutOfRange {
        /// Schema section (e.g. `poll`).
        section: &'static str,
        /// Field name in the config file (e.g. `intervalSecs`).
        field: &'static str,
        /// Value provided.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
    /// The catalog snapshot path is unusable.
    InvalidSnapshotPath {
        /// Human readable reason.
        reason: String,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::InvalidHost { .. } => ErrorCode::new("config", "invalid_host"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "invalid_limit"),
            Self::InvalidSnapshotPath { .. } => ErrorCode::new("config", "invalid_snapshot_path"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => write!(
                formatter,
                "unsupported config version: {found} (supported: {supported})"
            ),
            Self::InvalidHost { value, reason } => {
                write!(formatter, "device.host is invalid ({value}): {reason}")
            },
            Self::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min}, {max}] (got {value})"
            ),
            Self::InvalidSnapshotPath { reason } => {
                write!(formatter, "invalid catalog.snapshotPath: {reason}")
            },
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => envelope
                .with_metadata("found", found.to_string())
                .with_metadata("supported", supported.to_string()),
            ConfigSchemaError::InvalidHost { value, .. } => envelope
                .with_metadata("section", "device")
                .with_metadata("field", "host")
                .with_metadata("value", value),
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("value", value.to_string())
                .with_metadata("min", min.to_string())
                .with_metadata("max", max.to_string()),
            ConfigSchemaError::InvalidSnapshotPath { .. } => envelope
                .with_metadata("section", "catalog")
                .with_metadata("field", "snapshotPath"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn defaults_validate() -> Result<(), ConfigSchemaError> {
        let config = FritzboxConfig::default().validate_and_normalize()?;
        assert_eq!(config.device.host, "fritz.box");
        assert_eq!(config.device.port, 49000);
        assert_eq!(config.poll.interval_secs, 10);
        assert_eq!(config.poll.catalog_retry_secs, 60);
        assert_eq!(config.output.format, OutputFormat::LineProtocol);
        Ok(())
    }

    #[test]
    fn empty_host_and_zero_port_fall_back_to_defaults() -> Result<(), ConfigSchemaError> {
        let mut config = FritzboxConfig::default();
        config.device.host = "  ".to_string();
        config.device.port = 0;
        let config = config.validate_and_normalize()?;
        assert_eq!(config.device.host, DEFAULT_HOST);
        assert_eq!(config.device.port, DEFAULT_PORT);
        Ok(())
    }

    #[test]
    fn rejects_invalid_host() {
        let mut config = FritzboxConfig::default();
        config.device.host = "fritz box".to_string();
        let error = config.validate_and_normalize();
        assert!(matches!(
            error,
            Err(ConfigSchemaError::InvalidHost { ref value, .. }) if value == "fritz box"
        ));
    }

    #[test]
    fn accepts_ip_hosts() -> Result<(), ConfigSchemaError> {
        let mut config = FritzboxConfig::default();
        config.device.host = "192.168.178.1".to_string();
        config.validate_and_normalize()?;
        Ok(())
    }

    #[test]
    fn rejects_interval_out_of_range() {
        let mut config = FritzboxConfig::default();
        config.poll.interval_secs = 0;
        let error: ErrorEnvelope = match config.validate_and_normalize() {
            Ok(_) => ErrorEnvelope::expected(ErrorCode::internal(), "unexpected success"),
            Err(error) => error.into(),
        };
        assert_eq!(error.code, ErrorCode::new("config", "invalid_limit"));
        assert_eq!(
            error.metadata.get("field").map(String::as_str),
            Some("intervalSecs")
        );
    }

    #[test]
    fn rejects_unsupported_version() {
        let config = FritzboxConfig {
            version: 2,
            ..FritzboxConfig::default()
        };
        assert_eq!(
            config.validate_and_normalize(),
            Err(ConfigSchemaError::UnsupportedVersion {
                found: 2,
                supported: 1,
            })
        );
    }

    #[test]
    fn parses_camel_case_json() -> Result<(), Box<dyn Error>> {
        let config = parse_config_json(
            r#"{"device":{"host":"router.lan","password":"pw"},"poll":{"intervalSecs":30},"output":{"format":"ndjson"}}"#,
        )?;
        assert_eq!(config.device.host, "router.lan");
        assert_eq!(config.device.password.expose(), "pw");
        assert_eq!(config.poll.interval_secs, 30);
        assert_eq!(config.output.format, OutputFormat::Ndjson);
        Ok(())
    }

    #[test]
    fn rejects_unknown_fields() {
        let error = parse_config_toml("[device]\nhostname = \"x\"\n");
        assert!(matches!(
            error,
            Err(ref envelope) if envelope.code == ErrorCode::new("config", "invalid_toml")
        ));
    }

    #[test]
    fn password_is_redacted_when_serialized() -> Result<(), Box<dyn Error>> {
        let mut config = FritzboxConfig::default();
        config.device.password = SecretString::from("hunter2");
        let json = serde_json::to_string(&config)?;
        assert!(!json.contains("hunter2"));
        assert!(!format!("{config:?}").contains("hunter2"));
        Ok(())
    }

    #[test]
    fn output_format_accepts_aliases() {
        assert_eq!(OutputFormat::parse("lineProtocol"), Some(OutputFormat::LineProtocol));
        assert_eq!(OutputFormat::parse("NDJSON"), Some(OutputFormat::Ndjson));
        assert_eq!(OutputFormat::parse("csv"), None);
    }
}
