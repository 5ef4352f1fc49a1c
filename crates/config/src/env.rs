//! Environment variable parsing and env-to-config merging.
//!
//! Env parsing is strict: a variable that is present but empty or malformed
//! fails fast instead of being ignored. Secret values are redacted in error
//! metadata.

use crate::schema::{FritzboxConfig, OutputFormat, ValidatedFritzboxConfig};
use fritzbox_shared::{ErrorCode, ErrorEnvelope, SecretString, redact_if_secret};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Env var: device host.
pub const ENV_HOST: &str = "FRITZBOX_HOST";
/// Env var: device control port.
pub const ENV_PORT: &str = "FRITZBOX_PORT";
/// Env var: login name.
pub const ENV_USERNAME: &str = "FRITZBOX_USERNAME";
/// Env var: login password (secret).
pub const ENV_PASSWORD: &str = "FRITZBOX_PASSWORD";
/// Env var: seconds between polls.
pub const ENV_POLL_INTERVAL_SECS: &str = "FRITZBOX_POLL_INTERVAL_SECS";
/// Env var: seconds to wait after a catalog failure.
pub const ENV_CATALOG_RETRY_SECS: &str = "FRITZBOX_CATALOG_RETRY_SECS";
/// Env var: catalog snapshot path.
pub const ENV_CATALOG_SNAPSHOT: &str = "FRITZBOX_CATALOG_SNAPSHOT";
/// Env var: output format (`lineProtocol` or `ndjson`).
pub const ENV_OUTPUT_FORMAT: &str = "FRITZBOX_OUTPUT_FORMAT";

const ALL_VARS: [&str; 8] = [
    ENV_HOST,
    ENV_PORT,
    ENV_USERNAME,
    ENV_PASSWORD,
    ENV_POLL_INTERVAL_SECS,
    ENV_CATALOG_RETRY_SECS,
    ENV_CATALOG_SNAPSHOT,
    ENV_OUTPUT_FORMAT,
];

/// Parsed env overrides. `None` means the variable was not set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FritzboxEnv {
    /// Device host.
    pub host: Option<Box<str>>,
    /// Device port.
    pub port: Option<u16>,
    /// Login name.
    pub username: Option<Box<str>>,
    /// Login password.
    pub password: Option<SecretString>,
    /// Poll interval.
    pub poll_interval_secs: Option<u64>,
    /// Catalog retry backoff.
    pub catalog_retry_secs: Option<u64>,
    /// Catalog snapshot path.
    pub catalog_snapshot: Option<PathBuf>,
    /// Output format.
    pub output_format: Option<OutputFormat>,
}

impl FritzboxEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            host: parse_optional_trimmed_string(map, ENV_HOST)?,
            port: parse_optional_int(map, ENV_PORT)?,
            username: parse_optional_trimmed_string(map, ENV_USERNAME)?,
            password: parse_optional_secret(map, ENV_PASSWORD)?,
            poll_interval_secs: parse_optional_int(map, ENV_POLL_INTERVAL_SECS)?,
            catalog_retry_secs: parse_optional_int(map, ENV_CATALOG_RETRY_SECS)?,
            catalog_snapshot: parse_optional_trimmed_string(map, ENV_CATALOG_SNAPSHOT)?
                .map(|value| PathBuf::from(String::from(value))),
            output_format: parse_optional_output_format(map, ENV_OUTPUT_FORMAT)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let map: BTreeMap<String, String> = ALL_VARS
            .iter()
            .filter_map(|name| {
                std::env::var(name)
                    .ok()
                    .map(|value| ((*name).to_string(), value))
            })
            .collect();
        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
///
/// The merged config is validated and normalized before it is returned.
pub fn apply_env_overrides(
    base: FritzboxConfig,
    env: &FritzboxEnv,
) -> Result<ValidatedFritzboxConfig, ErrorEnvelope> {
    let mut config = base;

    if let Some(host) = &env.host {
        config.device.host = host.to_string();
    }
    if let Some(port) = env.port {
        config.device.port = port;
    }
    if let Some(username) = &env.username {
        config.device.username = username.to_string();
    }
    if let Some(password) = &env.password {
        config.device.password = password.clone();
    }
    if let Some(interval) = env.poll_interval_secs {
        config.poll.interval_secs = interval;
    }
    if let Some(retry) = env.catalog_retry_secs {
        config.poll.catalog_retry_secs = retry;
    }
    if let Some(path) = &env.catalog_snapshot {
        config.catalog.snapshot_path = Some(path.clone());
    }
    if let Some(format) = env.output_format {
        config.output.format = format;
    }

    config.validate_and_normalize().map_err(Into::into)
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// A secret env var was present but empty after trimming.
    EmptySecret {
        /// Env var name.
        var: &'static str,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Enum env var had an invalid value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } | Self::EmptySecret { .. } => {
                ErrorCode::new("config", "empty_env_var")
            },
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } | Self::EmptySecret { var } => {
                write!(formatter, "{var} must be non-empty")
            },
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } | EnvParseError::EmptySecret { var } => {
                envelope.with_metadata("env_var", var)
            },
            EnvParseError::InvalidInt { var, value } | EnvParseError::InvalidEnum { var, value } => {
                envelope
                    .with_metadata("env_var", var)
                    .with_metadata("value", redact_value(var, &value))
            },
        }
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.into()))
}

fn parse_optional_secret(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SecretString>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    // Passwords are taken verbatim; only an all-blank value is rejected.
    if raw.trim().is_empty() {
        return Err(EnvParseError::EmptySecret { var });
    }

    Ok(Some(SecretString::new(raw.as_str())))
}

fn parse_optional_int<T: std::str::FromStr>(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<T>, EnvParseError> {
    let Some(raw) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };

    raw.parse::<T>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.to_string(),
        })
}

fn parse_optional_output_format(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<OutputFormat>, EnvParseError> {
    let Some(raw) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };

    OutputFormat::parse(&raw)
        .map(Some)
        .ok_or_else(|| EnvParseError::InvalidEnum {
            var,
            value: raw.to_string(),
        })
}

fn redact_value(var: &str, value: &str) -> String {
    redact_if_secret(var, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn env_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn empty_map_yields_no_overrides() -> Result<(), EnvParseError> {
        assert_eq!(FritzboxEnv::from_map(&BTreeMap::new())?, FritzboxEnv::default());
        Ok(())
    }

    #[test]
    fn env_wins_over_base_config() -> Result<(), Box<dyn Error>> {
        let env = FritzboxEnv::from_map(&env_map(&[
            (ENV_HOST, " 192.168.178.1 "),
            (ENV_PORT, "49443"),
            (ENV_PASSWORD, "s3cret"),
            (ENV_OUTPUT_FORMAT, "ndjson"),
        ]))?;

        let config = apply_env_overrides(FritzboxConfig::default(), &env)?;
        assert_eq!(config.device.host, "192.168.178.1");
        assert_eq!(config.device.port, 49443);
        assert_eq!(config.device.password.expose(), "s3cret");
        assert_eq!(config.output.format, OutputFormat::Ndjson);
        Ok(())
    }

    #[test]
    fn rejects_empty_values() {
        let error = FritzboxEnv::from_map(&env_map(&[(ENV_USERNAME, "  ")]));
        assert_eq!(error, Err(EnvParseError::EmptyValue { var: ENV_USERNAME }));
    }

    #[test]
    fn rejects_non_numeric_port() {
        let error = FritzboxEnv::from_map(&env_map(&[(ENV_PORT, "http")]));
        assert_eq!(
            error,
            Err(EnvParseError::InvalidInt {
                var: ENV_PORT,
                value: "http".to_string(),
            })
        );
    }

    #[test]
    fn rejects_port_above_u16() {
        let error = FritzboxEnv::from_map(&env_map(&[(ENV_PORT, "70000")]));
        assert!(matches!(error, Err(EnvParseError::InvalidInt { .. })));
    }

    #[test]
    fn rejects_unknown_output_format() {
        let error: Result<FritzboxEnv, ErrorEnvelope> =
            FritzboxEnv::from_map(&env_map(&[(ENV_OUTPUT_FORMAT, "yaml")])).map_err(Into::into);
        assert!(matches!(
            error,
            Err(ref envelope) if envelope.code == ErrorCode::new("config", "invalid_env_enum")
                && envelope.metadata.get("value").map(String::as_str) == Some("yaml")
        ));
    }

    #[test]
    fn secret_values_are_redacted_in_metadata() {
        assert_eq!(redact_value(ENV_PASSWORD, "hunter2"), fritzbox_shared::REDACTED);
        assert_eq!(redact_value(ENV_HOST, "fritz.box"), "fritz.box");
    }

    #[test]
    fn merged_config_is_validated() -> Result<(), EnvParseError> {
        let env = FritzboxEnv::from_map(&env_map(&[(ENV_POLL_INTERVAL_SECS, "0")]))?;
        let result = apply_env_overrides(FritzboxConfig::default(), &env);
        assert!(matches!(
            result,
            Err(ref envelope) if envelope.code == ErrorCode::new("config", "invalid_limit")
        ));
        Ok(())
    }
}
