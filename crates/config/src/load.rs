//! Config loading helpers (env + file).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::{ConfigFormat, FritzboxConfig, FritzboxEnv, ValidatedFritzboxConfig, apply_env_overrides};
use fritzbox_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use std::path::Path;

/// Load the config from an in-memory document.
///
/// Precedence (highest wins):
/// - env overrides (`FritzboxEnv`)
/// - config document
/// - defaults (`FritzboxConfig::default()`)
pub fn load_config_from_str(
    input: Option<(&str, ConfigFormat)>,
    env: &FritzboxEnv,
) -> Result<ValidatedFritzboxConfig, ErrorEnvelope> {
    let config = match input {
        None => FritzboxConfig::default(),
        Some((text, format)) => parse_config_unvalidated(text, format)?,
    };

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

/// Load the config from an optional file path.
pub fn load_config_from_path(
    config_path: Option<&Path>,
    env: &FritzboxEnv,
) -> Result<ValidatedFritzboxConfig, ErrorEnvelope> {
    let config = match config_path {
        None => FritzboxConfig::default(),
        Some(path) => {
            let format = detect_config_format(path)?;
            let config_text = read_config_file(path)?;
            tracing::debug!(path = %path.display(), ?format, "loading config file");
            parse_config_unvalidated(&config_text, format)
                .map_err(|error| error.with_metadata("path", path.to_string_lossy()))?
        },
    };

    apply_env_overrides(config, env)
}

/// Load the config from std env and an optional file path.
pub fn load_config_std_env(
    config_path: Option<&Path>,
) -> Result<ValidatedFritzboxConfig, ErrorEnvelope> {
    let env = FritzboxEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_config_from_path(config_path, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &FritzboxConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_json"),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &FritzboxConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    if !output.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<FritzboxConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            format!("unsupported config file extension: .{other}"),
        )
        .with_metadata("path", path.to_string_lossy().to_string())),
    }
}
