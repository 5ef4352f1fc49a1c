//! Config command handlers.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, format_ndjson_summary, log_info};
use fritzbox_config::sample_config;
use fritzbox_infra::{load_effective_config_json, load_effective_config_toml};
use std::collections::BTreeMap;
use std::path::Path;

/// Validate config loading, merging and normalization.
pub fn run_config_check(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    path: Option<&Path>,
) -> Result<CliOutput, CliError> {
    let config_json = match load_effective_config_json(env, path) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "config check completed", mode.no_progress);

    let stdout = if mode.is_ndjson() {
        format_ndjson_summary("ok", "config", None)
    } else if mode.is_json() {
        let config_value: serde_json::Value = serde_json::from_str(config_json.trim())?;
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "effectiveConfig": config_value,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        path.map_or_else(
            || "status: ok\nconfig: ok\n".to_string(),
            |path| format!("status: ok\nconfig: ok\npath: {}\n", path.to_string_lossy()),
        )
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

/// Print the effective config (password redacted).
pub fn run_config_show(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    path: Option<&Path>,
    as_toml: bool,
) -> Result<CliOutput, CliError> {
    let rendered = if as_toml && !mode.is_json() && !mode.is_ndjson() {
        load_effective_config_toml(env, path)
    } else {
        load_effective_config_json(env, path)
    };
    let config_text = match rendered {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "config show completed", mode.no_progress);

    let stdout = if mode.is_ndjson() {
        let config_value: serde_json::Value = serde_json::from_str(config_text.trim())?;
        format_ndjson_summary(
            "ok",
            "config",
            Some(serde_json::json!({ "effectiveConfig": config_value })),
        )
    } else if mode.is_json() {
        let config_value: serde_json::Value = serde_json::from_str(config_text.trim())?;
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "effectiveConfig": config_value,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        config_text
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

/// Print the annotated sample config.
pub fn run_config_sample(mode: OutputMode) -> Result<CliOutput, CliError> {
    let sample = sample_config();
    let stdout = if mode.is_json() || mode.is_ndjson() {
        let payload = serde_json::json!({ "status": "ok", "sample": sample });
        let mut output = serde_json::to_string(&payload)?;
        output.push('\n');
        output
    } else {
        sample.to_string()
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}
