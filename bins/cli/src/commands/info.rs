//! Info command handler.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use fritzbox_config::fritzbox_input_description;
use fritzbox_domain::{DEFAULT_HOST, DEFAULT_PORT};
use fritzbox_infra::{SERVICE_LOAD_RETRY, infra_crate_version};

struct InfoView {
    name: &'static str,
    version: &'static str,
    description: &'static str,
    infra_version: &'static str,
    default_host: &'static str,
    default_port: u16,
    catalog_retry_secs: u64,
}

fn info_view() -> InfoView {
    InfoView {
        name: "fritzbox-collector",
        version: env!("CARGO_PKG_VERSION"),
        description: fritzbox_input_description(),
        infra_version: infra_crate_version(),
        default_host: DEFAULT_HOST,
        default_port: DEFAULT_PORT,
        catalog_retry_secs: SERVICE_LOAD_RETRY.as_secs(),
    }
}

/// Run the info command.
pub fn run_info(mode: OutputMode) -> Result<CliOutput, CliError> {
    let info = info_view();

    let stdout = if mode.is_ndjson() {
        format_info_ndjson(&info)?
    } else if mode.is_json() {
        format_info_json(&info)?
    } else {
        format_info_text(&info)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn format_info_text(info: &InfoView) -> String {
    format!(
        "status: ok\nname: {}\nversion: {}\ndescription: {}\ninfra: {}\ndefaultHost: {}\ndefaultPort: {}\ncatalogRetrySecs: {}\n",
        info.name,
        info.version,
        info.description,
        info.infra_version,
        info.default_host,
        info.default_port,
        info.catalog_retry_secs,
    )
}

fn info_payload(info: &InfoView) -> serde_json::Value {
    serde_json::json!({
        "name": info.name,
        "version": info.version,
        "description": info.description,
        "infraVersion": info.infra_version,
        "defaults": {
            "host": info.default_host,
            "port": info.default_port,
            "catalogRetrySecs": info.catalog_retry_secs,
        }
    })
}

fn format_info_json(info: &InfoView) -> Result<String, CliError> {
    let payload = serde_json::json!({
        "status": "ok",
        "build": info_payload(info),
    });
    let mut output = serde_json::to_string_pretty(&payload)?;
    output.push('\n');
    Ok(output)
}

fn format_info_ndjson(info: &InfoView) -> Result<String, CliError> {
    let payload = serde_json::json!({
        "type": "summary",
        "status": "ok",
        "kind": "info",
        "build": info_payload(info),
    });
    let mut output = serde_json::to_string(&payload)?;
    output.push('\n');
    Ok(output)
}
