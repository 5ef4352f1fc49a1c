//! Metrics command handler: prints the metric definition table.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use fritzbox_domain::{MetricTable, SIMPLE_MEASUREMENT};
use std::fmt::Write as _;

/// Run the metrics command.
pub fn run_metrics(mode: OutputMode) -> Result<CliOutput, CliError> {
    let table = MetricTable::fritzbox_default();

    let stdout = if mode.is_ndjson() {
        format_metrics_ndjson(&table)?
    } else if mode.is_json() {
        let payload = serde_json::json!({ "status": "ok", "metrics": table });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        format_metrics_text(&table)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn format_metrics_text(table: &MetricTable) -> String {
    let mut out = String::from("status: ok\n");
    let _ = writeln!(out, "measurement: {SIMPLE_MEASUREMENT}");
    for spec in &table.simple {
        let _ = writeln!(
            out,
            "  {} <- {} {}.{}",
            spec.field_name, spec.service, spec.action, spec.result_key
        );
    }
    for spec in &table.complex {
        let _ = writeln!(out, "measurement: {}", spec.measurement_name);
        let _ = writeln!(
            out,
            "  instances: {}:1..={}",
            spec.service_prefix, spec.instance_count
        );
        let _ = writeln!(
            out,
            "  count: {}.{}",
            spec.count_action, spec.count_result_key
        );
        let _ = writeln!(
            out,
            "  element: {}({})",
            spec.per_element_action, spec.element_index_param
        );
        for (tag, key) in &spec.tag_extract {
            let _ = writeln!(out, "  tag {tag} <- {key}");
        }
        for (field, key) in &spec.field_extract {
            let _ = writeln!(out, "  field {field} <- {key}");
        }
    }
    out
}

fn format_metrics_ndjson(table: &MetricTable) -> Result<String, CliError> {
    let mut out = String::new();
    for spec in &table.simple {
        let line = serde_json::json!({ "type": "simple", "metric": spec });
        out.push_str(&serde_json::to_string(&line)?);
        out.push('\n');
    }
    for spec in &table.complex {
        let line = serde_json::json!({ "type": "complex", "metric": spec });
        out.push_str(&serde_json::to_string(&line)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputFormat;

    fn mode(format: OutputFormat) -> OutputMode {
        OutputMode {
            format,
            no_progress: true,
        }
    }

    #[test]
    fn text_lists_every_simple_field() -> Result<(), CliError> {
        let output = run_metrics(mode(OutputFormat::Text))?;
        for field in [
            "packets_received",
            "packets_sent",
            "bytes_received",
            "bytes_sent",
            "link_status",
            "connection_status",
            "uptime",
        ] {
            assert!(output.stdout.contains(field), "missing {field}");
        }
        assert!(output.stdout.contains("measurement: fritzbox-wifi"));
        Ok(())
    }

    #[test]
    fn ndjson_has_one_line_per_definition() -> Result<(), CliError> {
        let output = run_metrics(mode(OutputFormat::Ndjson))?;
        assert_eq!(output.stdout.lines().count(), MetricTable::fritzbox_default().len());
        Ok(())
    }
}
