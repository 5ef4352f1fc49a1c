//! Gather and watch command handlers.
//!
//! Metric records stream to stdout through the configured sink; summaries
//! and errors go to stderr.

use crate::error::{CliError, ExitCode, infra_exit_code};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, log_info};
use fritzbox_config::{OutputFormat as RecordFormat, ValidatedFritzboxConfig};
use fritzbox_infra::{
    GatherReport, Observability, PollSummary, build_sink, check_config, run_gather_once,
    run_watch,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Inputs shared by the gather and watch commands.
pub struct PollCommandInput<'a> {
    /// `FRITZBOX_*` variables.
    pub env: &'a BTreeMap<String, String>,
    /// Optional config file.
    pub config: Option<&'a Path>,
    /// Record encoding override.
    pub record_format: Option<RecordFormat>,
    /// Logger and telemetry for the poll.
    pub observability: Observability,
}

impl PollCommandInput<'_> {
    fn load(&self) -> Result<(ValidatedFritzboxConfig, RecordFormat), fritzbox_infra::InfraError> {
        let config = check_config(self.env, self.config)?;
        let format = self.record_format.unwrap_or(config.output.format);
        Ok((config, format))
    }
}

/// Run one poll.
pub fn run_gather(mode: OutputMode, input: &PollCommandInput<'_>) -> Result<CliOutput, CliError> {
    let (config, format) = match input.load() {
        Ok(loaded) => loaded,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };

    match run_gather_once(&config, build_sink(format, std::io::stdout()), &input.observability) {
        Ok(report) => Ok(CliOutput {
            stdout: String::new(),
            stderr: format_summary(mode, "gather completed", &report, &gather_text(&report))?,
            exit_code: ExitCode::Ok,
        }),
        Err(error) => Ok(format_error_output(mode, &error, infra_exit_code(&error))),
    }
}

/// Poll until interrupted, or `count` times.
pub fn run_watch_command(
    mode: OutputMode,
    input: &PollCommandInput<'_>,
    count: Option<u64>,
) -> Result<CliOutput, CliError> {
    let (config, format) = match input.load() {
        Ok(loaded) => loaded,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };

    let sink = build_sink(format, std::io::stdout());
    match run_watch(&config, sink, &input.observability, count) {
        Ok(summary) => Ok(CliOutput {
            stdout: String::new(),
            stderr: format_summary(mode, "watch stopped", &summary, &watch_text(&summary))?,
            exit_code: ExitCode::Ok,
        }),
        Err(error) => Ok(format_error_output(mode, &error, infra_exit_code(&error))),
    }
}

fn gather_text(report: &GatherReport) -> String {
    format!(
        "records={} fields={} calls={} cacheHits={} skipped={} durationMs={}",
        report.records_emitted,
        report.fields_collected,
        report.calls_issued,
        report.cache_hits,
        report.skipped,
        report.duration_ms
    )
}

fn watch_text(summary: &PollSummary) -> String {
    format!(
        "polls={} succeeded={} catalogFailures={} records={}",
        summary.polls, summary.succeeded, summary.catalog_failures, summary.records_emitted
    )
}

fn format_summary<T: Serialize>(
    mode: OutputMode,
    message: &str,
    payload: &T,
    text: &str,
) -> Result<String, CliError> {
    if mode.is_json() || mode.is_ndjson() {
        let line = serde_json::json!({
            "type": "summary",
            "status": "ok",
            "message": message,
            "summary": payload,
        });
        let mut out = serde_json::to_string(&line)?;
        out.push('\n');
        return Ok(out);
    }
    let mut stderr = String::new();
    log_info(&mut stderr, &format!("{message}: {text}"), mode.no_progress);
    Ok(stderr)
}
