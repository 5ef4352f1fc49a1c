//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::{
    PollCommandInput, run_config_check, run_config_sample, run_config_show, run_gather, run_info,
    run_metrics, run_watch_command,
};
use error::{CliError, ExitCode};
use format::{LogFormatArg, OutputArgs, OutputMode, RecordFormatArg};
use fritzbox_infra::{InfraError, LogFormat, Observability};
use fritzbox_shared::redact_if_secret;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "fritzbox-collector",
    version,
    about = "Collect WAN and WLAN metrics from a FRITZ!Box",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show version and collector defaults.
    Info,
    /// Print the metric definition table.
    Metrics,
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Run one poll and write the records to stdout.
    Gather {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Record encoding (overrides `output.format`).
        #[arg(long, value_enum)]
        format: Option<RecordFormatArg>,
    },
    /// Poll on the configured interval until interrupted.
    Watch {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Record encoding (overrides `output.format`).
        #[arg(long, value_enum)]
        format: Option<RecordFormatArg>,
        /// Stop after this many polls.
        #[arg(long)]
        count: Option<u64>,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Validate config loading, merging, and normalization.
    Check {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the effective config after applying env overrides.
    Show {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Render as TOML instead of JSON (text output only).
        #[arg(long)]
        toml: bool,
    },
    /// Print an annotated sample config.
    Sample,
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);
    init_tracing(&cli.output);

    match run(&cli, mode) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn init_tracing(args: &OutputArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_log_level().as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    // A subscriber may already be installed; keep it.
    let _ = match args.log_format {
        LogFormatArg::Text => builder.try_init(),
        LogFormatArg::Json => builder.json().try_init(),
    };
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(cli: &Cli, mode: OutputMode) -> Result<CliOutput, CliError> {
    let env = collect_scoped_env("FRITZBOX_");
    tracing::debug!(command = ?cli.command, "running command");
    match &cli.command {
        Commands::Info => run_info(mode),
        Commands::Metrics => run_metrics(mode),
        Commands::Config { command } => match command {
            ConfigCommands::Check { path } => run_config_check(mode, &env, path.as_deref()),
            ConfigCommands::Show { path, toml } => {
                run_config_show(mode, &env, path.as_deref(), *toml)
            },
            ConfigCommands::Sample => run_config_sample(mode),
        },
        Commands::Gather { config, format } => {
            let input = poll_input(&cli.output, &env, config.as_deref(), *format);
            run_gather(mode, &input)
        },
        Commands::Watch {
            config,
            format,
            count,
        } => {
            let input = poll_input(&cli.output, &env, config.as_deref(), *format);
            run_watch_command(mode, &input, *count)
        },
    }
}

fn poll_input<'a>(
    args: &OutputArgs,
    env: &'a BTreeMap<String, String>,
    config: Option<&'a Path>,
    format: Option<RecordFormatArg>,
) -> PollCommandInput<'a> {
    let log_format: LogFormat = args.log_format.as_log_format();
    PollCommandInput {
        env,
        config,
        record_format: format.map(RecordFormatArg::as_record_format),
        observability: Observability::for_format(log_format, args.log_level.as_log_level()),
    }
}

/// Render an infra error on stderr; stdout stays reserved for records.
pub(crate) fn format_error_output(
    mode: OutputMode,
    error: &InfraError,
    exit_code: ExitCode,
) -> CliOutput {
    let metadata: BTreeMap<String, String> = error
        .metadata
        .iter()
        .map(|(key, value)| (key.clone(), redact_if_secret(key, value)))
        .collect();

    let stderr = if mode.is_json() || mode.is_ndjson() {
        let payload = serde_json::json!({
            "type": "error",
            "status": "error",
            "error": {
                "code": error.code.to_string(),
                "message": error.message,
                "kind": format!("{:?}", error.kind).to_ascii_uppercase(),
                "meta": metadata,
            },
        });
        let mut output = serde_json::to_string(&payload).unwrap_or_else(|_| {
            "{\"type\":\"error\",\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\"}}".to_string()
        });
        output.push('\n');
        output
    } else {
        format_error_text(error, &metadata)
    };

    CliOutput {
        stdout: String::new(),
        stderr,
        exit_code,
    }
}

fn format_error_text(error: &InfraError, metadata: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    out.push_str("status: error\n");
    out.push_str("code: ");
    out.push_str(&error.code.to_string());
    out.push('\n');
    out.push_str("message: ");
    out.push_str(&error.message);
    out.push('\n');

    if !metadata.is_empty() {
        out.push_str("meta:\n");
        for (key, value) in metadata {
            out.push_str("  ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }

    out
}

pub(crate) fn log_info(stderr: &mut String, message: &str, no_progress: bool) {
    if no_progress {
        return;
    }
    stderr.push_str("info: ");
    stderr.push_str(message);
    stderr.push('\n');
}

pub(crate) fn format_ndjson_summary(
    status: &str,
    kind: &str,
    extra: Option<serde_json::Value>,
) -> String {
    let mut payload = serde_json::Map::new();
    payload.insert(
        "type".to_string(),
        serde_json::Value::String("summary".to_string()),
    );
    payload.insert(
        "status".to_string(),
        serde_json::Value::String(status.to_string()),
    );
    payload.insert(
        "kind".to_string(),
        serde_json::Value::String(kind.to_string()),
    );
    if let Some(serde_json::Value::Object(map)) = extra {
        for (key, value) in map {
            payload.insert(key, value);
        }
    }
    let mut out = serde_json::to_string(&serde_json::Value::Object(payload)).unwrap_or_else(|_| {
        "{\"type\":\"summary\",\"status\":\"error\",\"kind\":\"internal\"}".to_string()
    });
    out.push('\n');
    out
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;
    stdout.flush()?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}

fn collect_scoped_env(prefix: &str) -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(prefix))
        .collect()
}
