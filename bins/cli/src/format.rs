//! Output format helpers for CLI commands.

use clap::{Args, ValueEnum};
use fritzbox_config::OutputFormat as RecordFormat;
use fritzbox_infra::LogFormat;
use fritzbox_ports::LogLevel;

/// Output format choices for command responses (not metric records).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-friendly text output.
    Text,
    /// Machine-friendly JSON output.
    Json,
    /// Line-delimited JSON (NDJSON) output.
    Ndjson,
}

/// Diagnostic verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    /// Everything, including per-call details.
    Debug,
    /// Poll start and completion.
    Info,
    /// Skipped metrics and retries.
    #[default]
    Warn,
    /// Failures only.
    Error,
}

impl LevelArg {
    pub const fn as_log_level(self) -> LogLevel {
        match self {
            Self::Debug => LogLevel::Debug,
            Self::Info => LogLevel::Info,
            Self::Warn => LogLevel::Warn,
            Self::Error => LogLevel::Error,
        }
    }
}

/// Diagnostic line encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormatArg {
    pub const fn as_log_format(self) -> LogFormat {
        match self {
            Self::Text => LogFormat::Text,
            Self::Json => LogFormat::Json,
        }
    }
}

/// Encoding of metric records on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordFormatArg {
    /// Influx line protocol.
    LineProtocol,
    /// One JSON object per record.
    Ndjson,
}

impl RecordFormatArg {
    pub const fn as_record_format(self) -> RecordFormat {
        match self {
            Self::LineProtocol => RecordFormat::LineProtocol,
            Self::Ndjson => RecordFormat::Ndjson,
        }
    }
}

/// Output-related CLI flags.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output format for command responses.
    #[arg(long, global = true, value_enum)]
    pub output: Option<OutputFormat>,
    /// Suppress progress lines on stderr.
    #[arg(long, global = true)]
    pub no_progress: bool,
    /// Minimum diagnostic level (`RUST_LOG` takes precedence).
    #[arg(long, global = true, value_enum, default_value_t = LevelArg::Warn)]
    pub log_level: LevelArg,
    /// Diagnostic encoding on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

/// Output mode derived from CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct OutputMode {
    pub format: OutputFormat,
    pub no_progress: bool,
}

impl OutputMode {
    /// Build output mode from CLI flags.
    #[must_use]
    pub fn from_args(args: &OutputArgs) -> Self {
        Self {
            format: args.output.unwrap_or(OutputFormat::Text),
            no_progress: args.no_progress,
        }
    }

    /// Returns true when JSON output is requested.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Returns true when NDJSON output is requested.
    #[must_use]
    pub const fn is_ndjson(self) -> bool {
        matches!(self.format, OutputFormat::Ndjson)
    }
}
