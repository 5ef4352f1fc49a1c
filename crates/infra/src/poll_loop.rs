//! One-shot gather and the periodic poll loop.

use crate::{InfraError, InfraResult, Observability, build_gather_deps, gather_input_from_config};
use fritzbox_app::{CATALOG_UNAVAILABLE, GatherDeps, GatherInput, GatherReport, gather};
use fritzbox_config::ValidatedFritzboxConfig;
use fritzbox_ports::{LogFields, MetricSinkPort};
use fritzbox_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Backoff before reloading the catalog after a failed load.
pub const SERVICE_LOAD_RETRY: Duration = Duration::from_secs(60);

/// Timing of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Wait after a completed poll.
    pub interval: Duration,
    /// Wait after a catalog load failure.
    pub catalog_retry: Duration,
    /// Stop after this many polls.
    pub max_polls: Option<u64>,
}

impl PollSchedule {
    /// Schedule with the default catalog backoff and no poll limit.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            catalog_retry: SERVICE_LOAD_RETRY,
            max_polls: None,
        }
    }

    /// Override the catalog backoff.
    #[must_use]
    pub const fn with_catalog_retry(mut self, catalog_retry: Duration) -> Self {
        self.catalog_retry = catalog_retry;
        self
    }

    /// Stop after `max_polls` polls.
    #[must_use]
    pub const fn with_max_polls(mut self, max_polls: u64) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    /// Schedule from `poll.intervalSecs` and `poll.catalogRetrySecs`.
    #[must_use]
    pub fn from_config(config: &ValidatedFritzboxConfig) -> Self {
        let poll = &config.poll;
        Self::new(Duration::from_secs(poll.interval_secs))
            .with_catalog_retry(Duration::from_secs(poll.catalog_retry_secs))
    }
}

/// Totals across the polls of one loop run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    /// Polls started.
    pub polls: u64,
    /// Polls that returned a report.
    pub succeeded: u64,
    /// Polls that failed to load the catalog.
    pub catalog_failures: u64,
    /// Records emitted across successful polls.
    pub records_emitted: u64,
}

/// Build the adapters from `config` and run a single poll.
pub fn run_gather_once(
    config: &ValidatedFritzboxConfig,
    sink: Arc<dyn MetricSinkPort>,
    observability: &Observability,
) -> InfraResult<GatherReport> {
    let deps = build_gather_deps(config, sink, observability)?;
    gather(&deps, &gather_input_from_config(config))
}

/// Poll until `cancel` fires or the schedule's poll limit is reached.
///
/// Each poll runs on the blocking pool. A catalog failure waits
/// `catalog_retry` before the next attempt; any other poll error ends the
/// loop and is returned.
pub async fn run_poll_loop(
    deps: GatherDeps,
    input: GatherInput,
    schedule: PollSchedule,
    cancel: CancellationToken,
) -> InfraResult<PollSummary> {
    let mut summary = PollSummary::default();

    while !cancel.is_cancelled() {
        let poll_deps = deps.clone();
        let poll_input = input.clone();
        let outcome = tokio::task::spawn_blocking(move || gather(&poll_deps, &poll_input))
            .await
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::internal(),
                    format!("poll task failed: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;
        summary.polls += 1;

        let wait = match outcome {
            Ok(report) => {
                summary.succeeded += 1;
                summary.records_emitted += report.records_emitted;
                schedule.interval
            },
            Err(error) if is_catalog_unavailable(&error) => {
                summary.catalog_failures += 1;
                log_retry(&deps, &error, schedule.catalog_retry);
                schedule.catalog_retry
            },
            Err(error) => return Err(error),
        };

        if schedule.max_polls.is_some_and(|max| summary.polls >= max) {
            break;
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(wait) => {},
        }
    }

    if let Some(logger) = deps.logger.as_ref() {
        logger.info(
            "fritzbox.poll.stopped",
            "Poll loop stopped",
            Some(summary_fields(&summary)),
        );
    }
    Ok(summary)
}

/// Run the poll loop for `config` on a current-thread runtime.
///
/// Stops on ctrl-c, or after `max_polls` polls when set.
pub fn run_watch(
    config: &ValidatedFritzboxConfig,
    sink: Arc<dyn MetricSinkPort>,
    observability: &Observability,
    max_polls: Option<u64>,
) -> InfraResult<PollSummary> {
    let deps = build_gather_deps(config, sink, observability)?;
    let input = gather_input_from_config(config);
    let mut schedule = PollSchedule::from_config(config);
    if let Some(max_polls) = max_polls {
        schedule = schedule.with_max_polls(max_polls);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(InfraError::from)?;
    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping poll loop");
                on_signal.cancel();
            }
        });
        let result = run_poll_loop(deps, input, schedule, cancel).await;
        signal.abort();
        result
    })
}

fn is_catalog_unavailable(error: &InfraError) -> bool {
    error.code.is("gather", CATALOG_UNAVAILABLE)
}

fn log_retry(deps: &GatherDeps, error: &InfraError, wait: Duration) {
    let Some(logger) = deps.logger.as_ref() else {
        return;
    };
    let mut fields = LogFields::new();
    fields.insert(
        "waitMs".into(),
        Value::from(u64::try_from(wait.as_millis()).unwrap_or(u64::MAX)),
    );
    fields.insert("errorCode".into(), Value::String(error.code.to_string()));
    logger.warn(
        "fritzbox.poll.retryScheduled",
        "Catalog unavailable, retrying later",
        Some(fields),
    );
}

fn summary_fields(summary: &PollSummary) -> LogFields {
    let mut fields = LogFields::new();
    if let Ok(Value::Object(map)) = serde_json::to_value(summary) {
        fields.extend(map.into_iter().map(|(key, value)| (key.into_boxed_str(), value)));
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use fritzbox_config::{FritzboxConfig, FritzboxEnv, apply_env_overrides};

    #[test]
    fn schedule_reads_poll_settings() -> InfraResult<()> {
        let mut config = FritzboxConfig::default();
        config.poll.interval_secs = 15;
        config.poll.catalog_retry_secs = 90;
        let config = apply_env_overrides(config, &FritzboxEnv::default())?;

        let schedule = PollSchedule::from_config(&config);
        assert_eq!(schedule.interval, Duration::from_secs(15));
        assert_eq!(schedule.catalog_retry, Duration::from_secs(90));
        assert_eq!(schedule.max_polls, None);
        Ok(())
    }

    #[test]
    fn default_catalog_backoff_is_one_minute() {
        let schedule = PollSchedule::new(Duration::from_secs(10));
        assert_eq!(schedule.catalog_retry, SERVICE_LOAD_RETRY);
        assert_eq!(SERVICE_LOAD_RETRY, Duration::from_secs(60));
    }

    #[test]
    fn only_gather_catalog_errors_are_retried() {
        let retried = ErrorEnvelope::expected(ErrorCode::new("gather", CATALOG_UNAVAILABLE), "x");
        let fatal = ErrorEnvelope::expected(ErrorCode::io(), "x");
        assert!(is_catalog_unavailable(&retried));
        assert!(!is_catalog_unavailable(&fatal));
    }
}
