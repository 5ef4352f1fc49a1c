//! Poll loop scheduling, retry and shutdown.

use fritzbox_app::{GatherDeps, GatherInput};
use fritzbox_domain::{MetricTable, ScalarValue, SimpleMetricSpec};
use fritzbox_infra::{PollSchedule, run_poll_loop};
use fritzbox_ports::LoggerPort;
use fritzbox_shared::ErrorCode;
use fritzbox_testkit::{InMemoryCatalog, InMemoryCatalogLoader, RecordingLogger, RecordingSink};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const WAN: &str = "urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1";
const GUARD: Duration = Duration::from_secs(10);

fn table() -> MetricTable {
    MetricTable {
        simple: vec![SimpleMetricSpec::new(
            WAN,
            "GetTotalPacketsReceived",
            "TotalPacketsReceived",
            "packets_received",
        )],
        complex: Vec::new(),
    }
}

fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new().with_result(
        WAN,
        "GetTotalPacketsReceived",
        [("TotalPacketsReceived", ScalarValue::Unsigned(7))],
    )
}

fn deps(
    loader: Arc<InMemoryCatalogLoader>,
    sink: Arc<RecordingSink>,
    logger: Option<Arc<RecordingLogger>>,
) -> GatherDeps {
    GatherDeps {
        catalog_loader: loader,
        sink,
        table: Arc::new(table()),
        logger: logger.map(|logger| logger as Arc<dyn LoggerPort>),
        telemetry: None,
    }
}

#[tokio::test]
async fn polls_until_the_limit_is_reached() -> Result<(), Box<dyn std::error::Error>> {
    let loader = Arc::new(InMemoryCatalogLoader::new(catalog()));
    let sink = Arc::new(RecordingSink::new());
    let schedule = PollSchedule::new(Duration::from_millis(1)).with_max_polls(3);

    let summary = tokio::time::timeout(
        GUARD,
        run_poll_loop(
            deps(loader.clone(), sink.clone(), None),
            GatherInput::default(),
            schedule,
            CancellationToken::new(),
        ),
    )
    .await??;

    assert_eq!(summary.polls, 3);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.records_emitted, 3);
    assert_eq!(loader.loads(), 3);
    assert_eq!(sink.records().len(), 3);
    Ok(())
}

#[tokio::test]
async fn catalog_failures_wait_the_retry_backoff() -> Result<(), Box<dyn std::error::Error>> {
    let loader = Arc::new(InMemoryCatalogLoader::new(catalog()).with_failures(2, "no route"));
    let sink = Arc::new(RecordingSink::new());
    let logger = Arc::new(RecordingLogger::default());
    // The regular interval would outlast the guard; only the retry backoff is short.
    let schedule = PollSchedule::new(Duration::from_secs(3600))
        .with_catalog_retry(Duration::from_millis(1))
        .with_max_polls(3);

    let summary = tokio::time::timeout(
        GUARD,
        run_poll_loop(
            deps(loader.clone(), sink.clone(), Some(logger.clone())),
            GatherInput::default(),
            schedule,
            CancellationToken::new(),
        ),
    )
    .await??;

    assert_eq!(summary.polls, 3);
    assert_eq!(summary.catalog_failures, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(sink.records().len(), 1);
    assert_eq!(logger.events_named("fritzbox.poll.retryScheduled").len(), 2);
    assert_eq!(logger.events_named("fritzbox.poll.stopped").len(), 1);
    Ok(())
}

#[tokio::test]
async fn cancellation_interrupts_the_wait() -> Result<(), Box<dyn std::error::Error>> {
    let loader = Arc::new(InMemoryCatalogLoader::new(catalog()));
    let sink = Arc::new(RecordingSink::new());
    let cancel = CancellationToken::new();
    let schedule = PollSchedule::new(Duration::from_secs(3600));

    let handle = tokio::spawn(run_poll_loop(
        deps(loader.clone(), sink, None),
        GatherInput::default(),
        schedule,
        cancel.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let summary = tokio::time::timeout(GUARD, handle).await???;
    assert_eq!(summary.polls, 1);
    assert_eq!(loader.loads(), 1);
    Ok(())
}

#[tokio::test]
async fn cancelled_token_runs_no_poll() -> Result<(), Box<dyn std::error::Error>> {
    let loader = Arc::new(InMemoryCatalogLoader::new(catalog()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = run_poll_loop(
        deps(loader.clone(), Arc::new(RecordingSink::new()), None),
        GatherInput::default(),
        PollSchedule::new(Duration::from_millis(1)),
        cancel,
    )
    .await?;

    assert_eq!(summary.polls, 0);
    assert_eq!(loader.loads(), 0);
    Ok(())
}

#[tokio::test]
async fn sink_failure_ends_the_loop() {
    let loader = Arc::new(InMemoryCatalogLoader::new(catalog()));
    let schedule = PollSchedule::new(Duration::from_millis(1)).with_max_polls(5);

    let result = run_poll_loop(
        deps(loader.clone(), Arc::new(RecordingSink::failing_after(0)), None),
        GatherInput::default(),
        schedule,
        CancellationToken::new(),
    )
    .await;

    assert!(result.is_err_and(|error| error.code == ErrorCode::io()));
    assert_eq!(loader.loads(), 1);
}
