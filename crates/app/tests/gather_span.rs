//! The gather span carries the resolved device target.

use fritzbox_app::{GatherDeps, GatherInput, gather};
use fritzbox_domain::MetricTable;
use fritzbox_shared::Result;
use fritzbox_testkit::{InMemoryCatalog, InMemoryCatalogLoader, RecordingSink};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

#[derive(Clone, Default)]
struct SpanFields(Arc<Mutex<BTreeMap<String, String>>>);

impl SpanFields {
    fn get(&self, name: &str) -> Option<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn insert(&self, field: &Field, value: String) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(field.name().to_string(), value);
    }
}

impl Visit for SpanFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{value:?}"));
    }
}

impl<S: Subscriber> Layer<S> for SpanFields {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        if attrs.metadata().name() == "fritzbox.gather" {
            attrs.record(&mut self.clone());
        }
    }

    fn on_record(&self, _id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        values.record(&mut self.clone());
    }
}

fn deps() -> GatherDeps {
    GatherDeps {
        catalog_loader: Arc::new(InMemoryCatalogLoader::new(InMemoryCatalog::new())),
        sink: Arc::new(RecordingSink::new()),
        table: Arc::new(MetricTable::fritzbox_default()),
        logger: None,
        telemetry: None,
    }
}

fn gather_in_span(input: &GatherInput) -> Result<SpanFields> {
    let fields = SpanFields::default();
    let subscriber = Registry::default().with(fields.clone());
    tracing::subscriber::with_default(subscriber, || gather(&deps(), input))?;
    Ok(fields)
}

#[test]
fn span_records_defaulted_target() -> Result<()> {
    let fields = gather_in_span(&GatherInput::default())?;

    assert_eq!(fields.get("host").as_deref(), Some("fritz.box"));
    assert_eq!(fields.get("port").as_deref(), Some("49000"));
    Ok(())
}

#[test]
fn span_records_trimmed_host() -> Result<()> {
    let input = GatherInput {
        host: "  192.168.178.1 ".to_string(),
        port: 49443,
        ..GatherInput::default()
    };

    let fields = gather_in_span(&input)?;

    assert_eq!(fields.get("host").as_deref(), Some("192.168.178.1"));
    assert_eq!(fields.get("port").as_deref(), Some("49443"));
    Ok(())
}
