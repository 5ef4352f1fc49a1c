//! Flat per-poll record built from parameterless actions.

use crate::observe::fields;
use crate::{CallCache, CollectContext, CollectStats};
use fritzbox_domain::{HOST_TAG, MeasurementRecord, SIMPLE_MEASUREMENT, SimpleMetricSpec};

/// Walk `specs` in order and merge every resolved scalar into one record.
///
/// Each definition resolves its service and action, calls through a private
/// [`CallCache`], and copies `result_key` into `field_name`. Failures skip the
/// definition only. The record is returned even when no field was collected.
pub fn collect_simple(
    ctx: &CollectContext<'_>,
    specs: &[SimpleMetricSpec],
    stats: &mut CollectStats,
) -> MeasurementRecord {
    let mut record = MeasurementRecord::new(SIMPLE_MEASUREMENT).with_tag(HOST_TAG, ctx.host);
    let mut cache = CallCache::new();

    for spec in specs {
        let Some(service) = ctx.catalog.service(&spec.service) else {
            ctx.warn(
                "fritzbox.collect.serviceMissing",
                "cannot find defined service",
                fields([("service", spec.service.clone())]),
            );
            stats.skip(ctx);
            continue;
        };
        let Some(action) = service.action(&spec.action) else {
            ctx.warn(
                "fritzbox.collect.actionMissing",
                "cannot find defined action on service",
                fields([
                    ("service", spec.service.clone()),
                    ("action", spec.action.clone()),
                ]),
            );
            stats.skip(ctx);
            continue;
        };

        let fetched = match cache.fetch(&spec.service, &spec.action, || action.call()) {
            Ok(fetched) => fetched,
            Err(error) => {
                stats.call_issued(ctx);
                ctx.error(
                    "fritzbox.collect.callFailed",
                    "unable to call action on service",
                    fields([
                        ("service", spec.service.clone()),
                        ("action", spec.action.clone()),
                        ("error", error.to_string()),
                    ]),
                );
                stats.skip(ctx);
                continue;
            },
        };
        if fetched.cache_hit {
            stats.cache_hit(ctx);
        } else {
            stats.call_issued(ctx);
        }

        let Some(value) = fetched.result.get(&spec.result_key) else {
            ctx.warn(
                "fritzbox.collect.resultMissing",
                "result key not present in action result",
                fields([
                    ("service", spec.service.clone()),
                    ("action", spec.action.clone()),
                    ("resultKey", spec.result_key.clone()),
                ]),
            );
            stats.skip(ctx);
            continue;
        };
        record.set_field(spec.field_name.clone(), value.clone());
    }

    stats.fields_collected += u64::try_from(record.fields.len()).unwrap_or(u64::MAX);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use fritzbox_domain::ScalarValue;
    use fritzbox_ports::LogLevel;
    use fritzbox_testkit::{InMemoryCatalog, RecordingLogger};

    const WAN: &str = "urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1";

    #[test]
    fn copies_result_into_named_field() {
        let catalog = InMemoryCatalog::new().with_result(
            WAN,
            "GetTotalPacketsReceived",
            [("TotalPacketsReceived", ScalarValue::Unsigned(42))],
        );
        let specs = [SimpleMetricSpec::new(
            WAN,
            "GetTotalPacketsReceived",
            "TotalPacketsReceived",
            "packets_received",
        )];
        let mut stats = CollectStats::default();

        let record = collect_simple(&CollectContext::new(&catalog, "fritz.box"), &specs, &mut stats);

        assert_eq!(record.measurement, "fritzbox");
        assert_eq!(record.tags.get("fritzbox").map(String::as_str), Some("fritz.box"));
        assert_eq!(record.fields.len(), 1);
        assert_eq!(
            record.fields.get("packets_received"),
            Some(&ScalarValue::Unsigned(42))
        );
        assert_eq!(stats.calls_issued, 1);
        assert_eq!(stats.fields_collected, 1);
    }

    #[test]
    fn missing_service_is_logged_and_skipped() {
        let catalog = InMemoryCatalog::new();
        let logger = RecordingLogger::default();
        let ctx = CollectContext {
            logger: Some(&logger),
            ..CollectContext::new(&catalog, "fritz.box")
        };
        let specs = [SimpleMetricSpec::new("svc:1", "Get", "Key", "field")];
        let mut stats = CollectStats::default();

        let record = collect_simple(&ctx, &specs, &mut stats);

        assert!(record.is_empty());
        assert_eq!(stats.skipped, 1);
        let events = logger.events();
        assert_eq!(events.len(), 1);
        assert!(events.iter().all(|event| event.level == LogLevel::Warn
            && event.event.as_ref() == "fritzbox.collect.serviceMissing"
            && event.fields.as_ref().and_then(|f| f.get("service"))
                == Some(&serde_json::json!("svc:1"))));
    }

    #[test]
    fn missing_result_key_adds_no_field() {
        let catalog = InMemoryCatalog::new().with_result(
            WAN,
            "GetAddonInfos",
            [("TotalBytesSent", ScalarValue::Unsigned(9))],
        );
        let specs = [
            SimpleMetricSpec::new(WAN, "GetAddonInfos", "TotalBytesReceived", "bytes_received"),
            SimpleMetricSpec::new(WAN, "GetAddonInfos", "TotalBytesSent", "bytes_sent"),
        ];
        let logger = RecordingLogger::default();
        let ctx = CollectContext {
            logger: Some(&logger),
            ..CollectContext::new(&catalog, "fritz.box")
        };
        let mut stats = CollectStats::default();

        let record = collect_simple(&ctx, &specs, &mut stats);

        assert_eq!(record.fields.len(), 1);
        assert!(record.fields.contains_key("bytes_sent"));
        assert_eq!(stats.calls_issued, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.skipped, 1);
        let missing = logger.events_named("fritzbox.collect.resultMissing");
        assert_eq!(missing.len(), 1);
        assert!(missing.iter().all(|event| event.level == LogLevel::Warn
            && event.fields.as_ref().and_then(|f| f.get("resultKey"))
                == Some(&serde_json::json!("TotalBytesReceived"))));
    }

    #[test]
    fn later_field_name_wins() {
        let catalog = InMemoryCatalog::new()
            .with_result(WAN, "A", [("Key", ScalarValue::Unsigned(1))])
            .with_result(WAN, "B", [("Key", ScalarValue::Unsigned(2))]);
        let specs = [
            SimpleMetricSpec::new(WAN, "A", "Key", "value"),
            SimpleMetricSpec::new(WAN, "B", "Key", "value"),
        ];
        let mut stats = CollectStats::default();

        let record = collect_simple(&CollectContext::new(&catalog, "h"), &specs, &mut stats);

        assert_eq!(record.fields.get("value"), Some(&ScalarValue::Unsigned(2)));
    }
}
