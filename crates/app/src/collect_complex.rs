//! Multi-instance, multi-record collection.
//!
//! For every definition and every instance `prefix:1 ..= prefix:n`, one count
//! call determines how many elements the instance holds; one indexed call per
//! element then yields one record. A failure skips the smallest enclosing
//! unit: a missing service or a failed count skips the instance, a failed
//! element call skips that element. An instance with no elements is not a
//! failure, and a reported count above [`MAX_ELEMENTS_PER_INSTANCE`] is capped.

use crate::observe::fields;
use crate::{CallCache, CollectContext, CollectStats};
use fritzbox_domain::{
    ComplexMetricSpec, HOST_TAG, MeasurementRecord, SERVICE_TAG, ScalarValue, ServiceInstanceId,
};
use fritzbox_ports::{ActionResult, ServiceHandle};
use fritzbox_shared::Result;

/// Upper bound on per-element calls for one service instance.
pub const MAX_ELEMENTS_PER_INSTANCE: u64 = 256;

/// Collect every complex definition, handing each record to `emit` as soon as
/// it is built.
///
/// Only `emit` failures abort the walk; everything else is logged and skipped.
pub fn collect_complex(
    ctx: &CollectContext<'_>,
    specs: &[ComplexMetricSpec],
    stats: &mut CollectStats,
    emit: &mut dyn FnMut(MeasurementRecord) -> Result<()>,
) -> Result<()> {
    let mut cache = CallCache::new();

    for spec in specs {
        let instances = match spec.instance_ids() {
            Ok(instances) => instances,
            Err(error) => {
                ctx.error(
                    "fritzbox.collect.invalidDefinition",
                    "complex metric definition is invalid",
                    fields([
                        ("measurement", spec.measurement_name.clone()),
                        ("error", error.to_string()),
                    ]),
                );
                stats.skip(ctx);
                continue;
            },
        };

        for instance in &instances {
            collect_instance(ctx, spec, instance, &mut cache, stats, emit)?;
        }
    }

    Ok(())
}

fn collect_instance(
    ctx: &CollectContext<'_>,
    spec: &ComplexMetricSpec,
    instance: &ServiceInstanceId,
    cache: &mut CallCache,
    stats: &mut CollectStats,
    emit: &mut dyn FnMut(MeasurementRecord) -> Result<()>,
) -> Result<()> {
    let service_id = instance.to_string();
    let Some(service) = ctx.catalog.service(&service_id) else {
        ctx.warn(
            "fritzbox.collect.serviceMissing",
            "cannot find defined service",
            fields([("service", service_id)]),
        );
        stats.skip(ctx);
        return Ok(());
    };

    let Some(count) = element_count(ctx, spec, service, &service_id, cache, stats) else {
        return Ok(());
    };
    if count == 0 {
        ctx.debug(
            "fritzbox.collect.noElements",
            "service instance reports no elements",
            fields([("service", service_id)]),
        );
        return Ok(());
    }
    let count = if count > MAX_ELEMENTS_PER_INSTANCE {
        ctx.warn(
            "fritzbox.collect.countCapped",
            "element count exceeds limit; collecting the first elements only",
            fields([
                ("service", service_id.clone()),
                ("count", count.to_string()),
                ("limit", MAX_ELEMENTS_PER_INSTANCE.to_string()),
            ]),
        );
        MAX_ELEMENTS_PER_INSTANCE
    } else {
        count
    };

    let Some(element_action) = service.action(&spec.per_element_action) else {
        ctx.warn(
            "fritzbox.collect.actionMissing",
            "cannot find per-element action on service",
            fields([
                ("service", service_id),
                ("action", spec.per_element_action.clone()),
            ]),
        );
        stats.skip(ctx);
        return Ok(());
    };

    for index in 0..count {
        stats.call_issued(ctx);
        let result = match element_action
            .call_with_param(&spec.element_index_param, &ScalarValue::Unsigned(index))
        {
            Ok(result) => result,
            Err(error) => {
                ctx.error(
                    "fritzbox.collect.elementFailed",
                    "unable to call per-element action on service",
                    fields([
                        ("service", service_id.clone()),
                        ("action", spec.per_element_action.clone()),
                        ("index", index.to_string()),
                        ("error", error.to_string()),
                    ]),
                );
                stats.skip(ctx);
                continue;
            },
        };

        let record = element_record(ctx, spec, instance, &result);
        stats.fields_collected += u64::try_from(record.fields.len()).unwrap_or(u64::MAX);
        stats.records_emitted += 1;
        emit(record)?;
    }

    Ok(())
}

/// Call the count action and read an unsigned count, or log why not.
fn element_count(
    ctx: &CollectContext<'_>,
    spec: &ComplexMetricSpec,
    service: &dyn ServiceHandle,
    service_id: &str,
    cache: &mut CallCache,
    stats: &mut CollectStats,
) -> Option<u64> {
    let Some(action) = service.action(&spec.count_action) else {
        ctx.warn(
            "fritzbox.collect.actionMissing",
            "cannot find defined action on service",
            fields([
                ("service", service_id.to_string()),
                ("action", spec.count_action.clone()),
            ]),
        );
        stats.skip(ctx);
        return None;
    };

    let fetched = match cache.fetch(service_id, &spec.count_action, || action.call()) {
        Ok(fetched) => fetched,
        Err(error) => {
            stats.call_issued(ctx);
            ctx.error(
                "fritzbox.collect.callFailed",
                "unable to call action on service",
                fields([
                    ("service", service_id.to_string()),
                    ("action", spec.count_action.clone()),
                    ("error", error.to_string()),
                ]),
            );
            stats.skip(ctx);
            return None;
        },
    };
    if fetched.cache_hit {
        stats.cache_hit(ctx);
    } else {
        stats.call_issued(ctx);
    }

    let Some(value) = fetched.result.get(&spec.count_result_key) else {
        ctx.warn(
            "fritzbox.collect.resultMissing",
            "count result key not present in action result",
            fields([
                ("service", service_id.to_string()),
                ("action", spec.count_action.clone()),
                ("resultKey", spec.count_result_key.clone()),
            ]),
        );
        stats.skip(ctx);
        return None;
    };

    let count = value.as_unsigned();
    if count.is_none() {
        ctx.warn(
            "fritzbox.collect.unrecognizedType",
            "unrecognized type for element count",
            fields([
                ("service", service_id.to_string()),
                ("resultKey", spec.count_result_key.clone()),
                ("type", value.type_name().to_string()),
                ("value", value.to_string()),
            ]),
        );
        stats.skip(ctx);
    }
    count
}

fn element_record(
    ctx: &CollectContext<'_>,
    spec: &ComplexMetricSpec,
    instance: &ServiceInstanceId,
    result: &ActionResult,
) -> MeasurementRecord {
    let mut record = MeasurementRecord::new(spec.measurement_name.clone())
        .with_tag(SERVICE_TAG, instance.index().to_string())
        .with_tag(HOST_TAG, ctx.host);

    for (tag, key) in &spec.tag_extract {
        let value = result.get(key).map(ToString::to_string).unwrap_or_default();
        record = record.with_tag(tag.clone(), value);
    }
    for (field, key) in &spec.field_extract {
        if let Some(value) = result.get(key) {
            record.set_field(field.clone(), value.clone());
        }
    }

    record
}
