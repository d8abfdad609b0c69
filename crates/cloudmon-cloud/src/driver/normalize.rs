use crate::error::{CloudError, Result};
use crate::sdk::{MetricListOptions, MetricSeries, MetricType, ProviderSdk};
use chrono::{DateTime, Utc};
use cloudmon_common::resource::{MetricDetail, ResourceDetail, ResourceMap};
use cloudmon_common::types::SampleRecord;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Vendor hook adjusting the query window and the raw values of a metric type.
pub trait MetricAdjust: Send + Sync {
    fn window(
        &self,
        _metric_type: &MetricType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        (start, end)
    }

    fn value(&self, _metric_type: &MetricType, _resource: &ResourceDetail, value: f64) -> f64 {
        value
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoAdjust;

impl MetricAdjust for NoAdjust {}

/// Samples of `series` for `resource`: the point tags, then the resource
/// tags, then the metric value, then the resource pairs.
pub(crate) fn series_records(
    series: &MetricSeries,
    resource: &ResourceDetail,
    adjust: &dyn MetricAdjust,
) -> Vec<SampleRecord> {
    let tags = resource.metric_tags();
    let pairs = resource.metric_pairs();
    series
        .values
        .iter()
        .map(|point| {
            let mut record = SampleRecord::new(series.metric_type.name(), point.timestamp);
            record.extend_tags(point.tags.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            record.extend_tags(tags.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            record.push_value(
                series.metric_type.key(),
                adjust.value(&series.metric_type, resource, point.value),
            );
            record.extend_metrics(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            record
        })
        .collect()
}

/// Join series to resources by external id, dropping series whose id is unknown.
pub(crate) fn join_series(
    series: &[MetricSeries],
    resources: &ResourceMap,
    adjust: &dyn MetricAdjust,
) -> Vec<SampleRecord> {
    series
        .iter()
        .filter_map(|s| match resources.get(&s.id) {
            Some(resource) => Some(series_records(s, resource, adjust)),
            None => {
                tracing::debug!(id = %s.id, metric_type = %s.metric_type, "Series for unknown resource dropped");
                None
            }
        })
        .flatten()
        .collect()
}

/// Resources grouped by region, each group's external ids sorted.
pub(crate) fn group_by_region(resources: &ResourceMap) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (ext_id, resource) in resources {
        groups
            .entry(resource.region_ext_id.clone())
            .or_default()
            .push(ext_id.clone());
    }
    for ids in groups.values_mut() {
        ids.sort();
    }
    groups
}

/// `list_metrics` raced against cancellation.
pub(crate) async fn list_metrics(
    cancel: &CancellationToken,
    sdk: &dyn ProviderSdk,
    opts: &MetricListOptions,
) -> Result<Vec<MetricSeries>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CloudError::Cancelled),
        series = sdk.list_metrics(opts) => series,
    }
}

/// Drain every batch sent on `rx` until all senders are dropped.
pub(crate) async fn drain<T>(mut rx: mpsc::UnboundedReceiver<Vec<T>>) -> Vec<T> {
    let mut all = Vec::new();
    while let Some(batch) = rx.recv().await {
        all.extend(batch);
    }
    all
}

/// Await spawned tasks, logging any that panicked.
pub(crate) async fn join_tasks(tasks: Vec<tokio::task::JoinHandle<()>>) {
    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!("Task panicked: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::MetricValue;

    fn resource(ext_id: &str, region: &str) -> ResourceDetail {
        let mut res = ResourceDetail {
            id: format!("id-{ext_id}"),
            name: format!("vm-{ext_id}"),
            external_id: ext_id.to_string(),
            region_ext_id: region.to_string(),
            ..Default::default()
        };
        res.metric_tags.insert("vm_id".to_string(), res.id.clone());
        res.metric_pairs.insert("vm_name".to_string(), res.name.clone());
        res
    }

    #[test]
    fn test_order_point_tags_before_resource_tags() {
        let ts = DateTime::from_timestamp(60, 0).unwrap();
        let series = MetricSeries {
            id: "i-1".to_string(),
            metric_type: MetricType::from_static("vm_disk.used_percent"),
            values: vec![MetricValue::new(ts, 50.0).with_tag("path", "/")],
        };

        let records = series_records(&series, &resource("i-1", "r1"), &NoAdjust);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.measurement, "vm_disk");
        assert_eq!(record.timestamp, ts);
        let tags: Vec<_> = record.tags.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(tags, ["path", "vm_id"]);
        let metrics: Vec<_> = record
            .metrics
            .iter()
            .map(|m| (m.key.as_str(), m.value.as_str()))
            .collect();
        assert_eq!(metrics, [("used_percent", "5E+01"), ("vm_name", "vm-i-1")]);
    }

    #[test]
    fn test_drop_series_for_unknown_resources() {
        let ts = DateTime::from_timestamp(60, 0).unwrap();
        let mut resources = ResourceMap::new();
        resources.insert("i-1".to_string(), resource("i-1", "r1"));
        let series = ["i-1", "i-9"]
            .iter()
            .map(|id| MetricSeries {
                id: id.to_string(),
                metric_type: MetricType::from_static("vm_cpu.usage_active"),
                values: vec![MetricValue::new(ts, 1.0)],
            })
            .collect::<Vec<_>>();

        let records = join_series(&series, &resources, &NoAdjust);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_group_sorted_ids_by_region() {
        let mut resources = ResourceMap::new();
        for (id, region) in [("c", "r1"), ("a", "r1"), ("b", "r2")] {
            resources.insert(id.to_string(), resource(id, region));
        }

        let groups = group_by_region(&resources);
        assert_eq!(groups["r1"], ["a", "c"]);
        assert_eq!(groups["r2"], ["b"]);
    }
}
