use super::normalize::{drain, group_by_region, join_series, join_tasks, list_metrics, NoAdjust};
use super::{CollectRequest, CollectStrategy};
use crate::error::{CloudError, Result};
use crate::metric_types::metric_types_for;
use crate::sdk::{MetricListOptions, MetricType};
use async_trait::async_trait;
use cloudmon_common::resource::ResourceKind;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

/// Resource ids per SDK call.
pub const BATCH_RESOURCE_IDS: usize = 10;

pub const BATCHED_KINDS: &[ResourceKind] = &[
    ResourceKind::DbInstance,
    ResourceKind::Server,
    ResourceKind::Host,
    ResourceKind::Redis,
    ResourceKind::Bucket,
    ResourceKind::Loadbalancer,
];

/// Resources grouped by region and queried [`BATCH_RESOURCE_IDS`] ids at a time.
///
/// Every chunk response is gathered before joining, so a series may name
/// any resource of the map. With `per_metric_type` each chunk is also
/// queried once per metric type.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchedByRegionStrategy {
    per_metric_type: bool,
}

impl BatchedByRegionStrategy {
    pub fn new() -> Self {
        Self {
            per_metric_type: false,
        }
    }

    pub fn per_metric_type() -> Self {
        Self {
            per_metric_type: true,
        }
    }

    fn metric_types(&self, kind: ResourceKind) -> Vec<Option<MetricType>> {
        if self.per_metric_type {
            metric_types_for(kind).iter().cloned().map(Some).collect()
        } else {
            vec![None]
        }
    }
}

#[async_trait]
impl CollectStrategy for BatchedByRegionStrategy {
    fn supports(&self, kind: ResourceKind) -> bool {
        BATCHED_KINDS.contains(&kind)
    }

    async fn collect(&self, req: CollectRequest<'_>) -> Result<()> {
        let cancel = &req.ctx.cancel;
        let semaphore = Arc::new(Semaphore::new(
            req.ctx.batch_count_for(&req.manager.provider, req.kind),
        ));
        let groups = group_by_region(req.resources);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tasks = Vec::new();

        'outer: for metric_type in self.metric_types(req.kind) {
            for (region, ids) in &groups {
                for chunk in ids.chunks(BATCH_RESOURCE_IDS) {
                    let permit = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break 'outer,
                        permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                            Ok(permit) => permit,
                            Err(_) => break 'outer,
                        },
                    };

                    let mut opts = MetricListOptions::new(req.kind.into(), req.start, req.end);
                    opts.metric_type = metric_type.clone();
                    opts.region_ext_id = region.clone();
                    opts.resource_ids = chunk.to_vec();

                    let sdk = Arc::clone(req.sdk);
                    let tx = tx.clone();
                    let cancel = cancel.clone();
                    let manager = req.manager.name.clone();
                    let region = region.clone();

                    tasks.push(tokio::spawn(async move {
                        let _permit = permit;
                        match list_metrics(&cancel, sdk.as_ref(), &opts).await {
                            Ok(series) => {
                                let _ = tx.send(series);
                            }
                            Err(e) if e.is_no_data() => {}
                            Err(CloudError::Cancelled) => {}
                            Err(e) => {
                                tracing::error!(
                                    manager = %manager,
                                    region = %region,
                                    resources = opts.resource_ids.len(),
                                    error = %e,
                                    "Failed to get metrics"
                                );
                            }
                        }
                    }));
                }
            }
        }
        drop(tx);

        let series = drain(rx).await;
        join_tasks(tasks).await;
        if cancel.is_cancelled() {
            return Err(CloudError::Cancelled);
        }

        let records = join_series(&series, req.resources, &NoAdjust);
        req.ctx
            .send_metrics(req.manager, req.kind, req.resources.len(), records)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_every_metric_type_when_nested() {
        let nested = BatchedByRegionStrategy::per_metric_type().metric_types(ResourceKind::Redis);
        assert_eq!(nested.len(), metric_types_for(ResourceKind::Redis).len());
        assert!(nested.iter().all(Option::is_some));

        let flat = BatchedByRegionStrategy::new().metric_types(ResourceKind::Redis);
        assert_eq!(flat, vec![None]);
    }
}
