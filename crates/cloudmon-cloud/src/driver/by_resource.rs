use super::normalize::{drain, join_tasks, list_metrics, series_records, NoAdjust};
use super::{CollectRequest, CollectStrategy};
use crate::error::{CloudError, Result};
use crate::sdk::MetricListOptions;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudmon_common::resource::{ResourceDetail, ResourceKind};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

/// Kinds collected one SDK call per resource.
pub const BY_RESOURCE_ID_KINDS: &[ResourceKind] = &[
    ResourceKind::DbInstance,
    ResourceKind::Server,
    ResourceKind::Host,
    ResourceKind::Redis,
    ResourceKind::Bucket,
    ResourceKind::K8s,
    ResourceKind::Loadbalancer,
];

/// One `list_metrics` call per resource, bounded by the context batch count.
///
/// K8s clusters without an external cluster id are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByResourceIdStrategy;

impl ByResourceIdStrategy {
    fn list_options(
        kind: ResourceKind,
        resource: &ResourceDetail,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> MetricListOptions {
        let mut opts = MetricListOptions::new(kind.into(), start, end);
        opts.resource_id = resource.external_id.clone();
        opts.region_ext_id = resource.region_ext_id.clone();
        match kind {
            ResourceKind::Server => opts.os_type = resource.os_type.clone(),
            ResourceKind::DbInstance => opts.engine = resource.engine.clone(),
            _ => {}
        }
        opts
    }
}

#[async_trait]
impl CollectStrategy for ByResourceIdStrategy {
    fn supports(&self, kind: ResourceKind) -> bool {
        BY_RESOURCE_ID_KINDS.contains(&kind)
    }

    async fn collect(&self, req: CollectRequest<'_>) -> Result<()> {
        let cancel = &req.ctx.cancel;
        let batch_count = req.ctx.batch_count_for(&req.manager.provider, req.kind);
        let semaphore = Arc::new(Semaphore::new(batch_count));
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tasks = Vec::new();

        for resource in req.resources.values() {
            if req.kind == ResourceKind::K8s
                && resource
                    .external_cluster_id
                    .as_deref()
                    .unwrap_or_default()
                    .is_empty()
            {
                tracing::info!(
                    cluster = %resource.name,
                    id = %resource.id,
                    "Skipping k8s cluster without external cluster id"
                );
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let opts = Self::list_options(req.kind, resource, req.start, req.end);
            let resource = resource.clone();
            let sdk = Arc::clone(req.sdk);
            let tx = tx.clone();
            let cancel = cancel.clone();
            let manager = req.manager.name.clone();
            let kind = req.kind;

            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                match list_metrics(&cancel, sdk.as_ref(), &opts).await {
                    Ok(series) => {
                        let records: Vec<_> = series
                            .iter()
                            .flat_map(|s| series_records(s, &resource, &NoAdjust))
                            .collect();
                        let _ = tx.send(records);
                    }
                    Err(e) if e.is_no_data() => {}
                    Err(CloudError::Cancelled) => {}
                    Err(e) => {
                        tracing::error!(
                            manager = %manager,
                            kind = %kind,
                            resource = %resource.name,
                            id = %resource.id,
                            error = %e,
                            "Failed to get metrics"
                        );
                    }
                }
            }));
        }
        drop(tx);

        let records = drain(rx).await;
        join_tasks(tasks).await;
        if cancel.is_cancelled() {
            return Err(CloudError::Cancelled);
        }

        req.ctx
            .send_metrics(req.manager, req.kind, req.resources.len(), records)
            .await
    }
}
