use super::normalize::{drain, join_series, join_tasks, list_metrics, MetricAdjust, NoAdjust};
use super::{CollectRequest, CollectStrategy};
use crate::error::{CloudError, Result};
use crate::metric_types::metric_types_for;
use crate::sdk::MetricListOptions;
use async_trait::async_trait;
use cloudmon_common::resource::ResourceKind;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const BY_METRIC_TYPE_KINDS: &[ResourceKind] = &[
    ResourceKind::DbInstance,
    ResourceKind::Server,
    ResourceKind::Host,
    ResourceKind::Redis,
    ResourceKind::Bucket,
    ResourceKind::K8s,
    ResourceKind::Loadbalancer,
];

/// One `list_metrics` call per metric type of the kind, joined to
/// resources by the series id.
pub struct ByMetricTypeStrategy {
    adjust: Arc<dyn MetricAdjust>,
}

impl ByMetricTypeStrategy {
    pub fn new() -> Self {
        Self::with_adjust(NoAdjust)
    }

    pub fn with_adjust(adjust: impl MetricAdjust + 'static) -> Self {
        Self {
            adjust: Arc::new(adjust),
        }
    }
}

impl Default for ByMetricTypeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CollectStrategy for ByMetricTypeStrategy {
    fn supports(&self, kind: ResourceKind) -> bool {
        BY_METRIC_TYPE_KINDS.contains(&kind)
    }

    async fn collect(&self, req: CollectRequest<'_>) -> Result<()> {
        let cancel = &req.ctx.cancel;
        let resources = Arc::new(req.resources.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tasks = Vec::new();

        for metric_type in metric_types_for(req.kind) {
            let (start, end) = self.adjust.window(metric_type, req.start, req.end);
            let mut opts = MetricListOptions::new(req.kind.into(), start, end);
            opts.metric_type = Some(metric_type.clone());

            let sdk = Arc::clone(req.sdk);
            let resources = Arc::clone(&resources);
            let adjust = Arc::clone(&self.adjust);
            let tx = tx.clone();
            let cancel = cancel.clone();
            let manager = req.manager.name.clone();
            let metric_type = metric_type.clone();

            tasks.push(tokio::spawn(async move {
                match list_metrics(&cancel, sdk.as_ref(), &opts).await {
                    Ok(series) => {
                        let _ = tx.send(join_series(&series, &resources, adjust.as_ref()));
                    }
                    Err(e) if e.is_no_data() => {}
                    Err(CloudError::Cancelled) => {}
                    Err(e) => {
                        tracing::error!(
                            manager = %manager,
                            metric_type = %metric_type,
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
