use super::normalize::{join_series, list_metrics, NoAdjust};
use super::{CollectRequest, CollectStrategy};
use crate::error::{CloudError, Result};
use crate::sdk::MetricListOptions;
use async_trait::async_trait;
use chrono::TimeDelta;
use cloudmon_common::resource::ResourceKind;
use std::time::Duration;
use tokio::time::sleep;

pub const POLL_STEP: Duration = Duration::from_secs(60);

pub const POLL_KINDS: &[ResourceKind] = &[ResourceKind::Server, ResourceKind::Host];

/// For vendors that only expose current values: one call per minute of the
/// window, sleeping a minute between calls.
///
/// Failed calls are logged and the loop moves on; the window end and the
/// cancellation token bound it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PollStrategy;

#[async_trait]
impl CollectStrategy for PollStrategy {
    fn supports(&self, kind: ResourceKind) -> bool {
        POLL_KINDS.contains(&kind)
    }

    async fn collect(&self, req: CollectRequest<'_>) -> Result<()> {
        let cancel = &req.ctx.cancel;
        let step = TimeDelta::minutes(1);
        let mut cursor = req.start;
        let mut series = Vec::new();

        while cursor < req.end {
            let opts = MetricListOptions::new(req.kind.into(), cursor, cursor + step);
            match list_metrics(cancel, &**req.sdk, &opts).await {
                Ok(found) => series.extend(found),
                Err(e) if e.is_not_implemented() => break,
                Err(CloudError::NotFound(_)) => {}
                Err(CloudError::Cancelled) => return Err(CloudError::Cancelled),
                Err(e) => {
                    tracing::warn!(
                        manager = %req.manager.name,
                        kind = %req.kind,
                        error = %e,
                        "Failed to poll metrics"
                    );
                }
            }

            cursor += step;
            if cursor < req.end {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(CloudError::Cancelled),
                    _ = sleep(POLL_STEP) => {}
                }
            }
        }

        let records = join_series(&series, req.resources, &NoAdjust);
        req.ctx
            .send_metrics(req.manager, req.kind, req.resources.len(), records)
            .await
    }
}
