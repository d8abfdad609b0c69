//! Collect drivers: the per-provider policy turning SDK series into
//! samples and handing them to the sink.
//!
//! A driver answers one call per resource kind. Most drivers delegate
//! every kind to a shared [`CollectStrategy`]; vendor drivers override
//! only the kinds whose semantics differ.

pub mod by_metric_type;
pub mod by_resource;
pub mod batched;
mod normalize;
pub mod poll;
pub mod registry;

use crate::error::{CloudError, Result};
use crate::sdk::ProviderSdk;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudmon_common::resource::{
    AccountDetail, MetricDetail, ProviderDetail, ResourceKind, ResourceMap,
};
use cloudmon_common::types::SampleRecord;
use cloudmon_sink::SinkClient;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use normalize::{MetricAdjust, NoAdjust};

pub const DEFAULT_COLLECT_DELAY: Duration = Duration::from_secs(6 * 60);
pub const DEFAULT_BATCH_COUNT: usize = 10;
pub const DEFAULT_ORACLE_BATCH_COUNT: usize = 1;

pub const STORAGE_MEASUREMENT: &str = "storage";
pub const ACCOUNT_MEASUREMENT: &str = "cloudaccount";

pub type SdkRef = Arc<dyn ProviderSdk>;

/// Ambient collaborators and limits of one collection invocation.
#[derive(Clone)]
pub struct CollectContext {
    pub cancel: CancellationToken,
    pub sink: Arc<dyn SinkClient>,
    pub sink_urls: Vec<String>,
    pub database: String,
    pub batch_count: usize,
    pub oracle_batch_count: usize,
}

impl CollectContext {
    pub fn new(
        cancel: CancellationToken,
        sink: Arc<dyn SinkClient>,
        sink_urls: Vec<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            cancel,
            sink,
            sink_urls,
            database: database.into(),
            batch_count: DEFAULT_BATCH_COUNT,
            oracle_batch_count: DEFAULT_ORACLE_BATCH_COUNT,
        }
    }

    pub fn with_batch_count(mut self, batch_count: usize, oracle_batch_count: usize) -> Self {
        self.batch_count = batch_count;
        self.oracle_batch_count = oracle_batch_count;
        self
    }

    /// Concurrent SDK calls allowed for one invocation, never zero.
    pub fn batch_count_for(&self, provider: &str, kind: ResourceKind) -> usize {
        let count = if kind == ResourceKind::Server && provider.eq_ignore_ascii_case("oracle") {
            self.oracle_batch_count
        } else {
            self.batch_count
        };
        count.max(1)
    }

    /// Hand one invocation's samples to the sink in a single batch.
    pub async fn send_metrics(
        &self,
        manager: &ProviderDetail,
        kind: ResourceKind,
        resource_count: usize,
        records: Vec<SampleRecord>,
    ) -> Result<()> {
        if self.sink_urls.is_empty() {
            return Err(CloudError::ConfigError(
                "no time-series endpoint configured".to_string(),
            ));
        }
        if self.cancel.is_cancelled() {
            return Err(CloudError::Cancelled);
        }

        tracing::info!(
            "send {} {} with {} metrics for {}({})",
            resource_count,
            kind,
            records.len(),
            manager.name,
            manager.id
        );
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CloudError::Cancelled),
            result = self.sink.send_batch(&self.sink_urls, &self.database, &records, false) => {
                result.map_err(CloudError::from)
            }
        }
    }
}

/// Everything a strategy needs for one resource kind of one provider.
#[derive(Clone, Copy)]
pub struct CollectRequest<'a> {
    pub kind: ResourceKind,
    pub ctx: &'a CollectContext,
    pub manager: &'a ProviderDetail,
    pub sdk: &'a SdkRef,
    pub resources: &'a ResourceMap,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A reusable collection algorithm shared by many drivers.
#[async_trait]
pub trait CollectStrategy: Send + Sync {
    /// Kinds the per-kind driver defaults route to this strategy.
    fn supports(&self, kind: ResourceKind) -> bool;

    async fn collect(&self, req: CollectRequest<'_>) -> Result<()>;
}

/// Per-provider collection policy.
///
/// Every per-kind method defaults to the driver's [`CollectStrategy`]
/// when it supports the kind, and to [`CloudError::NotImplemented`]
/// otherwise. Storage has a strategy-independent default built from the
/// resource snapshot.
#[async_trait]
pub trait CollectDriver: Send + Sync {
    /// Lowercase provider tag this driver is registered under.
    fn provider(&self) -> &str;

    fn supports_metrics(&self) -> bool {
        false
    }

    /// How far behind wall-clock the collection window ends.
    fn collect_delay(&self) -> Duration {
        DEFAULT_COLLECT_DELAY
    }

    fn strategy(&self) -> Option<&dyn CollectStrategy> {
        None
    }

    async fn collect_with_strategy(&self, req: CollectRequest<'_>) -> Result<()> {
        match self.strategy() {
            Some(strategy) if strategy.supports(req.kind) => strategy.collect(req).await,
            _ => Err(not_implemented(req.kind)),
        }
    }

    /// Builds the account-level sample; fails when the account carries no metric pairs.
    async fn collect_account_metrics(&self, account: &AccountDetail) -> Result<SampleRecord> {
        account_record(account)
    }

    async fn collect_server_metrics(
        &self,
        ctx: &CollectContext,
        manager: &ProviderDetail,
        sdk: &SdkRef,
        resources: &ResourceMap,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        self.collect_with_strategy(CollectRequest {
            kind: ResourceKind::Server,
            ctx,
            manager,
            sdk,
            resources,
            start,
            end,
        })
        .await
    }

    async fn collect_host_metrics(
        &self,
        ctx: &CollectContext,
        manager: &ProviderDetail,
        sdk: &SdkRef,
        resources: &ResourceMap,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        self.collect_with_strategy(CollectRequest {
            kind: ResourceKind::Host,
            ctx,
            manager,
            sdk,
            resources,
            start,
            end,
        })
        .await
    }

    async fn collect_dbinstance_metrics(
        &self,
        ctx: &CollectContext,
        manager: &ProviderDetail,
        sdk: &SdkRef,
        resources: &ResourceMap,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        self.collect_with_strategy(CollectRequest {
            kind: ResourceKind::DbInstance,
            ctx,
            manager,
            sdk,
            resources,
            start,
            end,
        })
        .await
    }

    async fn collect_redis_metrics(
        &self,
        ctx: &CollectContext,
        manager: &ProviderDetail,
        sdk: &SdkRef,
        resources: &ResourceMap,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        self.collect_with_strategy(CollectRequest {
            kind: ResourceKind::Redis,
            ctx,
            manager,
            sdk,
            resources,
            start,
            end,
        })
        .await
    }

    async fn collect_bucket_metrics(
        &self,
        ctx: &CollectContext,
        manager: &ProviderDetail,
        sdk: &SdkRef,
        resources: &ResourceMap,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        self.collect_with_strategy(CollectRequest {
            kind: ResourceKind::Bucket,
            ctx,
            manager,
            sdk,
            resources,
            start,
            end,
        })
        .await
    }

    async fn collect_loadbalancer_metrics(
        &self,
        ctx: &CollectContext,
        manager: &ProviderDetail,
        sdk: &SdkRef,
        resources: &ResourceMap,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        self.collect_with_strategy(CollectRequest {
            kind: ResourceKind::Loadbalancer,
            ctx,
            manager,
            sdk,
            resources,
            start,
            end,
        })
        .await
    }

    async fn collect_k8s_metrics(
        &self,
        ctx: &CollectContext,
        manager: &ProviderDetail,
        sdk: &SdkRef,
        resources: &ResourceMap,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        self.collect_with_strategy(CollectRequest {
            kind: ResourceKind::K8s,
            ctx,
            manager,
            sdk,
            resources,
            start,
            end,
        })
        .await
    }

    /// One `storage` sample per storage resource stamped with the current
    /// time; resources without metric pairs are skipped.
    async fn collect_storage_metrics(
        &self,
        ctx: &CollectContext,
        manager: &ProviderDetail,
        _sdk: &SdkRef,
        resources: &ResourceMap,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<()> {
        let now = Utc::now();
        let records = resources
            .values()
            .filter_map(|storage| {
                let mut record = SampleRecord::new(STORAGE_MEASUREMENT, now);
                record.extend_tags(storage.metric_tags());
                record.extend_metrics(storage.metric_pairs());
                (!record.is_empty()).then_some(record)
            })
            .collect();
        ctx.send_metrics(manager, ResourceKind::Storage, resources.len(), records)
            .await
    }

    async fn collect_eip_metrics(
        &self,
        _ctx: &CollectContext,
        _manager: &ProviderDetail,
        _sdk: &SdkRef,
        _resources: &ResourceMap,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<()> {
        Err(not_implemented(ResourceKind::Eip))
    }

    async fn collect_modelarts_pool_metrics(
        &self,
        _ctx: &CollectContext,
        _manager: &ProviderDetail,
        _sdk: &SdkRef,
        _resources: &ResourceMap,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<()> {
        Err(not_implemented(ResourceKind::ModelartsPool))
    }
}

pub fn not_implemented(kind: ResourceKind) -> CloudError {
    CloudError::NotImplemented(format!("collect {kind} metrics"))
}

fn account_record(account: &AccountDetail) -> Result<SampleRecord> {
    let mut record = SampleRecord::new(ACCOUNT_MEASUREMENT, Utc::now());
    record.extend_tags(account.metric_tags());
    record.extend_metrics(account.metric_pairs());
    if record.is_empty() {
        return Err(CloudError::NotSupported(format!(
            "account {}({}) has no metric pairs",
            account.name, account.id
        )));
    }
    Ok(record)
}

/// Route `req` to the driver method for its kind.
pub async fn dispatch(driver: &dyn CollectDriver, req: CollectRequest<'_>) -> Result<()> {
    let CollectRequest {
        kind,
        ctx,
        manager,
        sdk,
        resources,
        start,
        end,
    } = req;
    match kind {
        ResourceKind::Server => {
            driver
                .collect_server_metrics(ctx, manager, sdk, resources, start, end)
                .await
        }
        ResourceKind::Host => {
            driver
                .collect_host_metrics(ctx, manager, sdk, resources, start, end)
                .await
        }
        ResourceKind::DbInstance => {
            driver
                .collect_dbinstance_metrics(ctx, manager, sdk, resources, start, end)
                .await
        }
        ResourceKind::Redis => {
            driver
                .collect_redis_metrics(ctx, manager, sdk, resources, start, end)
                .await
        }
        ResourceKind::Bucket => {
            driver
                .collect_bucket_metrics(ctx, manager, sdk, resources, start, end)
                .await
        }
        ResourceKind::Loadbalancer => {
            driver
                .collect_loadbalancer_metrics(ctx, manager, sdk, resources, start, end)
                .await
        }
        ResourceKind::K8s => {
            driver
                .collect_k8s_metrics(ctx, manager, sdk, resources, start, end)
                .await
        }
        ResourceKind::Storage => {
            driver
                .collect_storage_metrics(ctx, manager, sdk, resources, start, end)
                .await
        }
        ResourceKind::Eip => {
            driver
                .collect_eip_metrics(ctx, manager, sdk, resources, start, end)
                .await
        }
        ResourceKind::ModelartsPool => {
            driver
                .collect_modelarts_pool_metrics(ctx, manager, sdk, resources, start, end)
                .await
        }
    }
}
